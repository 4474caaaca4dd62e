pub mod assets;
mod builtin;
mod cli;
pub mod content;
pub mod date;
pub mod document;
pub mod error;
mod fetcher;
pub mod generate;
pub mod html;
pub mod listing;
pub mod post;
pub mod progress;
pub mod richtext;
mod sanitize;
pub mod server;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context as _;
use cli::Args;
use content::ContentClient;
use generate::SiteOptions;
use listing::Listing;

pub use cli::{Args as CliArgs, Mode, ProgressMode};
pub use fetcher::Fetcher;

impl From<&Args> for SiteOptions {
    fn from(args: &Args) -> Self {
        Self {
            out_dir: args.out.clone(),
            page_size: args.page_size,
            orderings: args.orderings.clone(),
            localize_images: args.localize_images,
        }
    }
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal() && args.mode != Mode::List,
    };
    let progress = progress::Progress::new(progress_enabled);

    let fetcher = Fetcher::new(&args.user_agent, args.max_concurrency)?;
    let client = ContentClient::new(args.endpoint.clone(), args.access_token.clone(), fetcher)?;
    let opts = SiteOptions::from(&args);

    match args.mode {
        Mode::Build => {
            let res = generate::build_site(&client, &opts, progress.clone()).await;
            progress.finish();
            let report = res?;
            tracing::info!(
                rendered = report.rendered.len(),
                listed = report.listed,
                out = %opts.out_dir.display(),
                "site generated"
            );
            Ok(())
        }
        Mode::Serve => {
            let res = generate::build_site(&client, &opts, progress.clone()).await;
            progress.finish();
            if let Err(e) = res {
                // Posts missing from the build are still generated on first request.
                tracing::warn!(error = %format!("{e:#}"), "initial build incomplete");
            }
            let state = Arc::new(server::ServerState::new(client, opts));
            server::start(state, args.bind).await
        }
        Mode::List => list_posts(&client, &opts).await,
    }
}

async fn list_posts(client: &ContentClient, opts: &SiteOptions) -> anyhow::Result<()> {
    let listing = generate::collect_listing(client, opts)
        .await
        .context("walk post listing")?;
    let stdout = std::io::stdout();
    write_post_list(&mut stdout.lock(), &listing).context("write post list")
}

pub fn write_post_list(out: &mut impl Write, listing: &Listing) -> std::io::Result<()> {
    writeln!(out, "Posts ({}):", listing.posts().len())?;
    for post in listing.posts() {
        writeln!(
            out,
            "  {} - {} [{}]",
            post.first_publication_date, post.title, post.uid
        )?;
    }
    Ok(())
}
