use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Pre-render the listing and every known post into `--out`.
    Build,
    /// Build, then serve the output with "load more" and on-demand posts.
    Serve,
    /// Print every post by walking the listing page by page.
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// What to do: `build`, `serve` or `list`.
    #[arg(long, value_enum, default_value = "build")]
    pub mode: Mode,

    /// Content API endpoint (e.g. `https://your-repo.cdn.prismic.io/api/v2`).
    #[arg(long, env = "PRISMIC_API_ENDPOINT")]
    pub endpoint: Url,

    /// Access token for private content repositories.
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Output directory for the generated site.
    #[arg(long, default_value = "public")]
    pub out: PathBuf,

    /// Number of posts on the first listing page and on each "load more".
    #[arg(long, default_value_t = 2)]
    pub page_size: u32,

    /// Ordering passed to the content API, e.g. `[document.first_publication_date desc]`.
    #[arg(long)]
    pub orderings: Option<String>,

    /// Address `serve` listens on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Download banner and body images into the output instead of hot-linking them.
    #[arg(long)]
    pub localize_images: bool,

    /// Max concurrent requests to the content API and image hosts.
    #[arg(long, default_value_t = 8)]
    pub max_concurrency: usize,

    /// HTTP User-Agent.
    #[arg(long, default_value = "spacetraveling/0.1")]
    pub user_agent: String,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}
