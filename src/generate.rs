use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::task::JoinSet;

use crate::assets::ImageStore;
use crate::builtin;
use crate::content::{ContentClient, Predicate, QueryOptions};
use crate::error::ContentError;
use crate::html;
use crate::listing::Listing;
use crate::post::{POST_TYPE, PageStatus, PostDetail, PostPage};
use crate::progress::Progress;

pub const ASSETS_DIR: &str = "assets";
pub const FALLBACK_PAGE: &str = "post/_fallback.html";
pub const NOT_FOUND_PAGE: &str = "404.html";

#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub out_dir: PathBuf,
    pub page_size: u32,
    pub orderings: Option<String>,
    pub localize_images: bool,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub listed: usize,
    pub has_more: bool,
    pub rendered: Vec<String>,
    pub failed: Vec<String>,
}

pub fn is_valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.len() <= 256
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn post_page_path(out_dir: &Path, uid: &str) -> PathBuf {
    out_dir.join("post").join(uid).join("index.html")
}

pub async fn first_page(
    client: &ContentClient,
    opts: &SiteOptions,
) -> Result<PostPage, ContentError> {
    let resp = client
        .query(
            &[Predicate::at("document.type", POST_TYPE)],
            &QueryOptions {
                page_size: Some(opts.page_size.max(1)),
                orderings: opts.orderings.clone(),
                ..QueryOptions::default()
            },
        )
        .await?;
    Ok(PostPage::from_response(resp))
}

pub async fn fetch_detail(client: &ContentClient, uid: &str) -> Result<PageStatus, ContentError> {
    let doc = client.get_by_uid(POST_TYPE, uid).await?;
    Ok(match doc.as_ref().and_then(PostDetail::from_document) {
        Some(post) => PageStatus::Ready(post),
        None => PageStatus::NotFound,
    })
}

pub async fn localize(post: PostDetail, images: Option<&ImageStore>) -> PostDetail {
    let Some(images) = images else {
        return post;
    };
    let mapped = images.localize_all(&post.image_urls()).await;
    if mapped.is_empty() {
        return post;
    }
    post.with_image_urls(|url| mapped.get(url).cloned().unwrap_or_else(|| url.to_string()))
}

pub fn write_post_page(out_dir: &Path, post: &PostDetail) -> anyhow::Result<PathBuf> {
    anyhow::ensure!(is_valid_uid(&post.uid), "refusing to write post uid {:?}", post.uid);
    let path = post_page_path(out_dir, &post.uid);
    let html = html::build_detail_html(&PageStatus::Ready(post.clone()));
    write_file(&path, html.as_bytes())?;
    Ok(path)
}

pub fn write_shell_files(out_dir: &Path) -> anyhow::Result<()> {
    write_file(
        &out_dir.join(ASSETS_DIR).join("css/site.css"),
        builtin::BUILTIN_CSS.as_bytes(),
    )?;
    write_file(&out_dir.join("logo.svg"), builtin::LOGO_SVG.as_bytes())?;
    write_file(&out_dir.join("favicon.svg"), builtin::FAVICON_SVG.as_bytes())?;
    write_file(
        &out_dir.join(FALLBACK_PAGE),
        html::build_detail_html(&PageStatus::Loading).as_bytes(),
    )?;
    write_file(
        &out_dir.join(NOT_FOUND_PAGE),
        html::build_detail_html(&PageStatus::NotFound).as_bytes(),
    )?;
    Ok(())
}

pub async fn build_site(
    client: &ContentClient,
    opts: &SiteOptions,
    progress: Arc<Progress>,
) -> anyhow::Result<BuildReport> {
    let out_dir = &opts.out_dir;
    std::fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    progress.set_stage("writing shell files");
    write_shell_files(out_dir)?;

    progress.set_stage("fetching first listing page");
    let page = first_page(client, opts)
        .await
        .context("fetch first listing page")?;
    let listing = Listing::first(page);
    write_file(
        &out_dir.join("index.html"),
        html::build_listing_html(&listing).as_bytes(),
    )?;
    tracing::info!(
        listed = listing.posts().len(),
        has_more = listing.has_more(),
        "listing written"
    );

    progress.set_stage("enumerating posts");
    let uids = client
        .all_uids(POST_TYPE, opts.orderings.as_deref())
        .await
        .context("enumerate posts")?;
    progress.set_posts_total(uids.len());

    let images = opts.localize_images.then(|| {
        Arc::new(ImageStore::new(
            out_dir.clone(),
            client.fetcher().clone(),
            Some(progress.clone()),
        ))
    });

    progress.set_stage("rendering posts");
    let mut tasks = JoinSet::new();
    for uid in uids {
        if !is_valid_uid(&uid) {
            tracing::warn!(uid = %uid, "skipping post with unusable uid");
            continue;
        }
        let client = client.clone();
        let images = images.clone();
        let out_dir = out_dir.clone();
        tasks.spawn(async move {
            let result = render_one(&client, &out_dir, &uid, images.as_deref()).await;
            (uid, result)
        });
    }

    let mut report = BuildReport {
        listed: listing.posts().len(),
        has_more: listing.has_more(),
        ..BuildReport::default()
    };
    while let Some(joined) = tasks.join_next().await {
        let (uid, result) = joined.context("post render task panicked")?;
        match result {
            Ok(true) => {
                progress.post_done(&uid);
                report.rendered.push(uid);
            }
            Ok(false) => {
                tracing::warn!(uid = %uid, "post disappeared before it could be rendered");
                progress.post_done(&uid);
            }
            Err(e) => {
                tracing::error!(uid = %uid, error = %format!("{e:#}"), "post render failed");
                report.failed.push(uid);
            }
        }
    }
    report.rendered.sort();

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} post(s) failed to render: {}",
            report.failed.len(),
            report.failed.join(", ")
        );
    }
    Ok(report)
}

async fn render_one(
    client: &ContentClient,
    out_dir: &Path,
    uid: &str,
    images: Option<&ImageStore>,
) -> anyhow::Result<bool> {
    let status = fetch_detail(client, uid)
        .await
        .with_context(|| format!("fetch post {uid}"))?;
    let PageStatus::Ready(post) = status else {
        return Ok(false);
    };
    let post = localize(post, images).await;
    let path = write_post_page(out_dir, &post)?;
    tracing::debug!(uid, path = %path.display(), "post written");
    Ok(true)
}

pub async fn collect_listing(
    client: &ContentClient,
    opts: &SiteOptions,
) -> Result<Listing, ContentError> {
    let mut listing = Listing::first(first_page(client, opts).await?);
    while listing.has_more() {
        let next = listing.load_more(client).await?;
        if next.next_page() == listing.next_page() {
            tracing::warn!("cursor did not advance; stopping");
            listing = next;
            break;
        }
        listing = next;
    }
    Ok(listing)
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}
