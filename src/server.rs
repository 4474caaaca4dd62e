use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::assets::ImageStore;
use crate::content::ContentClient;
use crate::error::ContentError;
use crate::generate::{self, SiteOptions};
use crate::html;
use crate::listing::Listing;
use crate::post::{PageStatus, PostPage};

pub struct ServerState {
    client: ContentClient,
    opts: SiteOptions,
    images: Option<ImageStore>,
}

impl ServerState {
    pub fn new(client: ContentClient, opts: SiteOptions) -> Self {
        let images = opts.localize_images.then(|| {
            ImageStore::new(opts.out_dir.clone(), client.fetcher().clone(), None)
        });
        Self {
            client,
            opts,
            images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoreQuery {
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoreResponse {
    pub items_html: String,
    pub next_page: String,
    pub uids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub status: String,
    pub title: String,
    pub html: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

struct ApiError(ContentError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ContentError::ForeignCursor(_) => StatusCode::BAD_REQUEST,
            e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "content request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        ApiError(e)
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    let static_files = ServeDir::new(&state.opts.out_dir)
        .append_index_html_on_directories(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/api/posts", get(more_posts))
        .route("/api/post/:uid", get(resolve_post))
        .route("/post/:uid", get(post_page))
        .route("/post/:uid/", get(post_page))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start(state: Arc<ServerState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("serving on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(html::build_detail_html(&PageStatus::NotFound)),
    )
        .into_response()
}

async fn post_page(State(state): State<Arc<ServerState>>, Path(uid): Path<String>) -> Response {
    if !generate::is_valid_uid(&uid) {
        return not_found().await;
    }
    let path = generate::post_page_path(&state.opts.out_dir, &uid);
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => {
            tracing::debug!(uid = %uid, "not pre-rendered; serving fallback");
            Html(html::build_detail_html(&PageStatus::Loading)).into_response()
        }
    }
}

async fn resolve_post(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    let status = if generate::is_valid_uid(&uid) {
        generate::fetch_detail(&state.client, &uid).await?
    } else {
        PageStatus::NotFound
    };

    let status = match status {
        PageStatus::Ready(post) => {
            let post = generate::localize(post, state.images.as_ref()).await;
            match generate::write_post_page(&state.opts.out_dir, &post) {
                Ok(path) => tracing::info!(uid = %uid, path = %path.display(), "generated on demand"),
                Err(e) => tracing::warn!(uid = %uid, error = %format!("{e:#}"), "could not persist page"),
            }
            PageStatus::Ready(post)
        }
        other => other,
    };

    let code = match status {
        PageStatus::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    let body = PostResponse {
        status: status.label().to_string(),
        title: html::status_title(&status),
        html: html::render_status(&status).into_string(),
    };
    Ok((code, Json(body)).into_response())
}

async fn more_posts(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<MoreQuery>,
) -> Result<Json<MoreResponse>, ApiError> {
    let cursor = crate::post::normalize_cursor(query.cursor);
    let current = Listing::first(PostPage {
        results: Vec::new(),
        next_page: cursor,
    });
    let listing = current.load_more(&state.client).await?;
    let posts = listing.posts();
    Ok(Json(MoreResponse {
        items_html: html::render_summaries(posts).into_string(),
        next_page: listing.next_page().unwrap_or_default().to_string(),
        uids: posts.iter().map(|p| p.uid.clone()).collect(),
    }))
}
