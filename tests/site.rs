use std::path::Path;
use std::sync::Arc;

use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use serde_json::{Value, json};
use spacetraveling::content::ContentClient;
use spacetraveling::generate::{self, SiteOptions};
use spacetraveling::html::{LOAD_MORE_LABEL, LOADING_LABEL, NOT_FOUND_LABEL};
use spacetraveling::progress::Progress;
use spacetraveling::server::{self, ErrorResponse, MoreResponse, PostResponse, ServerState};
use spacetraveling::Fetcher;
use tempfile::tempdir;
use url::Url;

const SEARCH: &str = "/api/v2/documents/search";
const LISTING_Q: &str = r#"[[at(document.type,"posts")]]"#;

fn read_to_string(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

async fn json_of<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> T {
    serde_json::from_str(&resp.text().await.unwrap()).unwrap()
}

fn summary_doc(uid: &str, title: &str) -> Value {
    json!({
        "id": format!("id-{uid}"),
        "uid": uid,
        "type": "posts",
        "first_publication_date": "2021-03-15T19:25:28+0000",
        "data": {
            "title": title,
            "subtitle": format!("Sobre {title}"),
            "author": "Joseph Oliveira",
        }
    })
}

fn detail_doc(uid: &str, title: &str) -> Value {
    json!({
        "id": format!("id-{uid}"),
        "uid": uid,
        "type": "posts",
        "first_publication_date": "2021-03-25T19:25:28+0000",
        "data": {
            "title": title,
            "subtitle": "Tudo sobre",
            "author": "Danilo Vieira",
            "banner": { "url": "https://images.example/banner.png" },
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        { "type": "paragraph", "text": "Nullam dolor sapien, vulputate eu diam at", "spans": [
                            { "start": 0, "end": 6, "type": "strong" }
                        ] },
                        { "type": "list-item", "text": "Um item", "spans": [] },
                        { "type": "embed", "oembed": { "embed_url": "https://www.youtube.com/watch?v=x", "html": "<iframe src=\"https://www.youtube.com/embed/x\"></iframe><script>alert(1)</script>" } }
                    ]
                }
            ]
        }
    })
}

fn mock_refs(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/api/v2");
        then.status(200).json_body(json!({
            "refs": [
                { "id": "master", "ref": "r1", "label": "Master", "isMasterRef": true }
            ]
        }));
    })
}

fn mock_first_page<'a>(server: &'a MockServer, results: Vec<Value>, next_page: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path(SEARCH)
            .query_param("ref", "r1")
            .query_param("q", LISTING_Q)
            .query_param("pageSize", "2");
        then.status(200)
            .json_body(json!({ "results": results, "next_page": next_page }));
    })
}

fn mock_second_page<'a>(server: &'a MockServer, results: Vec<Value>) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(SEARCH).query_param("page", "2");
        then.status(200)
            .json_body(json!({ "results": results, "next_page": null }));
    })
}

fn mock_enumeration<'a>(server: &'a MockServer, uids: &[&str]) -> Mock<'a> {
    let results: Vec<Value> = uids.iter().map(|uid| summary_doc(uid, uid)).collect();
    server.mock(|when, then| {
        when.method(GET)
            .path(SEARCH)
            .query_param("q", LISTING_Q)
            .query_param("pageSize", "100");
        then.status(200)
            .json_body(json!({ "results": results, "next_page": null }));
    })
}

fn mock_detail<'a>(server: &'a MockServer, uid: &str, doc: Option<Value>) -> Mock<'a> {
    let q = format!(r#"[[at(my.posts.uid,"{uid}")]]"#);
    let results: Vec<Value> = doc.into_iter().collect();
    server.mock(|when, then| {
        when.method(GET)
            .path(SEARCH)
            .query_param("q", q.as_str())
            .query_param("pageSize", "1");
        then.status(200)
            .json_body(json!({ "results": results, "next_page": null }));
    })
}

fn second_page_cursor(server: &MockServer) -> String {
    server.url(format!("{SEARCH}?ref=r1&page=2"))
}

fn client_for(server: &MockServer) -> ContentClient {
    let fetcher = Fetcher::new("spacetraveling-test", 4).unwrap();
    let endpoint = Url::parse(&server.url("/api/v2")).unwrap();
    ContentClient::new(endpoint, None, fetcher).unwrap()
}

fn options(out_dir: &Path) -> SiteOptions {
    SiteOptions {
        out_dir: out_dir.to_path_buf(),
        page_size: 2,
        orderings: None,
        localize_images: false,
    }
}

async fn spawn_app(state: ServerState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(Arc::new(state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread")]
async fn build_writes_listing_and_every_post() {
    let server = MockServer::start();
    mock_refs(&server);
    let cursor = second_page_cursor(&server);
    mock_first_page(
        &server,
        vec![
            summary_doc("como-utilizar-hooks", "Como utilizar Hooks"),
            summary_doc("criando-um-app-cra-do-zero", "Criando um app CRA do zero"),
        ],
        json!(cursor),
    );
    mock_enumeration(&server, &["como-utilizar-hooks", "criando-um-app-cra-do-zero"]);
    mock_detail(
        &server,
        "como-utilizar-hooks",
        Some(detail_doc("como-utilizar-hooks", "Como utilizar Hooks")),
    );
    mock_detail(
        &server,
        "criando-um-app-cra-do-zero",
        Some(detail_doc("criando-um-app-cra-do-zero", "Criando um app CRA do zero")),
    );

    let tmp = tempdir().unwrap();
    let client = client_for(&server);
    let opts = options(tmp.path());
    let report = generate::build_site(&client, &opts, Progress::new(false))
        .await
        .unwrap();

    assert_eq!(report.listed, 2);
    assert!(report.has_more);
    assert_eq!(
        report.rendered,
        vec!["como-utilizar-hooks", "criando-um-app-cra-do-zero"]
    );

    let index = read_to_string(&tmp.path().join("index.html"));
    assert!(index.contains("<title>spacetraveling. | Home</title>"));
    assert!(index.contains("Como utilizar Hooks"));
    assert!(index.contains("15 mar 2021"));
    assert!(index.contains("Joseph Oliveira"));
    assert!(index.contains(r#"href="/post/como-utilizar-hooks""#));
    assert!(index.contains(LOAD_MORE_LABEL));
    assert!(index.contains("page=2"));

    let post = read_to_string(&generate::post_page_path(tmp.path(), "como-utilizar-hooks"));
    assert!(post.contains("<title>spacetraveling. | Como utilizar Hooks</title>"));
    assert!(post.contains("25 mar 2021"));
    assert!(post.contains("1 min"));
    assert!(post.contains("<h2>Proin et varius</h2>"));
    assert!(post.contains("<strong>Nullam</strong>"));
    assert!(post.contains("<ul><li>Um item</li></ul>"));
    assert!(post.contains("https://images.example/banner.png"));
    assert!(!post.contains("<script>alert"));
    assert!(!post.contains("<iframe"));
    assert!(!post.contains(LOADING_LABEL));

    for rel in [generate::FALLBACK_PAGE, generate::NOT_FOUND_PAGE, "assets/css/site.css"] {
        assert!(tmp.path().join(rel).exists(), "{rel} missing");
    }
    assert!(read_to_string(&tmp.path().join(generate::NOT_FOUND_PAGE)).contains(NOT_FOUND_LABEL));
}

#[tokio::test(flavor = "multi_thread")]
async fn last_page_has_no_load_more_button() {
    let server = MockServer::start();
    mock_refs(&server);
    mock_first_page(
        &server,
        vec![summary_doc("unico", "Único post")],
        Value::Null,
    );
    mock_enumeration(&server, &["unico"]);
    mock_detail(&server, "unico", Some(detail_doc("unico", "Único post")));

    let tmp = tempdir().unwrap();
    let client = client_for(&server);
    let report = generate::build_site(&client, &options(tmp.path()), Progress::new(false))
        .await
        .unwrap();
    assert!(!report.has_more);

    let index = read_to_string(&tmp.path().join("index.html"));
    assert!(index.contains("Único post"));
    assert!(!index.contains(LOAD_MORE_LABEL));
    assert!(!index.contains("load-more"));
    assert!(!index.contains("null"));
}

#[tokio::test(flavor = "multi_thread")]
async fn collect_listing_follows_cursors_in_order() {
    let server = MockServer::start();
    mock_refs(&server);
    let cursor = second_page_cursor(&server);
    mock_first_page(
        &server,
        vec![summary_doc("a", "A"), summary_doc("b", "B")],
        json!(cursor),
    );
    let second = mock_second_page(&server, vec![summary_doc("b", "B"), summary_doc("c", "C")]);

    let tmp = tempdir().unwrap();
    let client = client_for(&server);
    let listing = generate::collect_listing(&client, &options(tmp.path()))
        .await
        .unwrap();

    let uids: Vec<&str> = listing.posts().iter().map(|p| p.uid.as_str()).collect();
    assert_eq!(uids, vec!["a", "b", "c"]);
    assert!(!listing.has_more());
    second.assert_hits(1);

    let mut out = Vec::new();
    spacetraveling::write_post_list(&mut out, &listing).unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert_eq!(
        printed,
        "Posts (3):\n  15 mar 2021 - A [a]\n  15 mar 2021 - B [b]\n  15 mar 2021 - C [c]\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_post_is_resolved_on_demand_and_persisted() {
    let server = MockServer::start();
    mock_refs(&server);
    let detail = mock_detail(
        &server,
        "post-novo",
        Some(detail_doc("post-novo", "Post novo")),
    );
    mock_detail(&server, "sumiu", None);

    let tmp = tempdir().unwrap();
    let state = ServerState::new(client_for(&server), options(tmp.path()));
    let base = spawn_app(state).await;
    let http = reqwest::Client::new();

    let first = http.get(format!("{base}/post/post-novo")).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let body = first.text().await.unwrap();
    assert!(body.contains(LOADING_LABEL));
    assert!(body.contains("/api/post/"));

    let resolved = http
        .get(format!("{base}/api/post/post-novo"))
        .send()
        .await
        .unwrap();
    assert_eq!(resolved.status(), 200);
    let resolved: PostResponse = json_of(resolved).await;
    assert_eq!(resolved.status, "ready");
    assert_eq!(resolved.title, "spacetraveling. | Post novo");
    assert!(resolved.html.contains("Proin et varius"));
    assert!(generate::post_page_path(tmp.path(), "post-novo").exists());

    let again = http
        .get(format!("{base}/post/post-novo"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(again.contains("Post novo"));
    assert!(!again.contains(LOADING_LABEL));
    detail.assert_hits(1);

    let missing = http.get(format!("{base}/api/post/sumiu")).send().await.unwrap();
    assert_eq!(missing.status(), 404);
    let missing: PostResponse = json_of(missing).await;
    assert_eq!(missing.status, "not-found");
    assert!(missing.html.contains(NOT_FOUND_LABEL));
    assert!(!generate::post_page_path(tmp.path(), "sumiu").exists());

    let bad = http.get(format!("{base}/post/..%2Fetc")).send().await.unwrap();
    assert_eq!(bad.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn trailing_slash_post_urls_get_the_same_pages() {
    let server = MockServer::start();
    mock_refs(&server);
    mock_detail(&server, "novo", Some(detail_doc("novo", "Novo")));

    let tmp = tempdir().unwrap();
    let state = ServerState::new(client_for(&server), options(tmp.path()));
    let base = spawn_app(state).await;
    let http = reqwest::Client::new();

    let pending = http.get(format!("{base}/post/novo/")).send().await.unwrap();
    assert_eq!(pending.status(), 200);
    assert!(pending.text().await.unwrap().contains(LOADING_LABEL));

    let resolved = http.get(format!("{base}/api/post/novo")).send().await.unwrap();
    assert_eq!(resolved.status(), 200);

    let ready = http.get(format!("{base}/post/novo/")).send().await.unwrap();
    assert_eq!(ready.status(), 200);
    let ready = ready.text().await.unwrap();
    assert!(ready.contains("<title>spacetraveling. | Novo</title>"));
    assert!(!ready.contains(LOADING_LABEL));
}

#[tokio::test(flavor = "multi_thread")]
async fn load_more_endpoint_returns_next_page() {
    let server = MockServer::start();
    mock_refs(&server);
    mock_second_page(&server, vec![summary_doc("c", "Terceiro post")]);

    let tmp = tempdir().unwrap();
    let state = ServerState::new(client_for(&server), options(tmp.path()));
    let base = spawn_app(state).await;
    let http = reqwest::Client::new();

    let mut url = Url::parse(&format!("{base}/api/posts")).unwrap();
    url.query_pairs_mut()
        .append_pair("cursor", &second_page_cursor(&server));
    let resp = http.get(url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let more: MoreResponse = json_of(resp).await;
    assert_eq!(more.uids, vec!["c"]);
    assert_eq!(more.next_page, "");
    assert!(more.items_html.contains("Terceiro post"));
    assert!(more.items_html.contains(r#"data-uid="c""#));

    let mut foreign = Url::parse(&format!("{base}/api/posts")).unwrap();
    foreign
        .query_pairs_mut()
        .append_pair("cursor", "https://attacker.example/api/v2/documents/search?page=2");
    let resp = http.get(foreign).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let none: MoreResponse = json_of(http.get(format!("{base}/api/posts")).send().await.unwrap()).await;
    assert!(none.uids.is_empty());
    assert_eq!(none.next_page, "");
}

#[tokio::test(flavor = "multi_thread")]
async fn cms_outage_is_reported_as_unavailable() {
    let server = MockServer::start();
    mock_refs(&server);
    server.mock(|when, then| {
        when.method(GET).path(SEARCH);
        then.status(500).body("boom");
    });

    let tmp = tempdir().unwrap();
    let state = ServerState::new(client_for(&server), options(tmp.path()));
    let base = spawn_app(state).await;
    let http = reqwest::Client::new();

    let resp = http.get(format!("{base}/api/post/qualquer")).send().await.unwrap();
    assert_eq!(resp.status(), 503);
    let err: ErrorResponse = json_of(resp).await;
    assert!(err.error.contains("unavailable"));
    assert!(!generate::post_page_path(tmp.path(), "qualquer").exists());

    let build = generate::build_site(
        &client_for(&server),
        &options(tmp.path()),
        Progress::new(false),
    )
    .await;
    assert!(build.is_err());
}
