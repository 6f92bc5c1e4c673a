//! Blog server
//!
//! Serves the build output and renders the pages the build skipped: a post
//! that was not pre-rendered is resolved on its first request, stored in the
//! [`GenerationCache`] and served from there afterwards. While the preview
//! cookie is set every page is rendered fresh from the preview ref and
//! nothing is cached.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::GenerationCache;
use crate::cms::ContentRef;
use crate::content::Cursor;
use crate::error::{ContentError, FetchError};
use crate::generator::Generator;
use crate::helpers::url_for;
use crate::pager::ListingPager;
use crate::resolver::DetailResolver;
use crate::templates::PostCardData;
use crate::Blog;

/// Cookie holding the active preview ref
pub const PREVIEW_COOKIE: &str = "ignite_preview";

/// Server state
pub struct ServerState {
    blog: Blog,
    generator: Generator,
    cache: GenerationCache,
}

impl ServerState {
    pub fn new(blog: Blog) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(&blog.config)?,
            cache: GenerationCache::new(&blog.public_dir),
            blog,
        })
    }

    fn resolver(&self, reference: ContentRef) -> DetailResolver<'_> {
        DetailResolver::new(self.blog.api.as_ref(), &self.blog.config.api.document_type)
            .with_reference(reference)
            .words_per_minute(self.blog.config.detail.words_per_minute)
    }

    fn pager(&self, reference: ContentRef) -> ListingPager<'_> {
        ListingPager::new(self.blog.api.as_ref(), &self.blog.config.api.document_type)
            .with_reference(reference)
    }

    async fn render_post(&self, id: &str, reference: ContentRef) -> Result<String, PageError> {
        let resolved = self.resolver(reference).resolve(id).await?;
        Ok(self.generator.render_post(&resolved)?)
    }

    async fn render_listing(&self, reference: ContentRef) -> Result<String, PageError> {
        let preview = reference.is_preview();
        let page = self
            .pager(reference)
            .load_initial_page(self.blog.config.listing.page_size)
            .await
            .map_err(ContentError::from)?;
        Ok(self.generator.render_listing(&page, preview)?)
    }

    fn error_response(&self, id: &str, err: PageError) -> Response {
        match err {
            PageError::Content(ContentError::NotFound { .. }) => {
                tracing::debug!("No post '{}'", id);
                match self.generator.render_not_found(id) {
                    Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                    Err(e) => internal_error(e),
                }
            }
            PageError::Content(ContentError::Fetch(e)) => bad_gateway(e),
            PageError::Render(e) => internal_error(e),
        }
    }
}

/// Why a page could not be served
#[derive(Debug)]
enum PageError {
    Content(ContentError),
    Render(anyhow::Error),
}

impl From<ContentError> for PageError {
    fn from(e: ContentError) -> Self {
        PageError::Content(e)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(e: anyhow::Error) -> Self {
        PageError::Render(e)
    }
}

/// Router for the blog, mounted under the configured root
pub fn app(state: Arc<ServerState>) -> Router {
    let public_dir = state.blog.public_dir.clone();
    let root = state.blog.config.root.trim_end_matches('/').to_string();

    let routes = Router::new()
        .route("/", get(index_handler))
        .route("/post/:id", get(post_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .with_state(state);

    let router = if root.is_empty() {
        routes
    } else {
        Router::new().nest(&root, routes)
    };
    router.layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(blog.clone())?);
    let app = app(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, url_for(&blog.config, ""));
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Listing page: the built `index.html`, or a fresh render in preview
async fn index_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let reference = content_ref(&headers);
    if reference.is_preview() {
        return match state.render_listing(reference).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => state.error_response("", e),
        };
    }

    let index = state.blog.public_dir.join("index.html");
    if let Ok(html) = tokio::fs::read_to_string(&index).await {
        return Html(html).into_response();
    }

    match state.render_listing(ContentRef::Published).await {
        Ok(html) => {
            if let Err(e) = write_file(&index, &html).await {
                tracing::warn!("Failed to store listing {:?}: {}", index, e);
            }
            Html(html).into_response()
        }
        Err(e) => state.error_response("", e),
    }
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let reference = content_ref(&headers);
    if reference.is_preview() {
        return match state.render_post(&id, reference).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => state.error_response(&id, e),
        };
    }

    let page = state
        .cache
        .get_or_try_insert_with(&id, || state.render_post(&id, ContentRef::Published))
        .await;
    match page {
        Ok(html) => Html(html.to_string()).into_response(),
        Err(e) => state.error_response(&id, e),
    }
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    cursor: Option<String>,
}

/// Body of `/api/posts`
#[derive(Debug, Serialize)]
struct PostsResponse {
    results: Vec<PostCardData>,
    next_page: Option<String>,
}

/// Next listing page for the "load more" button; the first page without a cursor
async fn posts_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PostsQuery>,
    headers: HeaderMap,
) -> Response {
    let pager = state.pager(content_ref(&headers));
    let page = match query.cursor.filter(|c| !c.is_empty()) {
        Some(cursor) => pager.load_next_page(&Cursor::from_wire(cursor)).await,
        None => {
            pager
                .load_initial_page(state.blog.config.listing.page_size)
                .await
        }
    };

    match page {
        Ok(page) => Json(PostsResponse {
            results: page.items.iter().map(|p| state.generator.card(p)).collect(),
            next_page: page.continuation.map(|c| c.as_str().to_string()),
        })
        .into_response(),
        Err(FetchError::ForeignCursor(cursor)) => {
            tracing::warn!("Rejected cursor {}", cursor);
            (StatusCode::BAD_REQUEST, "invalid cursor").into_response()
        }
        Err(e) => bad_gateway(e),
    }
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    token: Option<String>,
}

/// Enter preview mode with the given ref
async fn preview_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let Some(token) = query.token.filter(|t| !t.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing preview token").into_response();
    };
    tracing::info!("Entering preview mode");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        utf8_percent_encode(&token, NON_ALPHANUMERIC)
    );
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&url_for(&state.blog.config, "")),
    )
        .into_response()
}

async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> Response {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", PREVIEW_COOKIE);
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&url_for(&state.blog.config, "")),
    )
        .into_response()
}

/// Preview ref from the request cookies, published content otherwise
fn content_ref(headers: &HeaderMap) -> ContentRef {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
        .filter(|value| !value.is_empty())
        .map(|value| ContentRef::Preview(value.into_owned()))
        .unwrap_or_default()
}

fn bad_gateway(e: FetchError) -> Response {
    tracing::error!("Content API error: {}", e);
    (StatusCode::BAD_GATEWAY, "content API unavailable").into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!("Render error: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

async fn write_file(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{ContentApi, MemoryApi, Predicate, QueryOptions, RawDoc};
    use crate::config::SiteConfig;
    use crate::content::Page;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn doc(uid: &str, title: &str, published: &str) -> RawDoc {
        serde_json::from_value(json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "post",
            "first_publication_date": published,
            "data": {
                "title": title,
                "subtitle": "Subtitle",
                "author": "Author",
                "banner": { "url": "https://images.prismic.io/b.png" },
                "content": [{ "heading": "H", "body": [{ "text": "some words here" }] }]
            }
        }))
        .unwrap()
    }

    fn memory_api() -> MemoryApi {
        MemoryApi::new(vec![
            doc("p1", "Post one", "2020-01-01T00:00:00+0000"),
            doc("p2", "Post two", "2020-02-01T00:00:00+0000"),
            doc("p3", "Post three", "2020-03-01T00:00:00+0000"),
        ])
        .with_preview(
            "draft-ref",
            vec![doc("p1", "Post one (draft)", "2020-01-01T00:00:00+0000")],
        )
    }

    fn setup(api: Arc<dyn ContentApi>) -> (tempfile::TempDir, Arc<ServerState>) {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_api(SiteConfig::default(), dir.path().to_path_buf(), api);
        let state = Arc::new(ServerState::new(blog).unwrap());
        (dir, state)
    }

    async fn get(state: &Arc<ServerState>, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app(state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    struct Down;

    #[async_trait]
    impl ContentApi for Down {
        async fn query(
            &self,
            _predicates: &[Predicate],
            _options: &QueryOptions,
        ) -> Result<Page<RawDoc>, FetchError> {
            Err(FetchError::Status {
                status: 503,
                body: "maintenance".to_string(),
            })
        }

        async fn fetch_page(&self, _cursor: &Cursor) -> Result<Page<RawDoc>, FetchError> {
            Err(FetchError::Status {
                status: 503,
                body: "maintenance".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_post_rendered_on_demand_and_cached() {
        let (dir, state) = setup(Arc::new(memory_api()));

        let (status, _, body) = get(&state, "/post/p1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post one"));
        assert!(body.contains("Post two"));
        assert!(dir.path().join("public/post/p1/index.html").exists());
        assert_eq!(state.cache.len().await, 1);

        let (status, _, again) = get(&state, "/post/p1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, again);
    }

    #[tokio::test]
    async fn test_unknown_post_is_404_and_not_cached() {
        let (dir, state) = setup(Arc::new(memory_api()));

        let (status, _, body) = get(&state, "/post/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("nope"));
        assert!(state.cache.is_empty().await);
        assert!(!dir.path().join("public/post/nope").exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_bad_gateway() {
        let (_dir, state) = setup(Arc::new(Down));
        let (status, _, _) = get(&state, "/post/p1", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(state.cache.is_empty().await);

        let (status, _, _) = get(&state, "/", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_listing_is_rendered_and_stored() {
        let (dir, state) = setup(Arc::new(memory_api()));
        let (status, _, body) = get(&state, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post three"));
        assert!(body.contains("Post two"));
        assert!(!body.contains("Post one"));
        assert!(dir.path().join("public/index.html").exists());
    }

    #[tokio::test]
    async fn test_load_more_api() {
        let (_dir, state) = setup(Arc::new(memory_api()));

        let (status, _, body) = get(&state, "/api/posts", None).await;
        assert_eq!(status, StatusCode::OK);
        let first: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(first["results"].as_array().unwrap().len(), 2);
        assert_eq!(first["results"][0]["id"], "p3");
        let cursor = first["next_page"].as_str().unwrap().to_string();

        let uri = format!(
            "/api/posts?cursor={}",
            utf8_percent_encode(&cursor, NON_ALPHANUMERIC)
        );
        let (status, _, body) = get(&state, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let second: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(second["results"].as_array().unwrap().len(), 1);
        assert_eq!(second["results"][0]["id"], "p1");
        assert_eq!(second["results"][0]["path"], "/post/p1");
        assert!(second["next_page"].is_null());
    }

    #[tokio::test]
    async fn test_foreign_cursor_is_rejected() {
        let (_dir, state) = setup(Arc::new(memory_api()));
        let (status, _, _) = get(&state, "/api/posts?cursor=https%3A%2F%2Fevil.example%2F", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_cookie_round_trip() {
        let (dir, state) = setup(Arc::new(memory_api()));

        let (status, headers, _) = get(&state, "/api/preview?token=draft-ref", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/");
        let cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("ignite_preview=draft%2Dref;"));

        let (status, _, body) =
            get(&state, "/post/p1", Some("theme=dark; ignite_preview=draft%2Dref")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post one (draft)"));
        assert!(state.cache.is_empty().await);
        assert!(!dir.path().join("public/post/p1").exists());

        let (status, _, body) = get(&state, "/", Some("ignite_preview=draft%2Dref")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Sair do modo Preview"));
        assert!(!dir.path().join("public/index.html").exists());

        let (status, headers, _) = get(&state, "/api/exit-preview", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(headers[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_preview_requires_token() {
        let (_dir, state) = setup(Arc::new(memory_api()));
        let (status, _, _) = get(&state, "/api/preview", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_static_files_are_served() {
        let (dir, state) = setup(Arc::new(memory_api()));
        let css = dir.path().join("public/css/style.css");
        std::fs::create_dir_all(css.parent().unwrap()).unwrap();
        std::fs::write(&css, "body {}").unwrap();

        let (status, _, body) = get(&state, "/css/style.css", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body {}");
    }

    #[test]
    fn test_content_ref_from_cookies() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_ref(&headers), ContentRef::Published);

        headers.insert(header::COOKIE, "a=1; ignite_preview=x%3Ay".parse().unwrap());
        assert_eq!(content_ref(&headers), ContentRef::Preview("x:y".to_string()));

        headers.insert(header::COOKIE, "ignite_preview=".parse().unwrap());
        assert_eq!(content_ref(&headers), ContentRef::Published);
    }
}
