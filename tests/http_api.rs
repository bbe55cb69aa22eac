use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use folio::application::portfolio::PortfolioService;
use folio::cache::{CacheConfig, ContentCache};
use folio::infra::ghost::{ContentApi, ContentApiError};
use folio::infra::http::{HttpState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

/// In-memory CMS answering posts and pages by resource path.
#[derive(Default)]
struct FakeCms {
    calls: AtomicUsize,
}

#[async_trait]
impl ContentApi for FakeCms {
    async fn get_json(
        &self,
        resource: &[&str],
        _query: &[(&str, String)],
    ) -> Result<Value, ContentApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match resource {
            ["posts"] => Ok(json!({ "posts": [
                post("launch", "2024-05-01T00:00:00.000Z", &["news"]),
                post("redesign", "2024-04-01T00:00:00.000Z", &["case-studies"]),
                post("update", "2024-03-01T00:00:00.000Z", &["news"]),
                post("audit", "2024-02-01T00:00:00.000Z", &["case-studies", "playbook"]),
            ]})),
            ["pages", "slug", "about"] => Ok(json!({ "pages": [
                {"slug": "about", "title": "About me", "html": "<p>Designer.</p>"}
            ]})),
            ["pages", "slug", _] => Err(ContentApiError::fetch(Some(404), "Resource not found")),
            _ => Err(ContentApiError::fetch(Some(400), "unknown resource")),
        }
    }
}

fn post(slug: &str, published_at: &str, tags: &[&str]) -> Value {
    json!({
        "slug": slug,
        "title": slug.to_uppercase(),
        "html": format!("<p>{slug}</p>"),
        "excerpt": "x".repeat(150),
        "published_at": published_at,
        "reading_time": 4,
        "tags": tags.iter().map(|tag| json!({"slug": tag, "name": tag})).collect::<Vec<_>>(),
    })
}

fn app() -> (Router, Arc<FakeCms>) {
    let cms = Arc::new(FakeCms::default());
    let cache = ContentCache::new(cms.clone(), &CacheConfig::default());
    let state = HttpState {
        portfolio: Arc::new(PortfolioService::new(Arc::new(cache))),
    };
    (build_router(state), cms)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<Value>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    let body = serde_json::from_slice(&bytes).ok();
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<Value>) {
    send(app, Method::GET, uri).await
}

fn slugs(body: &Value) -> Vec<&str> {
    body.as_array()
        .expect("array body")
        .iter()
        .filter_map(|post| post["slug"].as_str())
        .collect()
}

#[tokio::test]
async fn health_is_no_content() {
    let (app, _) = app();
    let (status, _) = get(&app, "/_health").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn posts_filtered_by_tag_and_limited() {
    let (app, cms) = app();

    let (status, body) = get(&app, "/api/posts?tag=news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&body.expect("json")), vec!["launch", "update"]);

    let (_, body) = get(&app, "/api/posts?limit=3").await;
    assert_eq!(
        slugs(&body.expect("json")),
        vec!["launch", "redesign", "update"]
    );

    assert_eq!(cms.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_parameter_forces_refetch() {
    let (app, cms) = app();

    get(&app, "/api/posts").await;
    get(&app, "/api/posts?refresh=true").await;
    get(&app, "/api/posts?refresh=1").await;
    get(&app, "/api/posts?refresh=no").await;

    assert_eq!(cms.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unparseable_refresh_is_bad_request() {
    let (app, cms) = app();

    let request = Request::builder()
        .uri("/api/posts?refresh=maybe")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    assert_eq!(&bytes[..], b"Bad request");
    assert_eq!(cms.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn post_detail_includes_neighbors() {
    let (app, _) = app();

    let (status, body) = get(&app, "/api/posts/redesign").await;
    let body = body.expect("json");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "REDESIGN");
    assert_eq!(body["reading_time"], 4);
    assert_eq!(body["published_at"], "2024-04-01T00:00:00.000Z");
    assert_eq!(body["next_post"]["slug"], "update");
    assert_eq!(body["prev_post"]["slug"], "launch");
}

#[tokio::test]
async fn case_study_detail_neighbors_stay_within_case_studies() {
    let (app, _) = app();

    let (status, body) = get(&app, "/api/case-studies/redesign").await;
    let body = body.expect("json");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_post"]["slug"], "audit");
    assert!(body["prev_post"].is_null());
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let (app, _) = app();
    let (status, _) = get(&app, "/api/posts/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn case_studies_have_card_excerpts() {
    let (app, _) = app();

    let (status, body) = get(&app, "/api/case-studies?limit=1").await;
    let body = body.expect("json");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&body), vec!["redesign"]);
    assert_eq!(body[0]["excerpt"], format!("{}...", "x".repeat(120)));
}

#[tokio::test]
async fn home_assembles_sections() {
    let (app, _) = app();

    let (status, body) = get(&app, "/api/home").await;
    let body = body.expect("json");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&body["news"]), vec!["launch", "update"]);
    assert_eq!(slugs(&body["case_studies"]), vec!["redesign", "audit"]);
    assert_eq!(slugs(&body["playbook"]), vec!["audit"]);
    assert!(body["tech_stack"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn pages_found_and_missing() {
    let (app, _) = app();

    let (status, body) = get(&app, "/api/pages/about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.expect("json")["title"], "About me");

    let (status, _) = get(&app, "/api/pages/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_endpoints_report_and_clear_cache() {
    let (app, cms) = app();

    get(&app, "/api/posts").await;
    get(&app, "/api/pages/about").await;

    let (status, body) = get(&app, "/_debug/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.expect("json"),
        json!({"entries": 2, "capacity": 100, "ttl_seconds": 3600})
    );

    let (status, _) = send(&app, Method::POST, "/_debug/cache/clear").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/_debug/cache").await;
    assert_eq!(body.expect("json")["entries"], 0);

    get(&app, "/api/posts").await;
    assert_eq!(cms.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _) = app();
    let (status, _) = get(&app, "/wp-admin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
