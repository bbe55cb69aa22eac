use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::{
    Router,
    http::{StatusCode, header::CONTENT_TYPE},
};
use folio::cache::{CacheConfig, ContentCache};
use folio::config::{CmsSettings, FetchSettings};
use folio::infra::ghost::{ContentApi, ContentApiError, GhostClient};
use httpmock::MockServer;
use serde_json::json;
use url::Url;

const KEY: &str = "test-content-key";

fn fetch_settings(max_attempts: u32, backoff_ms: u64) -> FetchSettings {
    FetchSettings {
        max_attempts: NonZeroU32::new(max_attempts).expect("non-zero attempts"),
        backoff_base: Duration::from_millis(backoff_ms),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
    }
}

fn client(base_url: &str, fetch: &FetchSettings) -> GhostClient {
    let cms = CmsSettings {
        url: Some(Url::parse(base_url).expect("base url parses")),
        content_api_key: Some(KEY.to_string()),
        api_version: "v5".to_string(),
    };
    GhostClient::new(&cms, fetch).expect("client builds")
}

fn cache(client: GhostClient, ttl: Duration) -> ContentCache {
    ContentCache::new(Arc::new(client), &CacheConfig { ttl, capacity: 100 })
}

/// Serve `respond(n)` for the n-th request (1-based) and count requests.
async fn spawn_fake_cms<F>(respond: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(usize) -> (StatusCode, String) + Clone + Send + Sync + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let app = Router::new().fallback(move || {
        let counter = Arc::clone(&counter);
        let respond = respond.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let (status, body) = respond(n);
            (status, [(CONTENT_TYPE, "application/json")], body)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("fake CMS should bind");
    let addr = listener.local_addr().expect("fake CMS address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake CMS should serve");
    });

    (format!("http://{addr}"), hits)
}

fn posts_body() -> String {
    json!({
        "posts": [
            {
                "slug": "older",
                "title": "Older",
                "published_at": "2024-01-01T00:00:00.000Z",
                "feature_image": "https://cms.example.com/content/images/2024/01/older.jpg",
                "tags": [{"slug": "news", "name": "News"}]
            },
            {
                "slug": "newer",
                "title": "Newer",
                "published_at": "2024-06-01T00:00:00.000Z",
                "feature_image": null,
                "tags": [{"slug": "case-studies", "name": "Case studies"}]
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn collection_request_carries_key_and_includes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/ghost/api/v5/content/posts/")
            .query_param("key", KEY)
            .query_param("include", "tags,authors")
            .query_param("formats", "html")
            .query_param("limit", "all");
        then.status(200)
            .header("content-type", "application/json")
            .body(posts_body());
    });

    let cache = cache(
        client(&server.base_url(), &fetch_settings(3, 1)),
        Duration::from_secs(3600),
    );

    let posts = cache.get_all_posts(false).await;
    let again = cache.get_all_posts(false).await;

    mock.assert();
    assert_eq!(posts, again);
    assert_eq!(posts[0].slug, "newer");
    assert_eq!(
        posts[1].feature_image.as_deref(),
        Some("https://cms.example.com/content/images/size/w1000/2024/01/older.jpg")
    );
}

#[tokio::test]
async fn page_request_uses_slug_path_and_field_projection() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/ghost/api/v5/content/pages/slug/about/")
            .query_param("key", KEY)
            .query_param("include", "authors")
            .query_param("fields", "title,slug,html,excerpt,published_at,feature_image");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"pages":[{"slug":"about","title":"About","html":"<p>Hi</p>"}]}"#);
    });

    let cache = cache(
        client(&server.base_url(), &fetch_settings(3, 1)),
        Duration::from_secs(3600),
    );

    let page = cache.get_page("about").await.expect("page present");
    assert_eq!(page.title, "About");
    assert!(cache.get_page("about").await.is_some());

    mock.assert();
}

#[tokio::test]
async fn retryable_status_is_attempted_exactly_max_attempts_times() {
    let (base, hits) =
        spawn_fake_cms(|_| (StatusCode::SERVICE_UNAVAILABLE, "{}".to_string())).await;
    let fetch = fetch_settings(3, 40);
    let client = client(&base, &fetch);

    let started = Instant::now();
    let err = client
        .get_json(&["posts"], &[])
        .await
        .expect_err("every attempt fails");
    let elapsed = started.elapsed();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, ContentApiError::Fetch { .. }));
    // 40ms after the first attempt, 80ms after the second.
    assert!(elapsed >= Duration::from_millis(120), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn non_retryable_status_fails_on_first_attempt() {
    let (base, hits) =
        spawn_fake_cms(|_| (StatusCode::UNAUTHORIZED, r#"{"errors":[]}"#.to_string())).await;
    let client = client(&base, &fetch_settings(3, 40));

    let err = client
        .get_json(&["posts"], &[])
        .await
        .expect_err("unauthorized");

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn transient_failures_recover_within_budget() {
    let (base, hits) = spawn_fake_cms(|n| {
        if n < 3 {
            (StatusCode::TOO_MANY_REQUESTS, "{}".to_string())
        } else {
            (StatusCode::OK, posts_body())
        }
    })
    .await;
    let cache = cache(client(&base, &fetch_settings(3, 5)), Duration::from_secs(3600));

    let posts = cache.get_all_posts(false).await;

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn expired_collection_is_served_when_cms_goes_down() {
    let (base, hits) = spawn_fake_cms(|n| {
        if n == 1 {
            (StatusCode::OK, posts_body())
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "{}".to_string())
        }
    })
    .await;
    let cache = cache(client(&base, &fetch_settings(2, 1)), Duration::ZERO);

    let fresh = cache.get_all_posts(false).await;
    let stale = cache.get_all_posts(false).await;

    assert_eq!(fresh, stale);
    assert_eq!(stale.len(), 2);
    // One success, then one refresh exhausting two attempts.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unreachable_cms_on_cold_start_yields_empty() {
    let (base, _hits) =
        spawn_fake_cms(|_| (StatusCode::BAD_GATEWAY, "{}".to_string())).await;
    let cache = cache(client(&base, &fetch_settings(2, 1)), Duration::from_secs(3600));

    assert!(cache.get_all_posts(false).await.is_empty());
    assert!(cache.get_case_studies(None).await.is_empty());
    assert!(cache.get_page("about").await.is_none());
}

#[tokio::test]
async fn unconfigured_client_never_touches_network() {
    let cms = CmsSettings {
        url: None,
        content_api_key: None,
        api_version: "v5".to_string(),
    };
    let client = GhostClient::new(&cms, &fetch_settings(3, 1)).expect("client builds");
    let cache = cache(client, Duration::from_secs(3600));

    assert!(cache.get_all_posts(false).await.is_empty());
    assert!(cache.get_post("anything", false).await.is_none());
}
