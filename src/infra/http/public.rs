use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::{
    error::HttpError,
    portfolio::{DetailScope, PortfolioService, PostDetailView},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub portfolio: Arc<PortfolioService>,
}

pub fn build_router(state: HttpState) -> Router {
    let content_routes = Router::new()
        .route("/api/home", get(home))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{slug}", get(post_detail))
        .route("/api/case-studies", get(list_case_studies))
        .route("/api/case-studies/{slug}", get(case_study_detail))
        .route("/api/pages/{slug}", get(page_detail));

    let operational_routes = Router::new()
        .route("/_health", get(health))
        .route("/_debug/cache", get(cache_status))
        .route("/_debug/cache/clear", post(clear_cache));

    content_routes
        .merge(operational_routes)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostsQuery {
    tag: Option<String>,
    limit: Option<usize>,
    refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CacheStatusBody {
    entries: usize,
    capacity: usize,
    ttl_seconds: u64,
}

async fn home(State(state): State<HttpState>) -> impl IntoResponse {
    Json(state.portfolio.home().await)
}

async fn list_posts(
    State(state): State<HttpState>,
    Query(query): Query<PostsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let refresh = match query.refresh.as_deref() {
        Some(raw) => parse_flag(raw).ok_or_else(|| {
            HttpError::bad_request(
                "infra::http::public::list_posts",
                format!("`refresh` must be a boolean, got `{raw}`"),
            )
        })?,
        None => false,
    };
    let tag = query.tag.as_deref().filter(|tag| !tag.is_empty());
    let posts = state
        .portfolio
        .content()
        .get_posts(query.limit, tag, refresh)
        .await;
    Ok(Json(posts))
}

/// Accepts the spellings clap's `BoolishValueParser` does; blank means false.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "n" | "off" | "f" => Some(false),
        "true" | "1" | "yes" | "y" | "on" | "t" => Some(true),
        _ => None,
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    detail(&state, &slug, DetailScope::AllPosts, "infra::http::public::post_detail").await
}

async fn list_case_studies(
    State(state): State<HttpState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    Json(state.portfolio.content().get_case_studies(query.limit).await)
}

async fn case_study_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    detail(
        &state,
        &slug,
        DetailScope::CaseStudies,
        "infra::http::public::case_study_detail",
    )
    .await
}

async fn detail(
    state: &HttpState,
    slug: &str,
    scope: DetailScope,
    source: &'static str,
) -> Result<Json<PostDetailView>, HttpError> {
    match state.portfolio.post_detail(slug, scope).await {
        Some(view) => Ok(Json(view)),
        None => Err(HttpError::not_found(
            source,
            format!("no post with slug `{slug}`"),
        )),
    }
}

async fn page_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    match state.portfolio.page(&slug).await {
        Some(page) => Ok(Json((*page).clone())),
        None => Err(HttpError::not_found(
            "infra::http::public::page_detail",
            format!("no page with slug `{slug}`"),
        )),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cache_status(State(state): State<HttpState>) -> impl IntoResponse {
    let status = state.portfolio.content().snapshot();
    Json(CacheStatusBody {
        entries: status.entries,
        capacity: status.capacity,
        ttl_seconds: status.ttl_seconds,
    })
}

async fn clear_cache(State(state): State<HttpState>) -> StatusCode {
    state.portfolio.content().clear_cache();
    info!(target = "folio::http::debug", "content cache cleared on request");
    StatusCode::NO_CONTENT
}

async fn fallback() -> HttpError {
    HttpError::not_found("infra::http::public::fallback", "no route matched")
}
