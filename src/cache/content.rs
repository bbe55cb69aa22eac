//! Content service: every CMS read goes through here.
//!
//! Reads are memoized in a [`TtlLruStore`]. A failed refresh never reaches the
//! caller; it is logged and answered with whatever value is still held for the
//! key, or with an empty result when nothing is.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::entities::{PageRecord, PostRecord};
use crate::domain::posts::{
    self, CASE_STUDIES_TAG, Direction, PostFilter, case_study_card, sort_newest_first,
};
use crate::infra::ghost::{ContentApi, ContentApiError};

use super::config::CacheConfig;
use super::keys::ContentKey;
use super::store::TtlLruStore;

const METRIC_CACHE_STALE_SERVED: &str = "folio_cache_stale_served_total";

const POSTS_RESOURCE: &str = "posts";
const PAGES_RESOURCE: &str = "pages";
const POST_INCLUDE: &str = "tags,authors";
const POST_FORMATS: &str = "html";
const PAGE_INCLUDE: &str = "authors";
const PAGE_FIELDS: &str = "title,slug,html,excerpt,published_at,feature_image";

/// What the store holds for one key.
#[derive(Debug, Clone)]
pub enum CachedContent {
    Posts(Arc<Vec<PostRecord>>),
    Page(Arc<PageRecord>),
}

/// Values that can round-trip through [`CachedContent`].
trait Cacheable: Clone {
    fn into_content(self) -> CachedContent;
    fn from_content(content: CachedContent) -> Option<Self>;
}

impl Cacheable for Arc<Vec<PostRecord>> {
    fn into_content(self) -> CachedContent {
        CachedContent::Posts(self)
    }

    fn from_content(content: CachedContent) -> Option<Self> {
        match content {
            CachedContent::Posts(posts) => Some(posts),
            CachedContent::Page(_) => None,
        }
    }
}

impl Cacheable for Arc<PageRecord> {
    fn into_content(self) -> CachedContent {
        CachedContent::Page(self)
    }

    fn from_content(content: CachedContent) -> Option<Self> {
        match content {
            CachedContent::Page(page) => Some(page),
            CachedContent::Posts(_) => None,
        }
    }
}

#[derive(Debug, Error)]
enum RefreshError {
    #[error(transparent)]
    Api(#[from] ContentApiError),
    #[error("unexpected content payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl RefreshError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Api(err) => err.kind(),
            Self::Payload(_) => "payload",
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status(),
            Self::Payload(_) => None,
        }
    }

    fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }
}

#[derive(Deserialize)]
struct PostsEnvelope {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

#[derive(Deserialize)]
struct PagesEnvelope {
    #[serde(default)]
    pages: Vec<PageRecord>,
}

/// Resident entries and bounds, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_seconds: u64,
}

/// Cached, degrade-tolerant view of the CMS content.
pub struct ContentCache {
    api: Arc<dyn ContentApi>,
    store: TtlLruStore<CachedContent>,
}

impl ContentCache {
    pub fn new(api: Arc<dyn ContentApi>, config: &CacheConfig) -> Self {
        Self {
            api,
            store: TtlLruStore::new(config),
        }
    }

    /// The full post collection, newest first.
    ///
    /// `force_refresh` skips the fresh-hit check but leaves the resident entry
    /// in place, so it still serves as the fallback if that fetch fails.
    #[instrument(skip(self))]
    pub async fn get_all_posts(&self, force_refresh: bool) -> Arc<Vec<PostRecord>> {
        let query = [
            ("include", POST_INCLUDE.to_string()),
            ("formats", POST_FORMATS.to_string()),
            ("limit", "all".to_string()),
        ];

        self.cached_or_degrade(
            ContentKey::AllPosts,
            &[POSTS_RESOURCE],
            &query,
            force_refresh,
            decode_posts,
        )
        .await
        .unwrap_or_default()
    }

    /// Posts carrying `tag` (all posts when `None`), at most `limit` of them.
    ///
    /// A limit of zero means no limit.
    pub async fn get_posts(
        &self,
        limit: Option<usize>,
        tag: Option<&str>,
        force_refresh: bool,
    ) -> Vec<PostRecord> {
        let all = self.get_all_posts(force_refresh).await;
        posts::collect(&all, PostFilter::from(tag), limit.filter(|limit| *limit > 0))
    }

    pub async fn get_post(&self, slug: &str, force_refresh: bool) -> Option<PostRecord> {
        let all = self.get_all_posts(force_refresh).await;
        posts::find_by_slug(&all, slug).cloned()
    }

    /// Case-study posts with excerpts shortened for cards.
    pub async fn get_case_studies(&self, limit: Option<usize>) -> Vec<PostRecord> {
        self.get_posts(limit, Some(CASE_STUDIES_TAG), false)
            .await
            .into_iter()
            .map(case_study_card)
            .collect()
    }

    /// The post after `current` in the (optionally tag-filtered) collection.
    pub async fn get_next_post(&self, current: &str, tag: Option<&str>) -> Option<PostRecord> {
        self.neighbor(current, tag, Direction::Next).await
    }

    /// The post before `current` in the (optionally tag-filtered) collection.
    pub async fn get_prev_post(&self, current: &str, tag: Option<&str>) -> Option<PostRecord> {
        self.neighbor(current, tag, Direction::Previous).await
    }

    async fn neighbor(
        &self,
        current: &str,
        tag: Option<&str>,
        direction: Direction,
    ) -> Option<PostRecord> {
        let filtered = self.get_posts(None, tag, false).await;
        posts::neighbor(&filtered, current, direction).cloned()
    }

    #[instrument(skip(self))]
    pub async fn get_page(&self, slug: &str) -> Option<Arc<PageRecord>> {
        let query = [
            ("include", PAGE_INCLUDE.to_string()),
            ("fields", PAGE_FIELDS.to_string()),
        ];

        self.cached_or_degrade(
            ContentKey::Page(slug.to_string()),
            &[PAGES_RESOURCE, "slug", slug],
            &query,
            false,
            decode_page,
        )
        .await
    }

    /// Drop every resident entry.
    pub fn clear_cache(&self) {
        let entries = self.store.len();
        self.store.clear();
        debug!(entries, "Content cache cleared");
    }

    pub fn snapshot(&self) -> CacheStatus {
        CacheStatus {
            entries: self.store.len(),
            capacity: self.store.capacity(),
            ttl_seconds: self.store.ttl().as_secs(),
        }
    }

    /// Fresh value for `key`, else fetch-decode-store, else the held fallback.
    ///
    /// `decode` returning `Ok(None)` means the CMS answered but had nothing for
    /// the key; that answer is passed through and not stored.
    async fn cached_or_degrade<T, D>(
        &self,
        key: ContentKey,
        resource: &[&str],
        query: &[(&str, String)],
        force_refresh: bool,
        decode: D,
    ) -> Option<T>
    where
        T: Cacheable,
        D: FnOnce(Value) -> Result<Option<T>, serde_json::Error>,
    {
        let key = key.to_string();

        if !force_refresh {
            if let Some(value) = self.store.get(&key).and_then(T::from_content) {
                return Some(value);
            }
        }

        let refreshed = match self.api.get_json(resource, query).await {
            Ok(body) => decode(body).map_err(RefreshError::from),
            Err(err) => Err(RefreshError::from(err)),
        };

        match refreshed {
            Ok(Some(value)) => {
                if let Some(displaced) = self.store.insert(key.clone(), value.clone().into_content())
                {
                    debug!(key = %key, displaced = %displaced, "Evicted least recently used entry");
                }
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Content API returned no record");
                None
            }
            Err(err) => self.degrade(&key, resource, &err),
        }
    }

    fn degrade<T: Cacheable>(
        &self,
        key: &str,
        resource: &[&str],
        err: &RefreshError,
    ) -> Option<T> {
        let held = self.store.get_stale(key);
        let stale_age_ms = held.as_ref().map(|held| held.age.as_millis() as u64);
        let stale_expired = held.as_ref().map(|held| held.is_expired);
        let held = held.and_then(|held| T::from_content(held.value));
        let serving_stale = held.is_some();

        if serving_stale {
            counter!(METRIC_CACHE_STALE_SERVED).increment(1);
        }

        let resource = resource.join("/");
        if err.is_not_found() {
            debug!(
                key = %key,
                resource = %resource,
                serving_stale,
                stale_age_ms,
                "Content API has no such resource"
            );
        } else {
            warn!(
                key = %key,
                resource = %resource,
                status = err.status(),
                error_kind = err.kind(),
                serving_stale,
                stale_age_ms,
                stale_expired,
                error = %err,
                "Content refresh failed"
            );
        }

        held
    }
}

fn decode_posts(body: Value) -> Result<Option<Arc<Vec<PostRecord>>>, serde_json::Error> {
    let PostsEnvelope { mut posts } = serde_json::from_value(body)?;
    for post in &mut posts {
        post.use_sized_feature_image();
    }
    sort_newest_first(&mut posts);
    Ok(Some(Arc::new(posts)))
}

fn decode_page(body: Value) -> Result<Option<Arc<PageRecord>>, serde_json::Error> {
    let PagesEnvelope { pages } = serde_json::from_value(body)?;
    Ok(pages.into_iter().next().map(Arc::new))
}
