//! Cache key definitions.

use std::fmt;

const ALL_POSTS_KEY: &str = "all_posts";
const PAGE_KEY_PREFIX: &str = "page_";

/// Identifies one resident entry of the content cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentKey {
    /// The full post collection.
    AllPosts,
    /// A single page by slug.
    Page(String),
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKey::AllPosts => f.write_str(ALL_POSTS_KEY),
            ContentKey::Page(slug) => write!(f, "{PAGE_KEY_PREFIX}{slug}"),
        }
    }
}
