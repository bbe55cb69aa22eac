//! Derived views over a post collection.
//!
//! Nothing here is cached; every view is recomputed from the single cached
//! collection.

use crate::domain::entities::PostRecord;

pub const CASE_STUDIES_TAG: &str = "case-studies";
pub const EXCERPT_LIMIT: usize = 120;
const ELLIPSIS: &str = "...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostFilter<'a> {
    All,
    Tag(&'a str),
}

impl<'a> From<Option<&'a str>> for PostFilter<'a> {
    fn from(tag: Option<&'a str>) -> Self {
        match tag {
            Some(tag) => PostFilter::Tag(tag),
            None => PostFilter::All,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Stable newest-first ordering by `published_at`.
pub fn sort_newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.published_key().cmp(a.published_key()));
}

/// Apply `filter`, keeping collection order, then keep at most `limit` posts.
pub fn collect(posts: &[PostRecord], filter: PostFilter<'_>, limit: Option<usize>) -> Vec<PostRecord> {
    let matching = posts.iter().filter(|post| match filter {
        PostFilter::All => true,
        PostFilter::Tag(tag) => post.has_tag(tag),
    });

    match limit {
        Some(limit) => matching.take(limit).cloned().collect(),
        None => matching.cloned().collect(),
    }
}

pub fn find_by_slug<'a>(posts: &'a [PostRecord], slug: &str) -> Option<&'a PostRecord> {
    posts.iter().find(|post| post.slug == slug)
}

/// Post adjacent to `slug` in `posts`; `None` at either end or when `slug` is absent.
pub fn neighbor<'a>(
    posts: &'a [PostRecord],
    slug: &str,
    direction: Direction,
) -> Option<&'a PostRecord> {
    let index = posts.iter().position(|post| post.slug == slug)?;
    match direction {
        Direction::Next => posts.get(index + 1),
        Direction::Previous => index.checked_sub(1).and_then(|prev| posts.get(prev)),
    }
}

/// Shorten an excerpt for card display. A missing excerpt becomes `""`.
pub fn card_excerpt(excerpt: Option<&str>) -> String {
    let excerpt = excerpt.unwrap_or("");
    if excerpt.chars().count() <= EXCERPT_LIMIT {
        return excerpt.to_string();
    }

    let head: String = excerpt.chars().take(EXCERPT_LIMIT).collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

/// Copy of `post` prepared for a case-study card.
pub fn case_study_card(mut post: PostRecord) -> PostRecord {
    post.excerpt = Some(card_excerpt(post.excerpt.as_deref()));
    post
}
