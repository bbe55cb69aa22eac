//! Read models for the portfolio API, assembled from the content cache.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::ContentCache;
use crate::domain::entities::{PageRecord, PostRecord};
use crate::domain::posts::CASE_STUDIES_TAG;

const NEWS_TAG: &str = "news";
const PLAYBOOK_TAG: &str = "playbook";
const TECH_STACK_TAG: &str = "tech-stack";
const HOME_NEWS_LIMIT: usize = 5;
const HOME_CASE_STUDIES_LIMIT: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub news: Vec<PostRecord>,
    pub case_studies: Vec<PostRecord>,
    pub playbook: Vec<PostRecord>,
    pub tech_stack: Vec<PostRecord>,
}

/// A single post with its neighbors in reading order.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetailView {
    pub title: String,
    pub html: Option<String>,
    pub feature_image: Option<String>,
    pub reading_time: u32,
    pub published_at: String,
    pub next_post: Option<PostRecord>,
    pub prev_post: Option<PostRecord>,
}

/// Which sequence neighbors of a post are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailScope {
    AllPosts,
    CaseStudies,
}

impl DetailScope {
    fn tag(self) -> Option<&'static str> {
        match self {
            DetailScope::AllPosts => None,
            DetailScope::CaseStudies => Some(CASE_STUDIES_TAG),
        }
    }
}

#[derive(Clone)]
pub struct PortfolioService {
    content: Arc<ContentCache>,
}

impl PortfolioService {
    pub fn new(content: Arc<ContentCache>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &Arc<ContentCache> {
        &self.content
    }

    pub async fn home(&self) -> HomeView {
        HomeView {
            news: self
                .content
                .get_posts(Some(HOME_NEWS_LIMIT), Some(NEWS_TAG), false)
                .await,
            case_studies: self
                .content
                .get_case_studies(Some(HOME_CASE_STUDIES_LIMIT))
                .await,
            playbook: self.content.get_posts(None, Some(PLAYBOOK_TAG), false).await,
            tech_stack: self
                .content
                .get_posts(None, Some(TECH_STACK_TAG), false)
                .await,
        }
    }

    pub async fn post_detail(&self, slug: &str, scope: DetailScope) -> Option<PostDetailView> {
        let post = self.content.get_post(slug, false).await?;
        let tag = scope.tag();

        let next_post = self.content.get_next_post(&post.slug, tag).await;
        let prev_post = self.content.get_prev_post(&post.slug, tag).await;

        Some(PostDetailView {
            published_at: post.published_key().to_string(),
            title: post.title,
            html: post.html,
            feature_image: post.feature_image,
            reading_time: post.reading_time,
            next_post,
            prev_post,
        })
    }

    pub async fn page(&self, slug: &str) -> Option<Arc<PageRecord>> {
        self.content.get_page(slug).await
    }
}
