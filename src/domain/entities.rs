//! Content records as delivered by the Ghost Content API.
//!
//! Only the fields the site consumes are modelled; anything else the CMS sends
//! is ignored on decode.

use serde::{Deserialize, Deserializer, Serialize};

const IMAGE_PATH: &str = "/content/images/";
const SIZED_IMAGE_PATH: &str = "/content/images/size/w1000/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub feature_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reading_time: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<TagRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<AuthorRecord>,
}

impl PostRecord {
    pub fn has_tag(&self, slug: &str) -> bool {
        self.tags.iter().any(|tag| tag.slug == slug)
    }

    /// Sort key for chronological ordering; a missing timestamp sorts as `""`.
    pub fn published_key(&self) -> &str {
        self.published_at.as_deref().unwrap_or("")
    }

    /// Point the feature image at the CMS's 1000px rendition.
    pub fn use_sized_feature_image(&mut self) {
        if let Some(image) = self.feature_image.as_mut() {
            *image = sized_image_url(image);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub feature_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<AuthorRecord>,
}

/// Rewrite a Ghost image URL to its `w1000` size variant.
///
/// URLs that already point at a size variant are returned unchanged.
pub fn sized_image_url(url: &str) -> String {
    if url.contains("/content/images/size/") {
        return url.to_string();
    }
    url.replace(IMAGE_PATH, SIZED_IMAGE_PATH)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ghost_post_with_missing_and_null_fields() {
        let json = r#"{
            "id": "65a1",
            "uuid": "ignored",
            "slug": "hello",
            "title": "Hello",
            "html": "<p>hi</p>",
            "excerpt": null,
            "published_at": "2024-03-01T10:00:00.000+00:00",
            "feature_image": null,
            "reading_time": null,
            "tags": [{"id": "t1", "slug": "news", "name": "News"}],
            "authors": [{"id": "a1", "slug": "jo", "name": "Jo"}]
        }"#;

        let post: PostRecord = serde_json::from_str(json).expect("post decodes");
        assert_eq!(post.slug, "hello");
        assert_eq!(post.reading_time, 0);
        assert!(post.excerpt.is_none());
        assert!(post.has_tag("news"));
        assert!(!post.has_tag("case-studies"));
        assert_eq!(post.authors[0].name, "Jo");
        assert!(post.authors[0].profile_image.is_none());
    }

    #[test]
    fn null_titles_and_names_decode_as_empty() {
        let json = r#"{
            "slug": "untitled",
            "title": null,
            "tags": [{"slug": "news", "name": null}],
            "authors": [{"slug": "jo", "name": null}]
        }"#;

        let post: PostRecord = serde_json::from_str(json).expect("post decodes");
        assert_eq!(post.title, "");
        assert_eq!(post.tags[0].name, "");
        assert_eq!(post.authors[0].name, "");

        let page: PageRecord =
            serde_json::from_str(r#"{"slug": "about", "title": null}"#).expect("page decodes");
        assert_eq!(page.title, "");
    }

    #[test]
    fn reading_time_defaults_when_absent() {
        let post: PostRecord = serde_json::from_str(r#"{"slug": "bare"}"#).expect("post decodes");
        assert_eq!(post.reading_time, 0);
        assert!(post.tags.is_empty());
        assert_eq!(post.published_key(), "");
    }

    #[test]
    fn feature_image_rewritten_to_sized_variant() {
        let mut post: PostRecord = serde_json::from_str(
            r#"{"slug": "img", "feature_image": "https://cms.example.com/content/images/2024/01/foo.jpg"}"#,
        )
        .expect("post decodes");

        post.use_sized_feature_image();

        assert_eq!(
            post.feature_image.as_deref(),
            Some("https://cms.example.com/content/images/size/w1000/2024/01/foo.jpg")
        );
    }

    #[test]
    fn missing_feature_image_left_untouched() {
        let mut post: PostRecord =
            serde_json::from_str(r#"{"slug": "plain"}"#).expect("post decodes");
        post.use_sized_feature_image();
        assert!(post.feature_image.is_none());
    }

    #[test]
    fn sized_image_url_is_idempotent() {
        let once = sized_image_url("https://cms.example.com/content/images/foo.jpg");
        assert_eq!(once, "https://cms.example.com/content/images/size/w1000/foo.jpg");
        assert_eq!(sized_image_url(&once), once);
    }

    #[test]
    fn external_image_urls_pass_through() {
        assert_eq!(
            sized_image_url("https://images.unsplash.com/photo-1"),
            "https://images.unsplash.com/photo-1"
        );
    }
}
