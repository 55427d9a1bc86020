use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Tag};

/// Post entity - a blog article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    /// File-store key of the illustration, if any.
    pub image: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// The one URL this post is served under.
    pub fn canonical_path(&self) -> String {
        canonical_path(&self.slug, self.id)
    }
}

pub(crate) fn canonical_path(slug: &str, id: i64) -> String {
    format!("/posts/{}/{}", slug, id)
}

/// A post together with its eagerly loaded associations.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl PostWithRelations {
    pub fn tag_ids(&self) -> BTreeSet<i64> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

/// Scalar columns written on insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image: Option<String>,
    pub category_id: Option<i64>,
}

/// A file received from the browser.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Outcome of reading the image part of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUpload {
    Received(UploadedFile),
    /// The transfer broke off; the image change is dropped.
    Failed(String),
}

/// Validated create/update submission.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category_id: Option<i64>,
    pub tag_ids: BTreeSet<i64>,
    pub image: Option<ImageUpload>,
}

impl PostInput {
    /// Scalar columns for this submission, with the image key already resolved.
    pub fn changes(&self, image: Option<String>) -> PostChanges {
        PostChanges {
            title: self.title.clone(),
            slug: self.slug.clone(),
            content: self.content.clone(),
            image,
            category_id: self.category_id,
        }
    }
}
