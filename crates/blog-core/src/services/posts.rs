//! Post read and write paths.

use std::sync::Arc;

use crate::domain::{ImageUpload, Page, PageRequest, Post, PostInput, PostWithRelations};
use crate::error::{DomainError, RepoError};
use crate::ports::{CategoryRepository, FileStore, IMAGE_NAMESPACE, PostRepository, TagRepository};
use crate::validation::{FieldErrors, SLUG_TAKEN};

/// Result of looking a post up by id and the slug found in the URL.
#[derive(Debug)]
pub enum ShowOutcome {
    Render(PostWithRelations),
    /// The slug in the URL is stale; answer with a redirect to this path.
    Redirect(String),
}

/// Creates, updates and reads posts.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    files: Arc<dyn FileStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            files,
        }
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<PostWithRelations>, DomainError> {
        Ok(self.posts.paginate(request).await?)
    }

    pub async fn show(&self, id: i64, requested_slug: &str) -> Result<ShowOutcome, DomainError> {
        let post = self.find(id).await?;

        if post.post.slug != requested_slug {
            tracing::debug!(
                post_id = id,
                requested_slug,
                canonical_slug = %post.post.slug,
                "Redirecting to canonical URL"
            );
            return Ok(ShowOutcome::Redirect(post.post.canonical_path()));
        }

        Ok(ShowOutcome::Render(post))
    }

    /// Load a post with its category and tags.
    pub async fn find(&self, id: i64) -> Result<PostWithRelations, DomainError> {
        self.posts
            .find_with_relations(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Post",
                id,
            })
    }

    /// Check references against the stores: category, tags and slug uniqueness.
    pub async fn validate(&self, input: &PostInput, editing: Option<i64>) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();

        if let Some(category_id) = input.category_id {
            if self.categories.find_by_id(category_id).await?.is_none() {
                errors.add("category_id", "La catégorie sélectionnée n'existe pas.");
            }
        }

        for missing in self.tags.find_missing(&input.tag_ids).await? {
            errors.add("tags", format!("Le tag {} n'existe pas.", missing));
        }

        if self.posts.slug_taken(&input.slug, editing).await? {
            errors.add("slug", SLUG_TAKEN);
        }

        errors.into_result().map_err(DomainError::Validation)
    }

    pub async fn create(&self, mut input: PostInput) -> Result<Post, DomainError> {
        self.validate(&input, None).await?;

        let stored = self.store_image(input.image.take()).await?;
        let changes = input.changes(stored.clone());

        let post = match self.posts.insert(changes, &input.tag_ids).await {
            Ok(post) => post,
            Err(e) => {
                self.discard(stored).await;
                return Err(e.into());
            }
        };

        tracing::info!(post_id = post.id, slug = %post.slug, "Post created");
        Ok(post)
    }

    pub async fn update(&self, id: i64, mut input: PostInput) -> Result<Post, DomainError> {
        let existing = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Post",
                id,
            })?;

        self.validate(&input, Some(id)).await?;

        let stored = self.store_image(input.image.take()).await?;
        let image = stored.clone().or_else(|| existing.image.clone());
        let changes = input.changes(image);

        let post = match self.posts.update(id, changes, &input.tag_ids).await {
            Ok(post) => post,
            Err(RepoError::NotFound) => {
                self.discard(stored).await;
                return Err(DomainError::NotFound {
                    entity_type: "Post",
                    id,
                });
            }
            Err(e) => {
                self.discard(stored).await;
                return Err(e.into());
            }
        };

        // The new reference is committed; the old blob is now an orphan.
        if stored.is_some() && existing.image != stored {
            self.discard(existing.image).await;
        }

        tracing::info!(post_id = post.id, slug = %post.slug, "Post updated");
        Ok(post)
    }

    /// Store a received image. Broken transfers leave the field untouched.
    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, DomainError> {
        match image {
            None => Ok(None),
            Some(ImageUpload::Failed(reason)) => {
                tracing::warn!(%reason, "Ignoring image upload that did not complete");
                Ok(None)
            }
            Some(ImageUpload::Received(file)) => {
                let key = self.files.put(IMAGE_NAMESPACE, &file).await.map_err(|e| {
                    tracing::error!("Failed to store uploaded image: {}", e);
                    DomainError::from(e)
                })?;
                tracing::debug!(%key, bytes = file.bytes.len(), "Image stored");
                Ok(Some(key))
            }
        }
    }

    /// Best-effort blob removal.
    async fn discard(&self, key: Option<String>) {
        let Some(key) = key else {
            return;
        };

        if let Err(e) = self.files.delete(&key).await {
            tracing::warn!(%key, "Failed to delete stored image: {}", e);
        }
    }
}
