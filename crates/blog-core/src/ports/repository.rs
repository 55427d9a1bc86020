use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{
    Category, NewUser, Page, PageRequest, Post, PostChanges, PostWithRelations, Tag, User,
};
use crate::error::RepoError;

/// Generic read access shared by every repository.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Every row of the table.
    async fn find_all(&self) -> Result<Vec<T>, RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, i64> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
}

#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, i64> {}

#[async_trait]
pub trait TagRepository: BaseRepository<Tag, i64> {
    /// Ids from `ids` that do not name an existing tag.
    async fn find_missing(&self, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, RepoError>;
}

/// Post repository.
///
/// `insert` and `update` write the scalar columns and replace the tag
/// associations with exactly `tag_ids` as one atomic step.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i64> {
    /// Load a post with its category and tags.
    async fn find_with_relations(&self, id: i64) -> Result<Option<PostWithRelations>, RepoError>;

    /// Newest first, associations loaded in batch.
    async fn paginate(&self, request: PageRequest) -> Result<Page<PostWithRelations>, RepoError>;

    /// Whether another post already uses `slug`.
    async fn slug_taken(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError>;

    async fn insert(&self, changes: PostChanges, tag_ids: &BTreeSet<i64>) -> Result<Post, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the post does not exist.
    async fn update(
        &self,
        id: i64,
        changes: PostChanges,
        tag_ids: &BTreeSet<i64>,
    ) -> Result<Post, RepoError>;
}
