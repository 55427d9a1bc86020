//! In-memory repositories - used when no database is configured, and in tests.
//!
//! All four repositories share one set of tables so that posts can resolve
//! their category and tags the way joins would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use blog_core::domain::{
    Category, NewUser, Page, PageRequest, Post, PostChanges, PostWithRelations, Tag, TagSync, User,
};
use blog_core::error::RepoError;
use blog_core::ports::{
    BaseRepository, CategoryRepository, PostRepository, TagRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    posts: BTreeMap<i64, Post>,
    post_tags: BTreeMap<i64, BTreeSet<i64>>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    users: BTreeMap<i64, User>,
    /// Last id handed out, per table.
    sequences: BTreeMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let last = self.sequences.entry(table).or_insert(0);
        *last += 1;
        *last
    }

    fn with_relations(&self, post: &Post) -> PostWithRelations {
        let mut tags: Vec<Tag> = self
            .post_tags
            .get(&post.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        PostWithRelations {
            post: post.clone(),
            category: post
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
            tags,
        }
    }

    fn sync_tags(&mut self, post_id: i64, target: &BTreeSet<i64>) -> TagSync {
        let current = self.post_tags.entry(post_id).or_default();
        let sync = TagSync::between(current, target);
        sync.apply(current);
        sync
    }
}

/// Shared in-memory tables.
///
/// Note: Data is lost on process restart.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_category(&self, name: &str) -> Category {
        let mut tables = self.tables.write().await;
        let category = Category {
            id: tables.next_id("categories"),
            name: name.to_string(),
        };
        tables.categories.insert(category.id, category.clone());
        category
    }

    pub async fn add_tag(&self, name: &str) -> Tag {
        let mut tables = self.tables.write().await;
        let tag = Tag {
            id: tables.next_id("tags"),
            name: name.to_string(),
        };
        tables.tags.insert(tag.id, tag.clone());
        tag
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository { db: self.clone() }
    }

    pub fn categories(&self) -> InMemoryCategoryRepository {
        InMemoryCategoryRepository { db: self.clone() }
    }

    pub fn tags(&self) -> InMemoryTagRepository {
        InMemoryTagRepository { db: self.clone() }
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository { db: self.clone() }
    }
}

pub struct InMemoryPostRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryCategoryRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryTagRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryUserRepository {
    db: InMemoryDatabase,
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.db.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Post>, RepoError> {
        Ok(self.db.tables.read().await.posts.values().cloned().collect())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_with_relations(&self, id: i64) -> Result<Option<PostWithRelations>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.posts.get(&id).map(|post| tables.with_relations(post)))
    }

    async fn paginate(&self, request: PageRequest) -> Result<Page<PostWithRelations>, RepoError> {
        let tables = self.db.tables.read().await;
        let total = tables.posts.len() as u64;
        if request.is_past_end(total) {
            return Ok(Page::new(Vec::new(), request, total));
        }

        let mut posts: Vec<&Post> = tables.posts.values().collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let items = posts
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.per_page).unwrap_or(usize::MAX))
            .map(|post| tables.with_relations(post))
            .collect();

        Ok(Page::new(items, request, total))
    }

    async fn slug_taken(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except))
    }

    async fn insert(&self, changes: PostChanges, tag_ids: &BTreeSet<i64>) -> Result<Post, RepoError> {
        let mut tables = self.db.tables.write().await;

        if tables.posts.values().any(|p| p.slug == changes.slug) {
            return Err(RepoError::Constraint(format!(
                "slug '{}' already exists",
                changes.slug
            )));
        }

        let now = Utc::now();
        let post = Post {
            id: tables.next_id("posts"),
            title: changes.title,
            slug: changes.slug,
            content: changes.content,
            image: changes.image,
            category_id: changes.category_id,
            created_at: now,
            updated_at: now,
        };

        tables.posts.insert(post.id, post.clone());
        tables.sync_tags(post.id, tag_ids);
        Ok(post)
    }

    async fn update(
        &self,
        id: i64,
        changes: PostChanges,
        tag_ids: &BTreeSet<i64>,
    ) -> Result<Post, RepoError> {
        let mut tables = self.db.tables.write().await;

        if tables
            .posts
            .values()
            .any(|p| p.slug == changes.slug && p.id != id)
        {
            return Err(RepoError::Constraint(format!(
                "slug '{}' already exists",
                changes.slug
            )));
        }

        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.title = changes.title;
        post.slug = changes.slug;
        post.content = changes.content;
        post.image = changes.image;
        post.category_id = changes.category_id;
        post.updated_at = Utc::now();
        let post = post.clone();

        tables.sync_tags(id, tag_ids);
        Ok(post)
    }
}

#[async_trait]
impl BaseRepository<Category, i64> for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepoError> {
        Ok(self.db.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Category>, RepoError> {
        Ok(self
            .db
            .tables
            .read()
            .await
            .categories
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {}

#[async_trait]
impl BaseRepository<Tag, i64> for InMemoryTagRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Tag>, RepoError> {
        Ok(self.db.tables.read().await.tags.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Tag>, RepoError> {
        Ok(self.db.tables.read().await.tags.values().cloned().collect())
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn find_missing(&self, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !tables.tags.contains_key(id))
            .collect())
    }
}

#[async_trait]
impl BaseRepository<User, i64> for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.db.tables.read().await.users.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.db.tables.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.db.tables.write().await;

        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(RepoError::Constraint("Email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id("users"),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}
