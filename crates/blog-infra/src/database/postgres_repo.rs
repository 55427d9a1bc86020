//! PostgreSQL repository implementations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, LoaderTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use blog_core::domain::{
    NewUser, Page, PageRequest, Post, PostChanges, PostWithRelations, Tag, TagSync, User,
    mask_email,
};
use blog_core::error::RepoError;
use blog_core::ports::{CategoryRepository, PostRepository, TagRepository, UserRepository};

use super::entity::category::Entity as CategoryEntity;
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<CategoryEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let now = Utc::now().fixed_offset();

        let model = user::ActiveModel {
            id: NotSet,
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;

        tracing::info!(user_id = model.id, user_email = %mask_email(&model.email), "User created");
        Ok(model.into())
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_missing(&self, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, RepoError> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let found: BTreeSet<i64> = TagEntity::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|t| t.id)
            .collect();

        Ok(ids.difference(&found).copied().collect())
    }
}

impl PostgresPostRepository {
    /// Attach categories and tags with one query per association, not per post.
    async fn attach_relations(
        &self,
        posts: Vec<post::Model>,
    ) -> Result<Vec<PostWithRelations>, RepoError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let categories = posts
            .load_one(CategoryEntity, &self.db)
            .await
            .map_err(map_db_err)?;
        let tags = posts
            .load_many_to_many(TagEntity, PostTagEntity, &self.db)
            .await
            .map_err(map_db_err)?;

        Ok(posts
            .into_iter()
            .zip(categories)
            .zip(tags)
            .map(|((post, category), tags)| {
                let mut tags: Vec<Tag> = tags.into_iter().map(Into::into).collect();
                tags.sort_by(|a, b| a.name.cmp(&b.name));
                PostWithRelations {
                    post: post.into(),
                    category: category.map(Into::into),
                    tags,
                }
            })
            .collect())
    }
}

/// Replace the tag associations of `post_id` with exactly `target`.
async fn sync_tags<C>(conn: &C, post_id: i64, target: &BTreeSet<i64>) -> Result<TagSync, DbErr>
where
    C: ConnectionTrait,
{
    let current: BTreeSet<i64> = PostTagEntity::find()
        .filter(post_tag::Column::PostId.eq(post_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.tag_id)
        .collect();

    let sync = TagSync::between(&current, target);
    if sync.is_noop() {
        return Ok(sync);
    }

    if !sync.to_remove.is_empty() {
        PostTagEntity::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .filter(post_tag::Column::TagId.is_in(sync.to_remove.iter().copied()))
            .exec(conn)
            .await?;
    }

    if !sync.to_add.is_empty() {
        let rows = sync.to_add.iter().map(|&tag_id| post_tag::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag_id),
        });
        PostTagEntity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(sync)
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_with_relations(&self, id: i64) -> Result<Option<PostWithRelations>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(self.attach_relations(vec![model]).await?.pop())
    }

    async fn paginate(&self, request: PageRequest) -> Result<Page<PostWithRelations>, RepoError> {
        let paginator = PostEntity::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, request.per_page);

        let totals = paginator.num_items_and_pages().await.map_err(map_db_err)?;
        if request.is_past_end(totals.number_of_items) {
            return Ok(Page::new(Vec::new(), request, totals.number_of_items));
        }

        let models = paginator
            .fetch_page(request.index())
            .await
            .map_err(map_db_err)?;

        let items = self.attach_relations(models).await?;
        Ok(Page::new(items, request, totals.number_of_items))
    }

    async fn slug_taken(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let mut query = PostEntity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(post::Column::Id.ne(id));
        }

        let count = query.count(&self.db).await.map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn insert(&self, changes: PostChanges, tag_ids: &BTreeSet<i64>) -> Result<Post, RepoError> {
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let model = post::ActiveModel {
            id: NotSet,
            title: Set(changes.title),
            slug: Set(changes.slug),
            content: Set(changes.content),
            image: Set(changes.image),
            category_id: Set(changes.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;

        let sync = sync_tags(&txn, model.id, tag_ids)
            .await
            .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(post_id = model.id, added = sync.to_add.len(), "Post inserted");
        Ok(model.into())
    }

    async fn update(
        &self,
        id: i64,
        changes: PostChanges,
        tag_ids: &BTreeSet<i64>,
    ) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let existing = PostEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        let mut active: post::ActiveModel = existing.into();
        active.title = Set(changes.title);
        active.slug = Set(changes.slug);
        active.content = Set(changes.content);
        active.image = Set(changes.image);
        active.category_id = Set(changes.category_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&txn).await.map_err(map_db_err)?;

        let sync = sync_tags(&txn, id, tag_ids).await.map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(
            post_id = id,
            added = sync.to_add.len(),
            removed = sync.to_remove.len(),
            "Post updated"
        );
        Ok(model.into())
    }
}
