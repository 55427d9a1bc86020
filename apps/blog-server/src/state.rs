//! Application state - shared across all handlers.

use std::sync::Arc;

use actix_web::web;

use blog_core::PostService;
use blog_core::domain::{NewUser, mask_email};
use blog_core::ports::{
    CategoryRepository, FileStore, PasswordService, PostRepository, TagRepository, TokenService,
    UserRepository,
};
use blog_infra::{
    Argon2PasswordService, DatabaseConnections, InMemoryDatabase, InMemoryFileStore,
    JwtTokenService, LocalDiskStore,
};

use crate::config::{AdminAccount, AppConfig, SessionConfig, StorageConfig};
use crate::middleware::error::{AppError, AppResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileStore>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub session: SessionConfig,
    pub max_image_bytes: usize,
    pub db: Option<Arc<DatabaseConnections>>,
}

/// The four repositories, all backed by the same store.
struct Repositories {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    users: Arc<dyn UserRepository>,
}

impl Repositories {
    fn in_memory(db: &InMemoryDatabase) -> Self {
        Self {
            posts: Arc::new(db.posts()),
            categories: Arc::new(db.categories()),
            tags: Arc::new(db.tags()),
            users: Arc::new(db.users()),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections) -> Self {
        use blog_infra::database::{
            PostgresCategoryRepository, PostgresPostRepository, PostgresTagRepository,
            PostgresUserRepository,
        };

        let conn = connections.main.clone();
        Self {
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(conn.clone())),
            tags: Arc::new(PostgresTagRepository::new(conn.clone())),
            users: Arc::new(PostgresUserRepository::new(conn)),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let files = build_file_store(&config.storage).await;

        #[cfg(feature = "postgres")]
        let (db, repos) = match &config.database {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => {
                    if config.run_migrations {
                        use migration::MigratorTrait;

                        tracing::info!("Running database migrations...");
                        migration::Migrator::up(&connections.main, None).await?;
                    }
                    let repos = Repositories::postgres(&connections);
                    (Some(Arc::new(connections)), repos)
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    (None, Repositories::in_memory(&demo_database().await))
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (None, Repositories::in_memory(&demo_database().await))
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (db, repos) = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            (None, Repositories::in_memory(&demo_database().await))
        };

        let state = Self::assemble(repos, files, config, db);
        tracing::info!("Application state initialized");
        Ok(state)
    }

    /// State over in-memory repositories sharing `db`.
    pub fn in_memory(db: &InMemoryDatabase, files: Arc<dyn FileStore>, config: &AppConfig) -> Self {
        Self::assemble(Repositories::in_memory(db), files, config, None)
    }

    fn assemble(
        repos: Repositories,
        files: Arc<dyn FileStore>,
        config: &AppConfig,
        db: Option<Arc<DatabaseConnections>>,
    ) -> Self {
        let posts = PostService::new(
            repos.posts,
            repos.categories.clone(),
            repos.tags.clone(),
            files.clone(),
        );

        Self {
            posts,
            categories: repos.categories,
            tags: repos.tags,
            users: repos.users,
            files,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::default()),
            session: config.session.clone(),
            max_image_bytes: config.storage.max_image_bytes,
            db,
        }
    }

    /// Register the state and the services extractors look up by type.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .app_data(web::Data::new(self.tokens.clone()))
            .app_data(web::Data::new(self.passwords.clone()))
            .app_data(web::Data::new(self.session.clone()));
    }

    /// Make sure the configured account exists.
    pub async fn bootstrap_admin(&self, account: &AdminAccount) -> AppResult<()> {
        if self.users.find_by_email(&account.email).await?.is_some() {
            tracing::debug!(user_email = %mask_email(&account.email), "Admin account present");
            return Ok(());
        }

        let password_hash = self
            .passwords
            .hash(&account.password)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let user = self
            .users
            .create(NewUser {
                name: account.name.clone(),
                email: account.email.clone(),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, user_email = %mask_email(&user.email), "Admin account created");
        Ok(())
    }

    /// Label shown by the health endpoint.
    pub async fn database_mode(&self) -> &'static str {
        match &self.db {
            Some(db) if db.is_healthy().await => "postgres",
            Some(_) => "unavailable",
            None => "in-memory",
        }
    }
}

/// In-memory store seeded with the same taxonomy the seed migration inserts.
async fn demo_database() -> InMemoryDatabase {
    let db = InMemoryDatabase::new();
    for name in ["Actualités", "Tutoriels", "Divers"] {
        db.add_category(name).await;
    }
    for name in ["rust", "web", "base de données", "sécurité"] {
        db.add_tag(name).await;
    }
    db
}

async fn build_file_store(config: &StorageConfig) -> Arc<dyn FileStore> {
    match tokio::fs::create_dir_all(&config.root).await {
        Ok(()) => {
            tracing::info!(root = %config.root.display(), "Storing uploads on disk");
            Arc::new(LocalDiskStore::new(&config.root, &config.public_url))
        }
        Err(e) => {
            tracing::error!(
                root = %config.root.display(),
                "Storage root not writable: {}. Uploads will be kept in memory.",
                e
            );
            Arc::new(InMemoryFileStore::new())
        }
    }
}
