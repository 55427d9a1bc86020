//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use blog_infra::{DatabaseConfig, JwtConfig};

/// Default upload limit for post images (2 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub run_migrations: bool,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub jwt: JwtConfig,
    pub admin: Option<AdminAccount>,
}

/// Where uploaded images live and the URL prefix they are served under.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_url: String,
    pub max_image_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/app/public"),
            public_url: "/storage".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "blog_session".to_string(),
            secure: false,
        }
    }
}

/// Account created at startup when missing.
#[derive(Clone)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(20),
            min_connections: parse_var("DB_MIN_CONNECTIONS").unwrap_or(2),
        });

        let defaults = StorageConfig::default();
        let storage = StorageConfig {
            root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            public_url: env::var("STORAGE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            max_image_bytes: parse_var("MAX_IMAGE_BYTES").unwrap_or(defaults.max_image_bytes),
        };

        let session = SessionConfig {
            cookie_name: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| SessionConfig::default().cookie_name),
            secure: flag("SESSION_COOKIE_SECURE"),
        };

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminAccount {
                    name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            run_migrations: flag("RUN_MIGRATIONS"),
            storage,
            session,
            jwt: JwtConfig::from_env(),
            admin,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
