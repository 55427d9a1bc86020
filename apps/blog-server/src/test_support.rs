//! Shared fixtures for handler tests.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test;

use blog_core::domain::{ImageUpload, Post, PostInput, UploadedFile};
use blog_infra::{InMemoryDatabase, InMemoryFileStore, JwtConfig};

use crate::config::{AdminAccount, AppConfig, SessionConfig, StorageConfig};
use crate::middleware::auth::session_cookie;
use crate::state::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

const BOUNDARY: &str = "----blog-test-boundary";

pub fn config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: None,
        run_migrations: false,
        storage: StorageConfig::default(),
        session: SessionConfig::default(),
        jwt: JwtConfig::default(),
        admin: None,
    }
}

/// In-memory app state with two categories, three tags and one author.
///
/// Categories: 1 `Actualités`, 2 `Tutoriels`. Tags: 1 `rust`, 2 `web`, 3 `sql`.
pub struct TestContext {
    pub db: InMemoryDatabase,
    pub files: Arc<InMemoryFileStore>,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = InMemoryDatabase::new();
        for name in ["Actualités", "Tutoriels"] {
            db.add_category(name).await;
        }
        for name in ["rust", "web", "sql"] {
            db.add_tag(name).await;
        }

        let files = Arc::new(InMemoryFileStore::new());
        let state = AppState::in_memory(&db, files.clone(), &config());
        state
            .bootstrap_admin(&AdminAccount {
                name: "Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            })
            .await
            .unwrap();

        Self { db, files, state }
    }

    /// Session cookie for the bootstrapped author.
    pub fn session_cookie(&self) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(1, "Admin", ADMIN_EMAIL)
            .unwrap();
        session_cookie(&self.state.session, &token, 3600)
    }

    /// A post in category 1 with an image.
    pub async fn seed_post(&self, slug: &str, tags: &[i64]) -> Post {
        self.state
            .posts
            .create(PostInput {
                title: "Premier article".to_string(),
                slug: slug.to_string(),
                content: "Bonjour tout le monde".to_string(),
                category_id: Some(1),
                tag_ids: tags.iter().copied().collect(),
                image: Some(ImageUpload::Received(UploadedFile {
                    file_name: "seed.png".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: b"seed".to_vec(),
                })),
            })
            .await
            .unwrap()
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn read_body<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

/// One part of a multipart body.
pub struct Part<'a> {
    name: &'a str,
    file: Option<(&'a str, &'a str)>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file: Some((file_name, content_type)),
            data,
        }
    }
}

/// Encode `parts` as `multipart/form-data`; returns the content type and body.
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        part.name, file_name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
