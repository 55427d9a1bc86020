//! # Blog Infrastructure
//!
//! Concrete implementations of the ports defined in `blog-core`.
//! This crate contains the database, file storage and authentication adapters.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM
//!
//! Without `postgres`, only the in-memory repositories are available.

pub mod auth;
pub mod database;
pub mod memory;
pub mod storage;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use database::{DatabaseConfig, DatabaseConnections};
pub use memory::InMemoryDatabase;
pub use storage::{InMemoryFileStore, LocalDiskStore};
