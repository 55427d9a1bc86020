//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod repository;
mod storage;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use repository::{
    BaseRepository, CategoryRepository, PostRepository, TagRepository, UserRepository,
};
pub use storage::{FileStore, IMAGE_NAMESPACE, StorageError};
