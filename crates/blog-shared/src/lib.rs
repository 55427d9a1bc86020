//! # Blog Shared
//!
//! Types exchanged with the browser: form payloads, query strings and the
//! problem-details body error pages are rendered from.

pub mod dto;
pub mod response;

pub use dto::{HealthResponse, ListQuery, LoginRequest};
pub use response::ErrorResponse;
