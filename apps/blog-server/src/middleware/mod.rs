//! Middleware, extractors and the error-to-response mapping.

pub mod auth;
pub mod error;
pub mod flash;
