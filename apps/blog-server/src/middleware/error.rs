//! Error handling - RFC 7807 problem details rendered as HTML pages.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use minijinja::context;
use std::fmt;

use blog_core::error::{DomainError, RepoError};
use blog_core::ports::StorageError;
use blog_shared::ErrorResponse;

use crate::templates::{self, Layout};

/// Application-level error type rendered through `error.html`.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    /// No valid session; answered with a redirect to the login page.
    Unauthorized,
    Conflict(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Problem details for the error page; `None` when the answer is a redirect.
    pub fn problem(&self) -> Option<ErrorResponse> {
        let problem = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized => return None,
            AppError::Conflict(detail) => ErrorResponse::new(409, "Conflit").with_detail(detail),
            // Internal details stay in the logs.
            AppError::Internal(_) => ErrorResponse::internal_error(),
        };
        Some(problem)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::SEE_OTHER,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = self {
            tracing::error!("Internal error: {}", detail);
        }

        match self.problem() {
            Some(problem) => render_problem(self.status_code(), &problem),
            None => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
        }
    }
}

/// Render `error.html`, falling back to plain text if the template fails.
pub fn render_problem(status: StatusCode, problem: &ErrorResponse) -> HttpResponse {
    let ctx = context! { layout => Layout::default(), error => problem };

    match templates::render("error.html", ctx) {
        Ok(html) => HttpResponse::build(status)
            .content_type(header::ContentType::html())
            .body(html),
        Err(e) => {
            tracing::error!("Failed to render error template: {}", e);
            HttpResponse::build(status)
                .content_type(header::ContentType::plaintext())
                .body(format!("{} {}", problem.status, problem.title))
        }
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
            DomainError::Validation(errors) => AppError::BadRequest(errors.to_string()),
            DomainError::Storage(msg) => AppError::Internal(format!("Storage error: {}", msg)),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Conflict(msg),
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => AppError::NotFound(format!("No stored file at {}", key)),
            StorageError::Io(msg) => AppError::Internal(format!("Storage error: {}", msg)),
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Internal(format!("Template error: {:#}", err))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_not_found_renders_page() {
        let err = AppError::from(DomainError::NotFound {
            entity_type: "Post",
            id: 9,
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Page introuvable"));
        assert!(html.contains("Post with id 9 not found"));
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.error_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[test]
    fn test_internal_detail_is_not_shown() {
        let problem = AppError::Internal("pool exhausted".to_string()).problem().unwrap();
        assert_eq!(problem.status, 500);
        assert!(problem.detail.is_none());
        assert!(AppError::Unauthorized.problem().is_none());
    }

    #[test]
    fn test_database_errors_are_hidden() {
        let err = AppError::from(RepoError::Query("syntax error at or near".to_string()));
        assert!(matches!(err, AppError::Internal(ref msg) if msg == "Database error"));
    }
}
