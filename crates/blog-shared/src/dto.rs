//! Data Transfer Objects - form and query payloads.

use serde::{Deserialize, Serialize};

/// Login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Query string of the post listing.
///
/// `page` is kept as text so that garbage such as `?page=abc` falls back to
/// the first page instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

impl ListQuery {
    /// Requested page number, 1-based. Missing, zero or unparsable -> `None`.
    pub fn page_number(&self) -> Option<u64> {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|&page| page > 0)
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(str::to_string),
        }
    }

    #[test]
    fn test_page_number() {
        assert_eq!(query(Some("3")).page_number(), Some(3));
        assert_eq!(query(Some(" 2 ")).page_number(), Some(2));
        assert_eq!(query(Some("0")).page_number(), None);
        assert_eq!(query(Some("-1")).page_number(), None);
        assert_eq!(query(Some("abc")).page_number(), None);
        assert_eq!(query(None).page_number(), None);
    }

    #[test]
    fn test_login_request_defaults_missing_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(req.email, "a@b.c");
        assert!(req.password.is_empty());
    }
}
