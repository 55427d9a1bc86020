//! Session cookie and authentication extractors.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::header, web};
use std::future::{Ready, ready};
use std::sync::Arc;

use blog_core::ports::{AuthError, TokenClaims, TokenService};

use crate::config::SessionConfig;

/// Authenticated author extracted from the session cookie.
///
/// Use this in handlers to require a session:
/// ```ignore
/// async fn create(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(config: &SessionConfig, token: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), token.to_string())
        .path("/")
        .secure(config.secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookie that ends the session.
pub fn logout_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), "")
        .path("/")
        .secure(config.secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0))
        .finish()
}

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError {
    error: AuthError,
    session: SessionConfig,
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::SeeOther();
        response.insert_header((header::LOCATION, "/login"));

        // A stale or forged cookie is dropped so the browser stops sending it.
        if matches!(
            self.error,
            AuthError::TokenExpired | AuthError::InvalidToken(_)
        ) {
            response.cookie(logout_cookie(&self.session));
        }

        response.finish()
    }
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthenticationError> {
    let session = req
        .app_data::<web::Data<SessionConfig>>()
        .map(|config| config.get_ref().clone())
        .unwrap_or_default();

    let fail = |error: AuthError| AuthenticationError {
        error,
        session: session.clone(),
    };

    // Get token service from app data
    let Some(token_service) = req.app_data::<web::Data<Arc<dyn TokenService>>>() else {
        tracing::error!("TokenService not found in app data");
        return Err(fail(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        )));
    };

    let Some(cookie) = req.cookie(&session.cookie_name) else {
        return Err(fail(AuthError::MissingAuth));
    };

    match token_service.validate_token(cookie.value()) {
        Ok(claims) => Ok(Identity::from(claims)),
        Err(e) => {
            tracing::debug!("Rejected session cookie: {}", e);
            Err(fail(e))
        }
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}
