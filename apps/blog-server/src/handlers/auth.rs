//! Login and logout.

use actix_web::{HttpResponse, http::StatusCode, http::header, web};
use minijinja::context;

use blog_core::FieldErrors;
use blog_core::domain::mask_email;
use blog_shared::LoginRequest;

use crate::middleware::auth::{Identity, OptionalIdentity, logout_cookie, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::middleware::flash::Flash;
use crate::state::AppState;
use crate::templates::{self, Layout};

/// GET /login
pub async fn login_form(identity: OptionalIdentity, flash: Flash) -> AppResult<HttpResponse> {
    if identity.0.is_some() {
        return Ok(redirect("/posts"));
    }

    render_login(
        StatusCode::OK,
        &Layout::new(&identity, &flash).section("auth"),
        "",
        &FieldErrors::new(),
    )
}

/// POST /login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let email = req.email.trim();
    let layout = Layout::default().section("auth");

    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.add("email", "Le champ email est obligatoire.");
    }
    if req.password.is_empty() {
        errors.add("password", "Le champ mot de passe est obligatoire.");
    }
    if !errors.is_empty() {
        return render_login(StatusCode::UNPROCESSABLE_ENTITY, &layout, email, &errors);
    }

    // Find user by email
    let user = match state.users.find_by_email(email).await? {
        Some(user) => user,
        None => {
            tracing::info!(user_email = %mask_email(email), "Login for unknown email");
            return rejected(&layout, email);
        }
    };

    // Verify password
    let valid = state
        .passwords
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        tracing::info!(user_id = user.id, "Login with wrong password");
        return rejected(&layout, email);
    }

    let token = state
        .tokens
        .generate_token(user.id, &user.name, &user.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "Session started");

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/posts"))
        .cookie(session_cookie(
            &state.session,
            &token,
            state.tokens.expiration_seconds(),
        ))
        .finish())
}

/// DELETE|POST /logout
pub async fn logout(state: web::Data<AppState>, identity: Identity) -> HttpResponse {
    tracing::info!(user_id = identity.user_id, "Session ended");

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .cookie(logout_cookie(&state.session))
        .finish()
}

fn rejected(layout: &Layout, email: &str) -> AppResult<HttpResponse> {
    let mut errors = FieldErrors::new();
    errors.add("email", "Identifiants incorrects.");
    render_login(StatusCode::UNPROCESSABLE_ENTITY, layout, email, &errors)
}

fn render_login(
    status: StatusCode,
    layout: &Layout,
    email: &str,
    errors: &FieldErrors,
) -> AppResult<HttpResponse> {
    templates::page(
        status,
        "auth/login.html",
        layout,
        context! { email, errors },
    )
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
