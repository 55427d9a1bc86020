//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;
mod storage;

use actix_web::{HttpResponse, http::header, web};

use crate::middleware::error::{AppError, AppResult};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/health", web::get().to(health::health_check))
        // Posts; numeric segments keep /posts/create away from the show route
        .service(
            web::scope("/posts")
                .route("", web::get().to(posts::index))
                .route("", web::post().to(posts::store))
                .route("/create", web::get().to(posts::create))
                .route("/{id:\\d+}/edit", web::get().to(posts::edit))
                .route("/{id:\\d+}", web::put().to(posts::update))
                .route("/{id:\\d+}", web::patch().to(posts::update))
                .route("/{id:\\d+}", web::post().to(posts::update))
                .route("/{slug}/{id:\\d+}", web::get().to(posts::show)),
        )
        // Session
        .route("/login", web::get().to(auth::login_form))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::delete().to(auth::logout))
        .route("/logout", web::post().to(auth::logout))
        // Uploaded files
        .route("/storage/{key:.*}", web::get().to(storage::serve))
        .default_service(web::to(not_found));
}

/// GET /
async fn home() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/posts"))
        .finish()
}

async fn not_found() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("Aucune page à cette adresse.".to_string()))
}
