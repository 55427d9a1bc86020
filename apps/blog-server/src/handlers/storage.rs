//! Serves uploaded images.

use actix_web::{HttpResponse, http::header, web};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /storage/{key}
pub async fn serve(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let key = path.into_inner();

    let bytes = state
        .files
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No stored file at {}", key)))?;

    let content_type = mime_guess::from_path(&key).first_or_octet_stream();

    Ok(HttpResponse::Ok()
        .content_type(content_type.essence_str())
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
