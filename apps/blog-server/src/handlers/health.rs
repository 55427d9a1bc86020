//! Health check endpoint.

use actix_web::{HttpResponse, web};

use blog_shared::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - returns server status and the storage backend in use.
///
/// GET /health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: state.database_mode().await.to_string(),
    };

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use crate::handlers::configure_routes;
    use crate::test_support::TestContext;

    #[actix_web::test]
    async fn test_reports_in_memory_mode() {
        let ctx = TestContext::new().await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| ctx.state.configure(cfg))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "in-memory");
    }
}
