//! Request IDs - one per request, echoed in a header and on error pages.

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use uuid::Uuid;

use crate::middleware::error::{AppError, render_problem};

/// Header name for request ID.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 64;

/// Middleware that tags each request with an ID.
///
/// An ID sent by a proxy is reused when it looks sane. Error pages rendered
/// from an [`AppError`] are stamped with the ID and the request path.
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequestIdService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService { service }))
    }
}

pub struct RequestIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| is_acceptable(id))
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = req.path().to_string();

        tracing::debug!(%request_id, %path, "Request received");

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;

            let problem = res
                .response()
                .error()
                .and_then(|e| e.as_error::<AppError>())
                .and_then(|e| Some((e.status_code(), e.problem()?)));

            let mut res = match problem {
                Some((status, problem)) => {
                    let page = render_problem(
                        status,
                        &problem.with_request_id(&request_id).with_instance(path),
                    );
                    res.into_response(page).map_into_right_body()
                }
                None => res.map_into_left_body(),
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
            }

            Ok(res)
        })
    }
}

fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn missing() -> Result<HttpResponse, AppError> {
        Err(AppError::NotFound("Aucun article à cette adresse.".to_string()))
    }

    async fn fine() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .wrap(RequestIdMiddleware)
                    .route("/missing", web::get().to(missing))
                    .route("/fine", web::get().to(fine)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_generates_id() {
        let app = app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/fine").to_request()).await;

        let id = resp.headers().get(&REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[actix_web::test]
    async fn test_reuses_sane_incoming_id() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/fine")
            .insert_header(("X-Request-ID", "lb-1234"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.headers().get(&REQUEST_ID_HEADER).unwrap(), "lb-1234");
    }

    #[actix_web::test]
    async fn test_replaces_odd_incoming_id() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/fine")
            .insert_header(("X-Request-ID", "<b>hi</b>"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_ne!(resp.headers().get(&REQUEST_ID_HEADER).unwrap(), "<b>hi</b>");
    }

    #[actix_web::test]
    async fn test_error_page_shows_reference() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/missing")
            .insert_header(("X-Request-ID", "trace-42"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("Référence : trace-42"));
        assert!(html.contains("Aucun article à cette adresse."));
    }
}
