//! Observability - request IDs on top of the tracing logger.

mod request_id;

pub use request_id::RequestIdMiddleware;
