pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::REQUEST_ID_HEADER;

use axum::{Router, middleware as axum_middleware};

/// The full HTTP surface with request tracing layered on.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state).layer(axum_middleware::from_fn(middleware::trace_requests))
}
