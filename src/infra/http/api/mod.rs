pub mod error;
pub mod handlers;
pub mod integrity;
pub mod state;

pub use state::ApiState;

use axum::extract::FromRef;
use axum::{Router, routing::get};

use crate::application::repository::CachedRepository;
use crate::domain::{Category, Entity, Personnel};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .merge(entity_routes::<Category>())
        .merge(entity_routes::<Personnel>())
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// List, distinct, by-id and write routes under `/api/v1/{T::ROUTE}`.
fn entity_routes<T: Entity>() -> Router<ApiState>
where
    CachedRepository<T>: FromRef<ApiState>,
{
    let base = format!("/api/v1/{}", T::ROUTE);
    Router::new()
        .route(&base, get(handlers::list::<T>).post(handlers::create::<T>))
        .route(&format!("{base}/distinct"), get(handlers::distinct::<T>))
        .route(
            &format!("{base}/{{id}}"),
            get(handlers::find::<T>)
                .put(handlers::update::<T>)
                .delete(handlers::remove::<T>),
        )
}
