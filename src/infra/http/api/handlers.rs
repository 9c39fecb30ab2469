//! Generic entity handlers.
//!
//! Reads are anonymous and gated by the request digest; writes invalidate the
//! entity's cache tags through the repository.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::pagination::PageRequest;
use crate::application::repository::CachedRepository;
use crate::domain::Entity;
use crate::integrity::{IntegrityPayload, IntegrityVerifier};

use super::error::ApiError;
use super::integrity::require_digest;

const PAGE_INDEX_PARAM: &str = "pageIndex";
const PAGE_SIZE_PARAM: &str = "pageSize";
const DEFAULT_PAGE_INDEX: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;

pub async fn list<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    State(integrity): State<Arc<IntegrityVerifier>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let filters = T::filters_from(&query);
    let payload = filters
        .iter()
        .find_map(|filter| filter.value())
        .map(|value| IntegrityPayload::from_name(value))
        .unwrap_or_else(IntegrityPayload::default_payload);
    require_digest(&integrity, &headers, &payload)?;

    let index = page_param(&query, PAGE_INDEX_PARAM, DEFAULT_PAGE_INDEX)?;
    let size = page_param(&query, PAGE_SIZE_PARAM, DEFAULT_PAGE_SIZE)?;
    let request = PageRequest::new(index, size)?;

    let page = repo.page(request, &filters).await?;
    Ok(Json(page.as_ref()).into_response())
}

pub async fn distinct<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    State(integrity): State<Arc<IntegrityVerifier>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_digest(&integrity, &headers, &IntegrityPayload::default_payload())?;

    let values = repo.distinct().await?;
    Ok(Json(values.as_slice()).into_response())
}

pub async fn find<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    State(integrity): State<Arc<IntegrityVerifier>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    require_digest(&integrity, &headers, &IntegrityPayload::from_id(id))?;

    let record = repo.find(id).await?;
    Ok(Json(record.as_ref()).into_response())
}

pub async fn create<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    Json(record): Json<T>,
) -> Result<impl IntoResponse, ApiError> {
    let created = repo.insert(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    Path(id): Path<i64>,
    Json(record): Json<T>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = repo.update(id, record).await?;
    Ok(Json(updated))
}

pub async fn remove<T: Entity>(
    State(repo): State<CachedRepository<T>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

fn page_param(
    query: &HashMap<String, String>,
    name: &'static str,
    default: i64,
) -> Result<i64, ApiError> {
    match query.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ApiError::bad_request(
                "Invalid page request",
                Some(format!("`{name}` must be an integer")),
            )
        }),
    }
}
