use std::sync::Arc;

use axum::extract::FromRef;

use crate::application::executor::QueryExecutor;
use crate::application::repository::CachedRepository;
use crate::cache::CacheService;
use crate::domain::{Category, Personnel};
use crate::integrity::IntegrityVerifier;

#[derive(Clone)]
pub struct ApiState {
    pub categories: CachedRepository<Category>,
    pub personnel: CachedRepository<Personnel>,
    pub integrity: Arc<IntegrityVerifier>,
    pub cache: CacheService,
}

impl ApiState {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        cache: CacheService,
        integrity: IntegrityVerifier,
    ) -> Self {
        Self {
            categories: CachedRepository::new(Arc::clone(&executor), cache.clone()),
            personnel: CachedRepository::new(executor, cache.clone()),
            integrity: Arc::new(integrity),
            cache,
        }
    }
}

impl FromRef<ApiState> for CachedRepository<Category> {
    fn from_ref(state: &ApiState) -> Self {
        state.categories.clone()
    }
}

impl FromRef<ApiState> for CachedRepository<Personnel> {
    fn from_ref(state: &ApiState) -> Self {
        state.personnel.clone()
    }
}

impl FromRef<ApiState> for Arc<IntegrityVerifier> {
    fn from_ref(state: &ApiState) -> Self {
        Arc::clone(&state.integrity)
    }
}
