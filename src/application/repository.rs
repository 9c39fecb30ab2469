//! Generic cached repository.
//!
//! One tag-parameterized decorator over the query executor serves every
//! entity. Reads go through the read-through cache; writes run the mutation
//! first and drop the entity's tags as soon as the executor reports success.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::application::executor::{ExecutorError, NEW_ID, QueryExecutor, QueryParams, Row};
use crate::application::pagination::PageRequest;
use crate::cache::{CacheService, CompositePage, KeyPart, PageRows, SentinelFilter};
use crate::domain::error::DomainError;
use crate::domain::{Entity, Operation};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("`{entity}` row could not be decoded: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{entity}` with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("`{entity}` does not support `{operation}`")]
    Unsupported {
        entity: &'static str,
        operation: &'static str,
    },
}

impl RepositoryError {
    fn decode<T: Entity>(source: serde_json::Error) -> Self {
        Self::Decode {
            entity: T::NAME,
            source,
        }
    }

    fn not_found<T: Entity>(id: i64) -> Self {
        Self::NotFound {
            entity: T::NAME,
            id,
        }
    }
}

pub struct CachedRepository<T: Entity> {
    executor: Arc<dyn QueryExecutor>,
    cache: CacheService,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for CachedRepository<T> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            cache: self.cache.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> CachedRepository<T> {
    pub fn new(executor: Arc<dyn QueryExecutor>, cache: CacheService) -> Self {
        Self {
            executor,
            cache,
            _entity: PhantomData,
        }
    }

    /// One page of the entity list. `filters` follow `T::FILTERS` order.
    #[instrument(
        skip(self, filters),
        fields(entity = T::NAME, page = request.index(), size = request.size())
    )]
    pub async fn page(
        &self,
        request: PageRequest,
        filters: &[SentinelFilter],
    ) -> Result<Arc<CompositePage<T>>, RepositoryError> {
        let parts: Vec<&dyn KeyPart> = filters.iter().map(|f| f as &dyn KeyPart).collect();
        self.cache
            .queries()
            .get_or_compute(&T::LIST_TAG, request.window(), &parts, || async {
                let mut params = QueryParams::new()
                    .with("PageIndex", request.index())
                    .with("PageSize", request.size());
                for filter in filters {
                    params.push(filter.name(), filter.raw());
                }

                let rows = self
                    .executor
                    .query(&T::operation(Operation::GetPaged), &mut params)
                    .await?;
                let total = params.total_records().unwrap_or(rows.len() as u64);
                let items = decode_rows::<T>(rows)?;
                Ok::<_, RepositoryError>(PageRows::new(total, items))
            })
            .await
    }

    /// Distinct values of the entity's distinct column.
    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn distinct(&self) -> Result<Arc<Vec<String>>, RepositoryError> {
        let spec = T::DISTINCT.ok_or(RepositoryError::Unsupported {
            entity: T::NAME,
            operation: Operation::GetDistinct.suffix(),
        })?;
        let column = spec.column;

        self.cache
            .queries()
            .get_or_compute_list(&spec.tag, || async {
                let mut params = QueryParams::new();
                let rows = self
                    .executor
                    .query(&T::operation(Operation::GetDistinct), &mut params)
                    .await?;
                rows.into_iter()
                    .map(|mut row| {
                        let value = row.remove(column).unwrap_or(Value::Null);
                        serde_json::from_value::<String>(value)
                            .map_err(RepositoryError::decode::<T>)
                    })
                    .collect::<Result<Vec<String>, RepositoryError>>()
            })
            .await
    }

    /// A single record, cached under the list tag.
    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn find(&self, id: i64) -> Result<Arc<T>, RepositoryError> {
        let ttl = self.cache.config().expiration;
        let parts: [&dyn KeyPart; 2] = [&"Id", &id];
        self.cache
            .queries()
            .get_or_compute_value(&T::LIST_TAG, &parts, ttl, || async {
                let mut params = QueryParams::new().with("Id", id);
                let rows = self
                    .executor
                    .query(&T::operation(Operation::GetById), &mut params)
                    .await?;
                let row = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| RepositoryError::not_found::<T>(id))?;
                decode_row::<T>(row)
            })
            .await
    }

    #[instrument(skip(self, record), fields(entity = T::NAME))]
    pub async fn insert(&self, record: T) -> Result<T, RepositoryError> {
        record.validate()?;
        let mut params = record_params(&record)?;
        self.executor
            .execute(&T::operation(Operation::Insert), &mut params)
            .await?;
        // The row exists from here on, whether or not the new id decodes.
        self.invalidate();

        let id = params
            .output(NEW_ID)
            .and_then(Value::as_i64)
            .ok_or_else(|| ExecutorError::missing(NEW_ID))?;
        Ok(record.with_id(id))
    }

    #[instrument(skip(self, record), fields(entity = T::NAME))]
    pub async fn update(&self, id: i64, record: T) -> Result<T, RepositoryError> {
        let record = record.with_id(id);
        record.validate()?;
        let mut params = record_params(&record)?;
        params.push("Id", id);
        let affected = self
            .executor
            .execute(&T::operation(Operation::Update), &mut params)
            .await?;
        if affected == 0 {
            return Err(RepositoryError::not_found::<T>(id));
        }

        self.invalidate();
        Ok(record)
    }

    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut params = QueryParams::new().with("Id", id);
        let affected = self
            .executor
            .execute(&T::operation(Operation::Delete), &mut params)
            .await?;
        if affected == 0 {
            return Err(RepositoryError::not_found::<T>(id));
        }

        self.invalidate();
        Ok(())
    }

    /// Drop every cached list of this entity.
    pub fn invalidate(&self) {
        let tags = T::tags();
        let dropped = self.cache.invalidator().invalidate_all(&tags);
        info!(entity = T::NAME, tags = tags.len(), dropped, "Write invalidated entity cache");
    }
}

fn decode_row<T: Entity>(row: Row) -> Result<T, RepositoryError> {
    serde_json::from_value(Value::Object(row)).map_err(RepositoryError::decode::<T>)
}

fn decode_rows<T: Entity>(rows: Vec<Row>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(decode_row::<T>).collect()
}

fn record_params<T: Entity>(record: &T) -> Result<QueryParams, RepositoryError> {
    let value = serde_json::to_value(record).map_err(RepositoryError::decode::<T>)?;
    let Value::Object(fields) = value else {
        return Err(RepositoryError::Invalid(DomainError::validation(
            T::NAME,
            "record must serialize to an object",
        )));
    };
    let mut params = QueryParams::new();
    for (name, value) in fields {
        params.push(name, value);
    }
    Ok(params)
}
