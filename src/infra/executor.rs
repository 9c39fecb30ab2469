//! In-memory query executor.
//!
//! Serves the named entity operations from process memory so the service
//! and its tests run without a database. Rows are kept ordered by id.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::executor::{
    ExecutorError, NEW_ID, QueryExecutor, QueryParams, Row, TOTAL_RECORDS,
};
use crate::domain::{Entity, FilterField, Operation};

const ID_PARAM: &str = "Id";
const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, Copy)]
struct TableSpec {
    filters: &'static [FilterField],
    distinct_column: Option<&'static str>,
}

/// Rows of one entity, ordered by id.
#[derive(Debug)]
struct Table {
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

pub struct MemoryExecutor {
    specs: HashMap<&'static str, TableSpec>,
    tables: RwLock<HashMap<&'static str, Table>>,
    queries: AtomicUsize,
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
            tables: RwLock::new(HashMap::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Serve the operations of entity `T`.
    pub fn with_entity<T: Entity>(mut self) -> Self {
        self.specs.insert(
            T::NAME,
            TableSpec {
                filters: T::FILTERS,
                distinct_column: T::DISTINCT.map(|distinct| distinct.column),
            },
        );
        self
    }

    /// Store `records` as-is, keeping their ids.
    pub async fn seed<T: Entity>(
        &self,
        records: impl IntoIterator<Item = T>,
    ) -> Result<(), ExecutorError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::NAME).or_default();
        for record in records {
            let id = record.id();
            let row = match serde_json::to_value(&record) {
                Ok(Value::Object(row)) => row,
                Ok(_) => return Err(ExecutorError::invalid(T::NAME, "record is not an object")),
                Err(err) => return Err(ExecutorError::invalid(T::NAME, err.to_string())),
            };
            table.rows.insert(id, row);
            table.next_id = table.next_id.max(id + 1);
        }
        Ok(())
    }

    /// Number of read operations served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn resolve(&self, operation: &str) -> Result<(&'static str, TableSpec, Operation), ExecutorError> {
        let unknown = || ExecutorError::unknown_operation(operation);
        let (entity, suffix) = operation.split_once('_').ok_or_else(unknown)?;
        let (&name, &spec) = self.specs.get_key_value(entity).ok_or_else(unknown)?;
        let op = match suffix {
            "GetPaged" => Operation::GetPaged,
            "GetDistinct" => Operation::GetDistinct,
            "GetById" => Operation::GetById,
            "Insert" => Operation::Insert,
            "Update" => Operation::Update,
            "Delete" => Operation::Delete,
            _ => return Err(unknown()),
        };
        Ok((name, spec, op))
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn query(
        &self,
        operation: &str,
        params: &mut QueryParams,
    ) -> Result<Vec<Row>, ExecutorError> {
        let (name, spec, op) = self.resolve(operation)?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        debug!(executor = "memory", operation, "query");

        let tables = self.tables.read().await;
        let empty = BTreeMap::new();
        let table = tables.get(name).map_or(&empty, |table| &table.rows);

        match op {
            Operation::GetPaged => {
                let index = int_param(params, "PageIndex")?;
                let size = int_param(params, "PageSize")?;
                if index < 1 || size < 1 {
                    return Err(ExecutorError::invalid("PageIndex", "page must be positive"));
                }

                let matched: Vec<&Row> = table
                    .values()
                    .filter(|row| matches_filters(row, spec.filters, params))
                    .collect();
                params.set_output(TOTAL_RECORDS, matched.len() as u64);

                let skip = usize::try_from((index - 1).saturating_mul(size)).unwrap_or(usize::MAX);
                let take = usize::try_from(size).unwrap_or(usize::MAX);
                Ok(matched.into_iter().skip(skip).take(take).cloned().collect())
            }
            Operation::GetDistinct => {
                let column = spec
                    .distinct_column
                    .ok_or_else(|| ExecutorError::unknown_operation(operation))?;
                let values: BTreeSet<&str> = table
                    .values()
                    .filter_map(|row| row.get(column).and_then(Value::as_str))
                    .collect();
                Ok(values
                    .into_iter()
                    .map(|value| {
                        let mut row = Row::new();
                        row.insert(column.to_string(), Value::from(value));
                        row
                    })
                    .collect())
            }
            Operation::GetById => {
                let id = int_param(params, ID_PARAM)?;
                Ok(table.get(&id).cloned().into_iter().collect())
            }
            Operation::Insert | Operation::Update | Operation::Delete => {
                Err(ExecutorError::invalid(operation, "write operations use execute"))
            }
        }
    }

    async fn execute(
        &self,
        operation: &str,
        params: &mut QueryParams,
    ) -> Result<u64, ExecutorError> {
        let (name, _, op) = self.resolve(operation)?;
        debug!(executor = "memory", operation, "execute");

        let mut tables = self.tables.write().await;
        let table = tables.entry(name).or_default();

        match op {
            Operation::Insert => {
                let id = table.next_id;
                table.next_id += 1;
                table.rows.insert(id, row_from_params(params, id));
                params.set_output(NEW_ID, id);
                Ok(1)
            }
            Operation::Update => {
                let id = int_param(params, ID_PARAM)?;
                if !table.rows.contains_key(&id) {
                    return Ok(0);
                }
                table.rows.insert(id, row_from_params(params, id));
                Ok(1)
            }
            Operation::Delete => {
                let id = int_param(params, ID_PARAM)?;
                Ok(u64::from(table.rows.remove(&id).is_some()))
            }
            Operation::GetPaged | Operation::GetDistinct | Operation::GetById => {
                Err(ExecutorError::invalid(operation, "read operations use query"))
            }
        }
    }
}

fn int_param(params: &QueryParams, name: &str) -> Result<i64, ExecutorError> {
    let value = params.get(name).ok_or_else(|| ExecutorError::missing(name))?;
    value
        .as_i64()
        .ok_or_else(|| ExecutorError::invalid(name, format!("expected an integer, got {value}")))
}

/// A filter whose value equals its own parameter name is unset and matches everything.
fn matches_filters(row: &Row, filters: &[FilterField], params: &QueryParams) -> bool {
    filters.iter().all(|field| {
        let Some(wanted) = params.get(field.param).and_then(Value::as_str) else {
            return true;
        };
        if wanted == field.param {
            return true;
        }
        row.get(field.column)
            .and_then(Value::as_str)
            .is_some_and(|actual| actual.to_lowercase().contains(&wanted.to_lowercase()))
    })
}

fn row_from_params(params: &QueryParams, id: i64) -> Row {
    let mut row: Row = params
        .inputs()
        .filter(|(name, _)| *name != ID_PARAM && *name != ID_COLUMN)
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    row.insert(ID_COLUMN.to_string(), Value::from(id));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Personnel};

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            description: None,
        }
    }

    async fn executor() -> MemoryExecutor {
        let executor = MemoryExecutor::new()
            .with_entity::<Category>()
            .with_entity::<Personnel>();
        executor
            .seed((1..=25).map(|id| category(id, &format!("Category {id:02}"))))
            .await
            .expect("seed categories");
        executor
    }

    fn paged(index: i64, size: i64, name: &str) -> QueryParams {
        QueryParams::new()
            .with("PageIndex", index)
            .with("PageSize", size)
            .with("Name", name)
    }

    #[tokio::test]
    async fn paged_query_fills_total_records() {
        let executor = executor().await;
        let mut params = paged(3, 10, "Name");

        let rows = executor
            .query("Category_GetPaged", &mut params)
            .await
            .expect("query");

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["id"], 21);
        assert_eq!(params.total_records(), Some(25));
        assert_eq!(executor.query_count(), 1);
    }

    #[tokio::test]
    async fn filter_value_narrows_rows() {
        let executor = executor().await;
        let mut params = paged(1, 10, "category 1");

        let rows = executor
            .query("Category_GetPaged", &mut params)
            .await
            .expect("query");

        // 10 through 19
        assert_eq!(params.total_records(), Some(10));
        assert_eq!(rows.len(), 10);
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let executor = executor().await;
        let err = executor
            .query("Order_GetPaged", &mut QueryParams::new())
            .await
            .expect_err("unknown entity");
        assert!(matches!(err, ExecutorError::UnknownOperation { .. }));

        let err = executor
            .query("Category_Truncate", &mut QueryParams::new())
            .await
            .expect_err("unknown suffix");
        assert!(matches!(err, ExecutorError::UnknownOperation { .. }));
    }

    #[tokio::test]
    async fn insert_assigns_next_id() {
        let executor = executor().await;
        let mut params = QueryParams::new().with("name", "Shoes");

        let affected = executor
            .execute("Category_Insert", &mut params)
            .await
            .expect("insert");

        assert_eq!(affected, 1);
        assert_eq!(params.output(NEW_ID), Some(&Value::from(26)));
    }

    #[tokio::test]
    async fn update_and_delete_report_affected_rows() {
        let executor = executor().await;

        let mut update = QueryParams::new().with("Id", 99).with("name", "Ghost");
        assert_eq!(
            executor
                .execute("Category_Update", &mut update)
                .await
                .expect("update"),
            0
        );

        let mut delete = QueryParams::new().with("Id", 1);
        assert_eq!(
            executor
                .execute("Category_Delete", &mut delete)
                .await
                .expect("delete"),
            1
        );
        let mut find = QueryParams::new().with("Id", 1);
        let rows = executor
            .query("Category_GetById", &mut find)
            .await
            .expect("find");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn distinct_requires_distinct_column() {
        let executor = executor().await;
        let rows = executor
            .query("Category_GetDistinct", &mut QueryParams::new())
            .await
            .expect("distinct");
        assert_eq!(rows.len(), 25);

        let err = executor
            .query("Personnel_GetDistinct", &mut QueryParams::new())
            .await
            .expect_err("personnel has no distinct list");
        assert!(matches!(err, ExecutorError::UnknownOperation { .. }));
    }
}
