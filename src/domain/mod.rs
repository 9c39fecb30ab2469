//! Domain layer: record types and the metadata that drives caching.

pub mod category;
pub mod error;
pub mod personnel;

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{SentinelFilter, Tag};
use error::DomainError;

pub use category::Category;
pub use personnel::Personnel;

/// The named operations every entity exposes to the query executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetPaged,
    GetDistinct,
    GetById,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::GetPaged => "GetPaged",
            Self::GetDistinct => "GetDistinct",
            Self::GetById => "GetById",
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

/// A "distinct values" list kept under its own tag.
#[derive(Debug, Clone)]
pub struct DistinctSpec {
    pub tag: Tag,
    /// Row column whose distinct values are listed.
    pub column: &'static str,
}

/// A filter parameter and the row column it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Parameter name; also the value that means "no filter".
    pub param: &'static str,
    pub column: &'static str,
}

/// A record type served through the cached repository.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Operation prefix, e.g. `Category` for `Category_GetPaged`.
    const NAME: &'static str;
    /// Route segment under `/api/v1`.
    const ROUTE: &'static str;
    const LIST_TAG: Tag;
    const DISTINCT: Option<DistinctSpec>;
    /// Filters of the paged list, in key order.
    const FILTERS: &'static [FilterField];

    fn id(&self) -> i64;

    fn with_id(self, id: i64) -> Self;

    fn validate(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn operation(op: Operation) -> String {
        format!("{}_{}", Self::NAME, op.suffix())
    }

    /// Every tag a write to this entity must invalidate.
    fn tags() -> Vec<Tag> {
        let mut tags = vec![Self::LIST_TAG];
        if let Some(distinct) = Self::DISTINCT {
            tags.push(distinct.tag);
        }
        tags
    }

    /// Sentinel filters for [`Self::FILTERS`], unset where `values` has no entry.
    fn filters_from(values: &HashMap<String, String>) -> Vec<SentinelFilter> {
        Self::FILTERS
            .iter()
            .map(|field| SentinelFilter::new(field.param, values.get(field.param).cloned()))
            .collect()
    }
}
