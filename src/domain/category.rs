//! Storefront product category.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::{DistinctSpec, Entity, FilterField};
use crate::cache::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Entity for Category {
    const NAME: &'static str = "Category";
    const ROUTE: &'static str = "categories";
    const LIST_TAG: Tag = Tag::from_static("CategoryData");
    const DISTINCT: Option<DistinctSpec> = Some(DistinctSpec {
        tag: Tag::from_static("DistinctCategoryData"),
        column: "name",
    });
    const FILTERS: &'static [FilterField] = &[FilterField {
        param: "Name",
        column: "name",
    }];

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(self, id: i64) -> Self {
        Self { id, ..self }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(Self::NAME, "name must not be empty"));
        }
        Ok(())
    }
}
