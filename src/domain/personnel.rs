//! Personnel record.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::{DistinctSpec, Entity, FilterField};
use crate::cache::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personnel {
    #[serde(default)]
    pub id: i64,
    pub army_no: String,
    pub name: String,
    #[serde(default)]
    pub rank: Option<String>,
}

impl Entity for Personnel {
    const NAME: &'static str = "Personnel";
    const ROUTE: &'static str = "personnel";
    const LIST_TAG: Tag = Tag::from_static("PersonnelData");
    const DISTINCT: Option<DistinctSpec> = None;
    const FILTERS: &'static [FilterField] = &[
        FilterField {
            param: "ArmyNo",
            column: "armyNo",
        },
        FilterField {
            param: "Name",
            column: "name",
        },
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(self, id: i64) -> Self {
        Self { id, ..self }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.army_no.trim().is_empty() {
            return Err(DomainError::validation(Self::NAME, "army number must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(Self::NAME, "name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_army_number() {
        let record = Personnel {
            id: 0,
            army_no: " ".to_string(),
            name: "Bello".to_string(),
            rank: None,
        };
        assert!(record.validate().is_err());
        assert!(record.clone().with_id(4).validate().is_err());
    }

    #[test]
    fn deserializes_without_id() {
        let record: Personnel =
            serde_json::from_str(r#"{"armyNo":"N/1234","name":"Bello"}"#).expect("valid json");
        assert_eq!(record.id, 0);
        assert_eq!(record.rank, None);
    }
}
