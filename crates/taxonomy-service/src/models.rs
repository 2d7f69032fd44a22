//! 分类领域模型

use serde::{Deserialize, Serialize};
use sqlkit::{FromRow, Row};

/// 分类
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: String,
    pub name: String,
}

impl Taxonomy {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl FromRow for Taxonomy {
    fn from_row(row: &Row) -> sqlkit::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}
