//! Column-level schema diff between primary and secondary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
    pub column: String,
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaStatus {
    Matching,
    MissingOnSecondary,
    MissingOnPrimary,
    Differing {
        missing_on_secondary: Vec<String>,
        extra_on_secondary: Vec<String>,
        type_mismatches: Vec<TypeMismatch>,
    },
    /// One side could not be read.
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchemaComparison {
    pub table: String,
    #[serde(flatten)]
    pub status: SchemaStatus,
}
