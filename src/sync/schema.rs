//! Schema comparison over `information_schema.columns`.

use crate::models::sync::schema_comparison::{ColumnInfo, SchemaStatus, TypeMismatch};
use std::collections::BTreeMap;

pub const COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, data_type::text AS data_type, is_nullable::text AS is_nullable \
     FROM information_schema.columns WHERE table_schema = 'public' AND table_name = $1::text ORDER BY ordinal_position";

/// Classify one table from the column lists read on each side.
///
/// A table absent from both sides counts as missing on the secondary.
pub fn classify(primary: &[ColumnInfo], secondary: &[ColumnInfo]) -> SchemaStatus {
    if secondary.is_empty() {
        SchemaStatus::MissingOnSecondary
    } else if primary.is_empty() {
        SchemaStatus::MissingOnPrimary
    } else {
        diff_columns(primary, secondary)
    }
}

fn diff_columns(primary: &[ColumnInfo], secondary: &[ColumnInfo]) -> SchemaStatus {
    let p: BTreeMap<&str, &ColumnInfo> = primary.iter().map(|c| (c.column_name.as_str(), c)).collect();
    let s: BTreeMap<&str, &ColumnInfo> = secondary.iter().map(|c| (c.column_name.as_str(), c)).collect();

    let missing_on_secondary: Vec<String> = p
        .keys()
        .filter(|k| !s.contains_key(*k))
        .map(|k| k.to_string())
        .collect();
    let extra_on_secondary: Vec<String> = s
        .keys()
        .filter(|k| !p.contains_key(*k))
        .map(|k| k.to_string())
        .collect();
    let type_mismatches: Vec<TypeMismatch> = p
        .iter()
        .filter_map(|(name, pc)| {
            let sc = s.get(name)?;
            if pc.data_type != sc.data_type || pc.is_nullable != sc.is_nullable {
                Some(TypeMismatch {
                    column: name.to_string(),
                    primary: describe(pc),
                    secondary: describe(sc),
                })
            } else {
                None
            }
        })
        .collect();

    if missing_on_secondary.is_empty() && extra_on_secondary.is_empty() && type_mismatches.is_empty() {
        SchemaStatus::Matching
    } else {
        SchemaStatus::Differing {
            missing_on_secondary,
            extra_on_secondary,
            type_mismatches,
        }
    }
}

fn describe(c: &ColumnInfo) -> String {
    if c.is_nullable.eq_ignore_ascii_case("YES") {
        format!("{} NULL", c.data_type)
    } else {
        format!("{} NOT NULL", c.data_type)
    }
}
