// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Column-type inference and the `column_types` alias table.

use crate::error::{Error, Result};
use crate::types::Elementary;

/// `.` marks a missing token throughout the generic tabix surface.
const MISSING_TOKEN: &str = ".";

/// Samples up to `SAMPLE_LIMIT` data lines and tightens each column's type:
/// all-integer tokens -> `BIGINT`; all-integer-or-float -> `DOUBLE`;
/// otherwise `VARCHAR`. Missing (`.`) tokens never disqualify a column.
#[must_use]
pub fn infer_column_types(sample_rows: &[Vec<String>], n_columns: usize) -> Vec<Elementary> {
    let mut types = vec![Elementary::BigInt; n_columns];
    let mut saw_value = vec![false; n_columns];

    for row in sample_rows {
        for col in 0..n_columns {
            let Some(token) = row.get(col) else { continue };
            if token == MISSING_TOKEN || token.is_empty() {
                continue;
            }
            saw_value[col] = true;
            let current = types[col];
            if current == Elementary::Varchar {
                continue;
            }
            if token.parse::<i64>().is_ok() {
                continue;
            }
            if token.parse::<f64>().is_ok() {
                types[col] = Elementary::Double;
            } else {
                types[col] = Elementary::Varchar;
            }
        }
    }

    for col in 0..n_columns {
        if !saw_value[col] {
            types[col] = Elementary::Varchar;
        }
    }
    types
}

/// Normalizes an explicit `column_types` entry (case-insensitive, with the
/// common R/user-ecosystem spellings) to one of the five logical types the
/// generic reader supports.
pub fn parse_column_type(name: &str) -> Result<Elementary> {
    match name.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" | "int32" => Ok(Elementary::Integer),
        "bigint" | "long" | "int64" | "integer64" => Ok(Elementary::BigInt),
        "double" | "float" | "float64" | "numeric" | "real" => Ok(Elementary::Double),
        "varchar" | "character" | "string" | "text" | "chr" => Ok(Elementary::Varchar),
        "boolean" | "bool" | "logical" => Ok(Elementary::Boolean),
        other => Err(Error::Schema(format!("unrecognized column type `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_tightest_common_type_per_column() {
        let rows = vec![
            vec!["chr1".to_string(), "100".to_string(), "1.5".to_string()],
            vec!["chr2".to_string(), "200".to_string(), ".".to_string()],
            vec!["chr3".to_string(), "300".to_string(), "2.25".to_string()],
        ];
        let types = infer_column_types(&rows, 3);
        assert_eq!(types, vec![Elementary::Varchar, Elementary::BigInt, Elementary::Double]);
    }

    #[test]
    fn aliases_normalize_case_insensitively() {
        assert_eq!(parse_column_type("Int").unwrap(), Elementary::Integer);
        assert_eq!(parse_column_type("Real").unwrap(), Elementary::Double);
        assert!(parse_column_type("nonsense").is_err());
    }
}
