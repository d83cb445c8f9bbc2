// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Logical column types and the fixed, bind-time schema every reader builds.

use duckdb::core::{LogicalTypeHandle, LogicalTypeId};

/// One elementary logical type used anywhere in a reader's schema.
///
/// This mirrors the subset of DuckDB's logical type system the readers
/// need; composite shapes (`List`, `Map`) wrap an elementary type rather
/// than being modeled as a full type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elementary {
    Boolean,
    Integer,
    BigInt,
    USmallInt,
    Float,
    Double,
    Varchar,
    Blob,
}

/// A column's logical type: either an elementary scalar, a homogeneous
/// list, or a string-to-string map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(Elementary),
    List(Elementary),
    MapVarcharVarchar,
}

impl ColumnType {
    #[must_use]
    pub fn to_logical_type(&self) -> LogicalTypeHandle {
        match self {
            Self::Scalar(e) => elementary_logical_type(*e),
            Self::List(e) => LogicalTypeHandle::list(&elementary_logical_type(*e)),
            Self::MapVarcharVarchar => LogicalTypeHandle::map(
                &elementary_logical_type(Elementary::Varchar),
                &elementary_logical_type(Elementary::Varchar),
            ),
        }
    }
}

fn elementary_logical_type(e: Elementary) -> LogicalTypeHandle {
    let id = match e {
        Elementary::Boolean => LogicalTypeId::Boolean,
        Elementary::Integer => LogicalTypeId::Integer,
        Elementary::BigInt => LogicalTypeId::Bigint,
        Elementary::USmallInt => LogicalTypeId::USmallint,
        Elementary::Float => LogicalTypeId::Float,
        Elementary::Double => LogicalTypeId::Double,
        Elementary::Varchar => LogicalTypeId::Varchar,
        Elementary::Blob => LogicalTypeId::Blob,
    };
    LogicalTypeHandle::from(id)
}

/// One output column: a stable name plus its logical type.
///
/// Schemas are ordered sequences of these, fixed at bind time and never
/// changed during a scan.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered schema built during bind, registered on `BindInfo` in declared
/// order via `add_result_column`.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, ty: ColumnType) -> usize {
        let idx = self.columns.len();
        self.columns.push(ColumnSpec::new(name, ty));
        idx
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
