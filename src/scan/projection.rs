// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Projection pushdown: the list of logical column indices a scan must
//! populate, captured once in local-init and consulted throughout the
//! row loop so sub-parsers (VEP, per-sample FORMAT, CIGAR/SEQ decode) can
//! be skipped when nothing downstream needs them.

use duckdb::vtab::InitInfo;
use rustc_hash::FxHashSet;

/// The ordered set of output columns the consumer actually reads.
///
/// Invariant: every emitted row must have exactly these columns
/// populated; all others may be left untouched.
#[derive(Debug, Clone)]
pub struct Projection {
    columns: Vec<u64>,
    lookup: FxHashSet<u64>,
}

impl Projection {
    fn new(columns: Vec<u64>) -> Self {
        let lookup = columns.iter().copied().collect();
        Self { columns, lookup }
    }

    /// Captures the projection list from `InitInfo` during local-init.
    pub fn from_init_info(info: &InitInfo) -> Self {
        let n = info.get_column_count();
        let columns = (0..n).map(|i| info.get_column_index(i)).collect();
        Self::new(columns)
    }

    /// A projection that requests every column `0..n` (used by tests and
    /// by readers with no DuckDB init-info to pull from).
    #[must_use]
    pub fn all(n: u64) -> Self {
        Self::new((0..n).collect())
    }

    /// `O(1)` membership check against an `FxHashSet`, since this is
    /// consulted once per INFO/FORMAT/tag field on every row.
    #[must_use]
    pub fn contains(&self, logical_index: u64) -> bool {
        self.lookup.contains(&logical_index)
    }

    #[must_use]
    pub fn contains_any(&self, logical_indices: &[u64]) -> bool {
        logical_indices.iter().any(|i| self.contains(*i))
    }

    #[must_use]
    pub fn columns(&self) -> &[u64] {
        &self.columns
    }
}
