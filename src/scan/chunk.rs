// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Chunk/vector helpers: the narrow seam between this crate's decoders and
//! DuckDB's columnar `DataChunkHandle`. Every reader writes column values
//! through these free functions instead of touching `duckdb::core` vector
//! types directly, so the one place that has to track DuckDB's exact
//! vector-writing conventions (validity bit vs. sentinel, list child
//! offsets, map key/value children) is this module.

use duckdb::core::{DataChunkHandle, Inserter};
use indexmap::IndexMap;

/// Row cap per chunk (`vector_size`). DuckDB's own default is 2048;
/// this is used by in-crate tests that build chunks without a live
/// DuckDB connection.
pub const DEFAULT_VECTOR_SIZE: usize = 2048;

pub fn write_bool(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<bool>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<bool>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_i32(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<i32>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<i32>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_i64(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<i64>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<i64>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_u16(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<u16>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<u16>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_f32(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<f32>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<f32>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_f64(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<f64>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(v) => vector.as_mut_slice::<f64>()[row] = v,
        None => vector.set_null(row),
    }
}

pub fn write_varchar(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<&str>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(s) => vector.insert(row, s),
        None => vector.set_null(row),
    }
}

pub fn write_blob(chunk: &mut DataChunkHandle, col: usize, row: usize, value: Option<&[u8]>) {
    let mut vector = chunk.flat_vector(col);
    match value {
        Some(bytes) => vector.insert(row, bytes),
        None => vector.set_null(row),
    }
}

/// Writes a `LIST<VARCHAR>` entry. `None` marks the whole list NULL;
/// `Some(items)` writes the list, with `None` elements becoming NULL
/// children (used for VEP columns and BAM `B`-type string arrays, as well
/// as `FILTER`/`ALT`).
pub fn write_list_varchar(
    chunk: &mut DataChunkHandle,
    col: usize,
    row: usize,
    offset: usize,
    values: Option<&[Option<String>]>,
) -> usize {
    let mut list_vector = chunk.list_vector(col);
    match values {
        None => {
            list_vector.set_entry(row, offset, 0);
            offset
        }
        Some(items) => {
            list_vector.set_entry(row, offset, items.len());
            let mut child = list_vector.child(offset + items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Some(s) => child.insert(offset + i, s.as_str()),
                    None => child.set_null(offset + i),
                }
            }
            offset + items.len()
        }
    }
}

pub fn write_list_i64(
    chunk: &mut DataChunkHandle,
    col: usize,
    row: usize,
    offset: usize,
    values: Option<&[i64]>,
) -> usize {
    let mut list_vector = chunk.list_vector(col);
    match values {
        None => {
            list_vector.set_entry(row, offset, 0);
            offset
        }
        Some(items) => {
            list_vector.set_entry(row, offset, items.len());
            let mut child = list_vector.child(offset + items.len());
            let slice = child.as_mut_slice::<i64>();
            for (i, item) in items.iter().enumerate() {
                slice[offset + i] = *item;
            }
            offset + items.len()
        }
    }
}

pub fn write_list_f64(
    chunk: &mut DataChunkHandle,
    col: usize,
    row: usize,
    offset: usize,
    values: Option<&[f64]>,
) -> usize {
    let mut list_vector = chunk.list_vector(col);
    match values {
        None => {
            list_vector.set_entry(row, offset, 0);
            offset
        }
        Some(items) => {
            list_vector.set_entry(row, offset, items.len());
            let mut child = list_vector.child(offset + items.len());
            let slice = child.as_mut_slice::<f64>();
            for (i, item) in items.iter().enumerate() {
                slice[offset + i] = *item;
            }
            offset + items.len()
        }
    }
}

/// Writes a `MAP<VARCHAR,VARCHAR>` entry. DuckDB's physical storage for
/// `MAP` is `LIST<STRUCT<key, value>>`, so this is a list-of-entries write
/// over a two-child struct vector, keeping insertion order so GFF3/GTF
/// attribute maps preserve the source line's key order.
pub fn write_map_varchar_varchar(
    chunk: &mut DataChunkHandle,
    col: usize,
    row: usize,
    offset: usize,
    values: Option<&IndexMap<String, String>>,
) -> usize {
    let mut list_vector = chunk.list_vector(col);
    match values {
        None => {
            list_vector.set_entry(row, offset, 0);
            offset
        }
        Some(map) => {
            list_vector.set_entry(row, offset, map.len());
            let mut entries = list_vector.struct_child(offset + map.len());
            let mut keys = entries.child(0);
            let mut vals = entries.child(1);
            for (i, (k, v)) in map.iter().enumerate() {
                keys.insert(offset + i, k.as_str());
                vals.insert(offset + i, v.as_str());
            }
            offset + map.len()
        }
    }
}

/// Running per-column list-child offsets for one chunk, since DuckDB list
/// vectors need a monotonically increasing child offset across the rows
/// of a single chunk fill.
#[derive(Debug, Default)]
pub struct ListOffsets {
    offsets: std::collections::HashMap<usize, usize>,
}

impl ListOffsets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, col: usize) -> usize {
        *self.offsets.entry(col).or_insert(0)
    }

    pub fn advance_to(&mut self, col: usize, new_offset: usize) {
        self.offsets.insert(col, new_offset);
    }

    pub fn reset(&mut self) {
        self.offsets.clear();
    }
}
