// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The fixed 9-column GFF3/GTF reader shared by `read_gff` and `read_gtf`.
//! `GTF` selects the attribute grammar and the columns are otherwise
//! identical.

use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use super::{attributes, open_text, region_lines, sibling_index_path, skip_leading, split_data_line, RowSource, TextConfig};
use crate::error::Result;
use crate::options;
use crate::scan::chunk::{self, ListOffsets, DEFAULT_VECTOR_SIZE};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

const COL_SEQNAME: usize = 0;
const COL_SOURCE: usize = 1;
const COL_FEATURE: usize = 2;
const COL_START: usize = 3;
const COL_END: usize = 4;
const COL_SCORE: usize = 5;
const COL_STRAND: usize = 6;
const COL_FRAME: usize = 7;
const COL_ATTRIBUTES: usize = 8;
const FIXED_COLUMN_COUNT: usize = 9;

pub struct FeatureBindState {
    path: PathBuf,
    attributes_map: bool,
    config: TextConfig,
    regions: Vec<String>,
    index_path: Option<PathBuf>,
}

pub struct FeatureReader<const GTF: bool>;

impl<const GTF: bool> crate::scan::Reader for FeatureReader<GTF> {
    type BindState = FeatureBindState;
    type GlobalState = ();
    type LocalState = RowSource;

    fn bind(bind: &BindInfo) -> Result<FeatureBindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let region = options::named_text(bind, "region");
        let attributes_map = options::named_bool(bind, "attributes_map", false);

        let regions = region.as_deref().map(options::split_regions).unwrap_or_default();
        let index_path = sibling_index_path(&path, None);
        if !regions.is_empty() && index_path.is_none() {
            return Err(crate::error::Error::InvalidRegion(
                    "region requested but no tabix index is available".to_string(),
            ));
        }
        let config = super::load_config(index_path.as_deref());

        let mut schema = Schema::new();
        schema.push("seqname", ColumnType::Scalar(Elementary::Varchar));
        schema.push("source", ColumnType::Scalar(Elementary::Varchar));
        schema.push("feature", ColumnType::Scalar(Elementary::Varchar));
        schema.push("start", ColumnType::Scalar(Elementary::BigInt));
        schema.push("end", ColumnType::Scalar(Elementary::BigInt));
        schema.push("score", ColumnType::Scalar(Elementary::Double));
        schema.push("strand", ColumnType::Scalar(Elementary::Varchar));
        schema.push("frame", ColumnType::Scalar(Elementary::Varchar));
        schema.push("attributes", ColumnType::Scalar(Elementary::Varchar));
        if attributes_map {
            schema.push("attributes_map", ColumnType::MapVarcharVarchar);
        }
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(FeatureBindState {
            path,
            attributes_map,
            config,
            regions,
            index_path,
        })
    }

    fn global_init(_bind: &FeatureBindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
                ("region".to_string(), LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                (
                    "attributes_map".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Boolean),
                ),
        ])
    }

    fn local_init(bind: &FeatureBindState, _global: &(), _projection: Projection) -> Result<RowSource> {
        if !bind.regions.is_empty() {
            let index_path = bind.index_path.as_ref().expect("bind rejected region without index");
            let lines = region_lines(&bind.path, index_path, &bind.regions)?;
            return Ok(RowSource::Lines { lines, next: 0 });
        }
        let mut reader = open_text(&bind.path)?;
        skip_leading(&mut reader, &bind.config, false)?;
        Ok(RowSource::Stream(reader))
    }

    fn scan(
        bind: &FeatureBindState,
        _global: &(),
        local: &mut RowSource,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let mut row = 0usize;
        let mut offsets = ListOffsets::new();
        while row < DEFAULT_VECTOR_SIZE {
            let Some(line) = local.next_line(&bind.config)? else { break };
            let fields = split_data_line(&line, FIXED_COLUMN_COUNT);
            write_feature_row::<GTF>(output, row, &fields, bind.attributes_map, &mut offsets);
            row += 1;
        }
        output.set_len(row);
        Ok(())
    }
}

fn opt(field: &str) -> Option<&str> {
    if field.is_empty() || field == "." {
        None
    } else {
        Some(field)
    }
}

fn write_feature_row<const GTF: bool>(
    output: &mut DataChunkHandle,
    row: usize,
    fields: &[String],
    attributes_map: bool,
    offsets: &mut ListOffsets,
) {
    chunk::write_varchar(output, COL_SEQNAME, row, opt(&fields[COL_SEQNAME]));
    chunk::write_varchar(output, COL_SOURCE, row, opt(&fields[COL_SOURCE]));
    chunk::write_varchar(output, COL_FEATURE, row, opt(&fields[COL_FEATURE]));
    chunk::write_i64(output, COL_START, row, fields[COL_START].parse().ok());
    chunk::write_i64(output, COL_END, row, fields[COL_END].parse().ok());
    chunk::write_f64(output, COL_SCORE, row, opt(&fields[COL_SCORE]).and_then(|v| v.parse().ok()));
    chunk::write_varchar(output, COL_STRAND, row, opt(&fields[COL_STRAND]));
    chunk::write_varchar(output, COL_FRAME, row, opt(&fields[COL_FRAME]));
    let raw_attrs = fields[COL_ATTRIBUTES].as_str();
    chunk::write_varchar(output, COL_ATTRIBUTES, row, opt(raw_attrs));

    if attributes_map {
        let map = if GTF {
            attributes::parse_gtf(raw_attrs)
        } else {
            attributes::parse_gff3(raw_attrs)
        };
        let kv = if map.is_empty() { None } else { Some(&map) };
        let off = offsets.next(FIXED_COLUMN_COUNT);
        let off = chunk::write_map_varchar_varchar(output, FIXED_COLUMN_COUNT, row, off, kv);
        offsets.advance_to(FIXED_COLUMN_COUNT, off);
    }
}
