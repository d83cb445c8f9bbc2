// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `read_tabix`: header detection, column-type inference, and
//! tabix-indexed region scanning shared with [`crate::gff`] and
//! [`crate::gtf`].

pub mod attributes;
pub mod feature;
pub mod typeinfer;

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk::{self, DEFAULT_VECTOR_SIZE};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

/// Meta-character / leading-skip-line configuration a generic tabix read
/// honors, taken from the sibling `.tbi` index when present or the format's own defaults otherwise.
#[derive(Debug, Clone, Copy)]
pub struct TextConfig {
    pub meta_char: char,
    pub line_skip: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            meta_char: '#',
            line_skip: 0,
        }
    }
}

pub(crate) fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = std::fs::File::open(path)?;
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    if name.ends_with(".bgz") {
        Ok(Box::new(std::io::BufReader::new(noodles::bgzf::Reader::new(file))))
    } else if name.ends_with(".gz") {
        Ok(Box::new(std::io::BufReader::new(flate2::read::MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(std::io::BufReader::new(file)))
    }
}

fn sibling_index_path(path: &Path, index_path: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = index_path {
        return Some(PathBuf::from(p));
    }
    let mut candidate = path.as_os_str().to_os_string();
    candidate.push(".tbi");
    let candidate = PathBuf::from(candidate);
    candidate.is_file().then_some(candidate)
}

fn load_config(index_path: Option<&Path>) -> TextConfig {
    let Some(index_path) = index_path else {
        return TextConfig::default();
    };
    let Ok(index) = noodles::tabix::read(index_path) else {
        return TextConfig::default();
    };
    let Some(header) = index.header() else {
        return TextConfig::default();
    };
    TextConfig {
        meta_char: header.line_comment_prefix() as u8 as char,
        line_skip: header.line_skip() as usize,
    }
}

/// Reads raw (already decompressed) lines overlapping `region` by way of
/// the sibling tabix index, filtering candidate chunks down to the exact
/// overlap using the index header's declared seq/start/end columns.
fn region_lines(path: &Path, index_path: &Path, regions: &[String]) -> Result<Vec<String>> {
    let index = noodles::tabix::read(index_path)
        .map_err(|e| Error::Htsget(format!("reading {}: {e}", index_path.display())))?;
    let header = index
        .header()
        .ok_or_else(|| Error::Htsget("tabix index has no embedded header".to_string()))?;

    let mut out = Vec::new();
    for raw_region in regions {
        let region: noodles::core::Region = raw_region
            .parse()
            .map_err(|_| Error::InvalidRegion(raw_region.clone()))?;

        let tid = header
            .reference_sequence_names()
            .get_index_of(region.name())
            .ok_or_else(|| Error::InvalidRegion(raw_region.clone()))?;

        let chunks = index
            .query(tid, region.interval())
            .map_err(|e| Error::Htsget(format!("querying {raw_region}: {e}")))?;

        let file = std::fs::File::open(path)?;
        let mut reader = noodles::bgzf::Reader::new(file);
        let mut query = reader
            .query(&chunks)
            .map_err(|e| Error::Htsget(format!("seeking {raw_region}: {e}")))?;
        let mut text = String::new();
        query.read_to_string(&mut text)?;

        let seq_col = header.reference_sequence_name_index();
        let start_col = header.start_position_index();
        let end_col = header.end_position_index();
        let meta_char = header.line_comment_prefix() as u8 as char;

        for line in text.lines() {
            if line.starts_with(meta_char) {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.get(seq_col).copied() != Some(region.name()) {
                continue;
            }
            let Some(start) = fields.get(start_col).and_then(|s| s.parse::<usize>().ok()) else {
                out.push(line.to_string());
                continue;
            };
            let end = end_col
                .and_then(|c| fields.get(c))
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(start);
            let interval = region.interval();
            let overlaps = interval
                .start()
                .map(|b| end >= usize::from(b))
                .unwrap_or(true)
            && interval
                .end()
                .map(|b| start <= usize::from(b))
                .unwrap_or(true);
            if overlaps {
                out.push(line.to_string());
            }
        }
    }
    Ok(out)
}

fn split_data_line(line: &str, n_columns: usize) -> Vec<String> {
    let mut fields: Vec<String> = line.split('\t').map(str::to_string).collect();
    fields.resize(n_columns, String::new());
    fields
}

const COLUMN_TYPE_ALIASES_HINT: &str = "expected one of integer, bigint, double, varchar, boolean";

pub struct BindState {
    path: PathBuf,
    column_names: Vec<String>,
    column_types: Vec<Elementary>,
    config: TextConfig,
    skip_header_line: bool,
    regions: Vec<String>,
    index_path: Option<PathBuf>,
}

pub struct TabixReader;

impl crate::scan::Reader for TabixReader {
    type BindState = BindState;
    type GlobalState = ();
    type LocalState = RowSource;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let region = options::named_text(bind, "region");
        let index_path_opt = options::named_text(bind, "index_path");
        let header_flag = options::named_bool(bind, "header", false);
        let header_names = options::named_text_list(bind, "header_names");
        let auto_detect = options::named_bool(bind, "auto_detect", false);
        let explicit_types = options::named_text_list(bind, "column_types");

        let regions = region.as_deref().map(options::split_regions).unwrap_or_default();
        let index_path = sibling_index_path(&path, index_path_opt.as_deref());
        if !regions.is_empty() && index_path.is_none() {
            return Err(Error::InvalidRegion(
                    "region requested but no tabix index is available".to_string(),
            ));
        }
        let config = load_config(index_path.as_deref());

        let mut reader = open_text(&path)?;
        let sample: Vec<Vec<String>> = sample_data_lines(&mut reader, &config, header_names.is_none() && header_flag, 100)?;
        let n_columns = header_names
            .as_ref()
            .map(Vec::len)
            .or_else(|| sample.first().map(Vec::len))
            .unwrap_or(0);

        let column_names: Vec<String> = if let Some(names) = header_names {
            names
        } else if header_flag {
            detected_header_names(&path, &config, n_columns)?
        } else {
            (0..n_columns).map(|i| format!("column{i}")).collect()
        };

        let column_types = if let Some(type_names) = explicit_types {
            if type_names.len() != n_columns {
                return Err(Error::Schema(format!(
                            "column_types has {} entries but {n_columns} columns were detected ({COLUMN_TYPE_ALIASES_HINT})",
                            type_names.len()
                )));
            }
            type_names
                .iter()
                .map(|n| typeinfer::parse_column_type(n))
                .collect::<Result<Vec<_>>>()?
        } else if auto_detect {
            typeinfer::infer_column_types(&sample, n_columns)
        } else {
            vec![Elementary::Varchar; n_columns]
        };

        let mut schema = Schema::new();
        for (name, ty) in column_names.iter().zip(column_types.iter()) {
            schema.push(name.clone(), ColumnType::Scalar(*ty));
        }
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(BindState {
            path,
            column_names,
            column_types,
            config,
            skip_header_line: header_flag,
            regions,
            index_path,
        })
    }

    fn global_init(_bind: &BindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
                ("region".to_string(), LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                (
                    "index_path".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
                ("header".to_string(), LogicalTypeHandle::from(LogicalTypeId::Boolean)),
                (
                    "header_names".to_string(),
                    LogicalTypeHandle::list(&LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                ),
                (
                    "auto_detect".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Boolean),
                ),
                (
                    "column_types".to_string(),
                    LogicalTypeHandle::list(&LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                ),
        ])
    }

    fn local_init(bind: &BindState, _global: &(), _projection: Projection) -> Result<RowSource> {
        if !bind.regions.is_empty() {
            let index_path = bind.index_path.as_ref().expect("bind rejected region without index");
            let lines = region_lines(&bind.path, index_path, &bind.regions)?;
            return Ok(RowSource::Lines { lines, next: 0 });
        }
        let mut reader = open_text(&bind.path)?;
        skip_leading(&mut reader, &bind.config, bind.skip_header_line)?;
        Ok(RowSource::Stream(reader))
    }

    fn scan(
        bind: &BindState,
        _global: &(),
        local: &mut RowSource,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let n_columns = bind.column_names.len();
        let mut row = 0usize;
        while row < DEFAULT_VECTOR_SIZE {
            let Some(line) = local.next_line(&bind.config)? else { break };
            let fields = split_data_line(&line, n_columns);
            write_row(output, row, &fields, &bind.column_types);
            row += 1;
        }
        output.set_len(row);
        Ok(())
    }
}

pub(crate) enum RowSource {
    Stream(Box<dyn BufRead>),
    Lines { lines: Vec<String>, next: usize },
}

impl RowSource {
    fn next_line(&mut self, config: &TextConfig) -> Result<Option<String>> {
        match self {
            Self::Lines { lines, next } => {
                if *next >= lines.len() {
                    return Ok(None);
                }
                let line = lines[*next].clone();
                *next += 1;
                Ok(Some(line))
            }
            Self::Stream(reader) => loop {
                let mut line = String::new();
                let n = reader.read_line(&mut line)?;
                if n == 0 {
                    return Ok(None);
                }
                let trimmed = line.trim_end_matches(['\n', '\r']);
                if trimmed.starts_with(config.meta_char) {
                    continue;
                }
                return Ok(Some(trimmed.to_string()));
            },
        }
    }
}

fn skip_leading(reader: &mut Box<dyn BufRead>, config: &TextConfig, header_consumed: bool) -> Result<()> {
    let mut skipped = 0usize;
    let mut header_seen = false;
    loop {
        let pos = reader.fill_buf()?;
        if pos.is_empty() {
            return Ok(());
        }
        let first_byte = pos[0];
        if first_byte == config.meta_char as u8 {
            let mut discard = String::new();
            reader.read_line(&mut discard)?;
            continue;
        }
        if skipped < config.line_skip {
            let mut discard = String::new();
            reader.read_line(&mut discard)?;
            skipped += 1;
            continue;
        }
        if header_consumed && !header_seen {
            let mut discard = String::new();
            reader.read_line(&mut discard)?;
            header_seen = true;
            continue;
        }
        return Ok(());
    }
}

fn sample_data_lines(
    reader: &mut Box<dyn BufRead>,
    config: &TextConfig,
    skip_header_row: bool,
    limit: usize,
) -> Result<Vec<Vec<String>>> {
    skip_leading(reader, config, skip_header_row)?;
    let mut rows = Vec::new();
    for _ in 0..limit {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.starts_with(config.meta_char) || trimmed.is_empty() {
            continue;
        }
        rows.push(trimmed.split('\t').map(str::to_string).collect());
    }
    Ok(rows)
}

fn detected_header_names(path: &Path, config: &TextConfig, n_columns: usize) -> Result<Vec<String>> {
    let mut reader = open_text(path)?;
    skip_leading(&mut reader, config, false)?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\n', '\r']);
    let names: Vec<String> = trimmed.split('\t').map(|s| s.trim().to_string()).collect();
    if names.len() == n_columns {
        Ok(names)
    } else {
        Ok((0..n_columns).map(|i| format!("column{i}")).collect())
    }
}

fn write_row(output: &mut DataChunkHandle, row: usize, fields: &[String], types: &[Elementary]) {
    for (col, (field, ty)) in fields.iter().zip(types.iter()).enumerate() {
        let value = if field == "." { None } else { Some(field.as_str()) };
        match ty {
            Elementary::Varchar => chunk::write_varchar(output, col, row, value),
            Elementary::BigInt => chunk::write_i64(output, col, row, value.and_then(|v| v.parse().ok())),
            Elementary::Integer => chunk::write_i32(output, col, row, value.and_then(|v| v.parse().ok())),
            Elementary::Double => chunk::write_f64(output, col, row, value.and_then(|v| v.parse().ok())),
            Elementary::Boolean => chunk::write_bool(
                output,
                col,
                row,
                value.map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1")),
            ),
            Elementary::USmallInt | Elementary::Float | Elementary::Blob => {
                chunk::write_varchar(output, col, row, value);
            }
        }
    }
}
