// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `read_hts_header`: one row per header record, format-specific.

use std::io::BufRead;
use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk;
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

use super::FormatHint;

pub struct HeaderRow {
    pub record_type: String,
    pub id: Option<String>,
    pub number: Option<String>,
    pub value_type: Option<String>,
    pub length: Option<i64>,
    pub description: Option<String>,
    pub idx: Option<i64>,
    pub key_values: IndexMap<String, String>,
    pub raw: String,
}

pub struct BindState {
    file_format: String,
    compression: String,
    rows: Vec<HeaderRow>,
}

pub struct HeaderReader;

impl crate::scan::Reader for HeaderReader {
    type BindState = BindState;
    type GlobalState = ();
    type LocalState = usize;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let format_hint = options::named_text(bind, "format");
        let format = FormatHint::parse(format_hint.as_deref()).resolve(&path);
        let compression = if path.extension().is_some_and(|e| e == "gz" || e == "bgz") {
            "BGZF"
        } else {
            "NONE"
        };

        let rows = build_rows(&path, format)?;

        let mut schema = Schema::new();
        schema.push("file_format", ColumnType::Scalar(Elementary::Varchar));
        schema.push("compression", ColumnType::Scalar(Elementary::Varchar));
        schema.push("record_type", ColumnType::Scalar(Elementary::Varchar));
        schema.push("id", ColumnType::Scalar(Elementary::Varchar));
        schema.push("number", ColumnType::Scalar(Elementary::Varchar));
        schema.push("value_type", ColumnType::Scalar(Elementary::Varchar));
        schema.push("length", ColumnType::Scalar(Elementary::BigInt));
        schema.push("description", ColumnType::Scalar(Elementary::Varchar));
        schema.push("idx", ColumnType::Scalar(Elementary::BigInt));
        schema.push("key_values", ColumnType::MapVarcharVarchar);
        schema.push("raw", ColumnType::Scalar(Elementary::Varchar));
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(BindState {
            file_format: format_label(format).to_string(),
            compression: compression.to_string(),
            rows,
        })
    }

    fn global_init(_bind: &BindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![(
                    "format".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )])
    }

    fn local_init(_bind: &BindState, _global: &(), _projection: Projection) -> Result<usize> {
        Ok(0)
    }

    fn scan(
        bind: &BindState,
        _global: &(),
        local: &mut usize,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let mut row = 0usize;
        let mut offsets = crate::scan::chunk::ListOffsets::new();
        while *local < bind.rows.len() && row < chunk::DEFAULT_VECTOR_SIZE {
            let r = &bind.rows[*local];
            chunk::write_varchar(output, 0, row, Some(&bind.file_format));
            chunk::write_varchar(output, 1, row, Some(&bind.compression));
            chunk::write_varchar(output, 2, row, Some(&r.record_type));
            chunk::write_varchar(output, 3, row, r.id.as_deref());
            chunk::write_varchar(output, 4, row, r.number.as_deref());
            chunk::write_varchar(output, 5, row, r.value_type.as_deref());
            chunk::write_i64(output, 6, row, r.length);
            chunk::write_varchar(output, 7, row, r.description.as_deref());
            chunk::write_i64(output, 8, row, r.idx);
            let off = offsets.next(9);
            let kv = if r.key_values.is_empty() { None } else { Some(&r.key_values) };
            let off = chunk::write_map_varchar_varchar(output, 9, row, off, kv);
            offsets.advance_to(9, off);
            chunk::write_varchar(output, 10, row, Some(&r.raw));
            *local += 1;
            row += 1;
        }
        output.set_len(row);
        Ok(())
    }
}

fn format_label(format: FormatHint) -> &'static str {
    match format {
        FormatHint::Auto => "UNKNOWN",
        FormatHint::Vcf => "VCF",
        FormatHint::Bcf => "BCF",
        FormatHint::Sam => "SAM",
        FormatHint::Bam => "BAM",
        FormatHint::Cram => "CRAM",
        FormatHint::Fasta => "FASTA",
        FormatHint::Fastq => "FASTQ",
        FormatHint::Tabix => "TABIX",
    }
}

fn build_rows(path: &std::path::Path, format: FormatHint) -> Result<Vec<HeaderRow>> {
    match format {
        FormatHint::Vcf | FormatHint::Bcf => build_vcf_rows(path),
        FormatHint::Sam | FormatHint::Bam | FormatHint::Cram => build_sam_rows(path, format),
        FormatHint::Fasta | FormatHint::Fastq => Ok(Vec::new()),
        FormatHint::Tabix | FormatHint::Auto => build_tabix_rows(path),
    }
}

fn build_vcf_rows(path: &std::path::Path) -> Result<Vec<HeaderRow>> {
    let mut reader = noodles::vcf::io::reader::Builder::default()
        .build_from_path(path)
        .map_err(|e| Error::Htsget(e.to_string()))?;
    let header = reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?;

    let mut rows = Vec::new();

    for (id, contig) in header.contigs().iter() {
        let mut kv = IndexMap::new();
        if let Some(len) = contig.length() {
            kv.insert("length".to_string(), len.to_string());
        }
        rows.push(HeaderRow {
            record_type: "contig".to_string(),
            id: Some(id.to_string()),
            number: None,
            value_type: None,
            length: contig.length().map(|l| l as i64),
            description: None,
            idx: contig.idx().map(|i| i as i64),
            key_values: kv,
            raw: format!("##contig=<ID={id}>"),
        });
    }

    for (id, info) in header.infos().iter() {
        rows.push(HeaderRow {
            record_type: "info".to_string(),
            id: Some(id.to_string()),
            number: Some(format!("{:?}", info.number())),
            value_type: Some(info.ty().to_string()),
            length: None,
            description: Some(info.description().to_string()),
            idx: info.idx().map(|i| i as i64),
            key_values: IndexMap::new(),
            raw: format!("##INFO=<ID={id}>"),
        });
    }

    for (id, format) in header.formats().iter() {
        rows.push(HeaderRow {
            record_type: "format".to_string(),
            id: Some(id.to_string()),
            number: Some(format!("{:?}", format.number())),
            value_type: Some(format.ty().to_string()),
            length: None,
            description: Some(format.description().to_string()),
            idx: format.idx().map(|i| i as i64),
            key_values: IndexMap::new(),
            raw: format!("##FORMAT=<ID={id}>"),
        });
    }

    for (id, filter) in header.filters().iter() {
        rows.push(HeaderRow {
            record_type: "filter".to_string(),
            id: Some(id.to_string()),
            number: None,
            value_type: None,
            length: None,
            description: Some(filter.description().to_string()),
            idx: filter.idx().map(|i| i as i64),
            key_values: IndexMap::new(),
            raw: format!("##FILTER=<ID={id}>"),
        });
    }

    Ok(rows)
}

fn build_sam_rows(path: &std::path::Path, format: FormatHint) -> Result<Vec<HeaderRow>> {
    let header = match format {
        FormatHint::Bam => {
            let mut reader = noodles::bam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?
        }
        FormatHint::Cram => {
            let mut reader = noodles::cram::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?
        }
        _ => {
            let mut reader = noodles::sam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?
        }
    };

    let mut rows = Vec::new();
    for line in header.to_string().lines() {
        let Some(rest) = line.strip_prefix('@') else { continue };
        let mut parts = rest.split('\t');
        let record_type = parts.next().unwrap_or("").to_string();
        let mut kv = IndexMap::new();
        for field in parts {
            if let Some((k, v)) = field.split_once(':') {
                kv.insert(k.to_string(), v.to_string());
            }
        }
        let id = match record_type.as_str() {
            "SQ" => kv.get("SN").cloned(),
            "RG" | "PG" => kv.get("ID").cloned(),
            _ => None,
        };
        let length = kv.get("LN").and_then(|v| v.parse().ok());
        rows.push(HeaderRow {
            record_type,
            id,
            number: None,
            value_type: None,
            length,
            description: None,
            idx: None,
            key_values: kv,
            raw: line.to_string(),
        });
    }
    Ok(rows)
}

fn build_tabix_rows(path: &std::path::Path) -> Result<Vec<HeaderRow>> {
    let file = std::fs::File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|e| e == "gz" || e == "bgz") {
        Box::new(std::io::BufReader::new(noodles::bgzf::Reader::new(file)))
    } else {
        Box::new(std::io::BufReader::new(file))
    };

    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            break;
        }
        rows.push(HeaderRow {
            record_type: "META".to_string(),
            id: None,
            number: None,
            value_type: None,
            length: None,
            description: None,
            idx: None,
            key_values: IndexMap::new(),
            raw: line,
        });
    }
    Ok(rows)
}
