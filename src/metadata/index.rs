// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `read_hts_index` and the sibling-index probe every other reader
//! uses to decide `has_index` at bind time.

use std::path::{Path, PathBuf};

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk;
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

use super::FormatHint;

/// The conventional sibling-index suffixes this core recognizes, tried in
/// order against the original path (stripped of a trailing `.gz`/`.bgz`
/// where the index convention expects that, e.g. `a.vcf.gz.tbi`).
const SIBLING_SUFFIXES: &[(&str, IndexKind)] = &[
    (".csi", IndexKind::Csi),
    (".tbi", IndexKind::Tbi),
    (".bai", IndexKind::Bai),
    (".crai", IndexKind::Crai),
    (".fai", IndexKind::Fai),
    (".fqi", IndexKind::Fqi),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Bai,
    Csi,
    Tbi,
    Crai,
    Fai,
    Fqi,
    Unknown,
}

impl IndexKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bai => "BAI",
            Self::Csi => "CSI",
            Self::Tbi => "TBI",
            Self::Crai => "CRAI",
            Self::Fai => "FAI",
            Self::Fqi => "FQI",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Resolves the index path for `path`: an explicit `index_path` wins,
/// otherwise the conventional `<path>.<suffix>` sibling is probed.
#[must_use]
pub fn resolve_index_path(path: &Path, index_path: Option<&str>) -> Option<(PathBuf, IndexKind)> {
    if let Some(explicit) = index_path {
        let explicit = PathBuf::from(explicit);
        let kind = SIBLING_SUFFIXES
            .iter()
            .find(|(suffix, _)| explicit.to_string_lossy().ends_with(*suffix))
            .map_or(IndexKind::Unknown, |(_, kind)| *kind);
        return Some((explicit, kind));
    }
    for (suffix, kind) in SIBLING_SUFFIXES {
        let candidate = append_suffix(path, suffix);
        if candidate.is_file() {
            return Some((candidate, *kind));
        }
    }
    None
}

#[must_use]
pub fn sibling_index_exists(path: &Path) -> bool {
    resolve_index_path(path, None).is_some()
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

struct IndexRow {
    seqname: Option<String>,
    tid: Option<i64>,
    length: Option<i64>,
    mapped: Option<i64>,
    unmapped: Option<i64>,
    n_no_coor: Option<i64>,
}

pub struct BindState {
    file_format: String,
    index_path: Option<String>,
    index_type: IndexKind,
    rows: Vec<IndexRow>,
}

pub struct IndexReader;

impl crate::scan::Reader for IndexReader {
    type BindState = BindState;
    type GlobalState = ();
    type LocalState = usize;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let format_hint = options::named_text(bind, "format");
        let index_path_opt = options::named_text(bind, "index_path");

        let format = FormatHint::parse(format_hint.as_deref()).resolve(&path);
        let resolved = resolve_index_path(&path, index_path_opt.as_deref());
        let (index_path, index_type) = match resolved {
            Some((p, k)) => (Some(p.to_string_lossy().into_owned()), k),
            None => (None, IndexKind::Unknown),
        };

        let rows = build_rows(&path, format)?;

        let mut schema = Schema::new();
        schema.push("file_format", ColumnType::Scalar(Elementary::Varchar));
        schema.push("seqname", ColumnType::Scalar(Elementary::Varchar));
        schema.push("tid", ColumnType::Scalar(Elementary::BigInt));
        schema.push("length", ColumnType::Scalar(Elementary::BigInt));
        schema.push("mapped", ColumnType::Scalar(Elementary::BigInt));
        schema.push("unmapped", ColumnType::Scalar(Elementary::BigInt));
        schema.push("n_no_coor", ColumnType::Scalar(Elementary::BigInt));
        schema.push("index_type", ColumnType::Scalar(Elementary::Varchar));
        schema.push("index_path", ColumnType::Scalar(Elementary::Varchar));
        schema.push("meta", ColumnType::Scalar(Elementary::Blob));
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(BindState {
            file_format: format_label(format).to_string(),
            index_path,
            index_type,
            rows,
        })
    }

    fn global_init(_bind: &BindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
                ("format".to_string(), LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                (
                    "index_path".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
        ])
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
        while *local < bind.rows.len() && row < chunk::DEFAULT_VECTOR_SIZE {
            let r = &bind.rows[*local];
            chunk::write_varchar(output, 0, row, Some(&bind.file_format));
            chunk::write_varchar(output, 1, row, r.seqname.as_deref());
            chunk::write_i64(output, 2, row, r.tid);
            chunk::write_i64(output, 3, row, r.length);
            chunk::write_i64(output, 4, row, r.mapped);
            chunk::write_i64(output, 5, row, r.unmapped);
            chunk::write_i64(output, 6, row, r.n_no_coor);
            chunk::write_varchar(output, 7, row, Some(bind.index_type.as_str()));
            chunk::write_varchar(output, 8, row, bind.index_path.as_deref());
            chunk::write_blob(output, 9, row, None);
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

/// Builds one row per reference sequence. VCF/BCF report `length = NULL`
/// and `n_no_coor = NULL`; BAM/SAM/CRAM report per-tid mapped/
/// unmapped counts when the sibling BAI/CSI carries them; FASTA/FASTQ
/// report sequence length only.
fn build_rows(path: &Path, format: FormatHint) -> Result<Vec<IndexRow>> {
    match format {
        FormatHint::Vcf | FormatHint::Bcf => {
            let mut reader = noodles::vcf::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            let header = reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(header
                .contigs()
                .iter()
                .enumerate()
                .map(|(tid, (name, contig))| IndexRow {
                        seqname: Some(name.to_string()),
                        tid: Some(tid as i64),
                        length: contig.length().map(|l| l as i64),
                        mapped: None,
                        unmapped: None,
                        n_no_coor: None,
                })
                    .collect())
        }
        FormatHint::Fasta => {
            let fai_path = append_suffix(path, ".fai");
            if !fai_path.is_file() {
                return Ok(Vec::new());
            }
            let index = noodles::fasta::fai::read(&fai_path).map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(index
                .into_iter()
                .enumerate()
                .map(|(tid, record)| IndexRow {
                        seqname: Some(String::from_utf8_lossy(record.name()).into_owned()),
                        tid: Some(tid as i64),
                        length: Some(record.length() as i64),
                        mapped: None,
                        unmapped: None,
                        n_no_coor: None,
                })
                    .collect())
        }
        FormatHint::Sam | FormatHint::Bam | FormatHint::Cram => {
            let header = read_alignment_header(path, format)?;
            let (per_reference, n_no_coor) = load_bai_stats(path).unwrap_or_default();
            Ok(header
                .reference_sequences()
                .iter()
                .enumerate()
                .map(|(tid, (name, seq))| {
                    let (mapped, unmapped) = per_reference.get(tid).copied().unwrap_or((None, None));
                    IndexRow {
                        seqname: Some(name.to_string()),
                        tid: Some(tid as i64),
                        length: Some(seq.length() as i64),
                        mapped,
                        unmapped,
                        n_no_coor,
                    }
                })
                .collect())
        }
        _ => Ok(Vec::new()),
    }
}

fn read_alignment_header(path: &Path, format: FormatHint) -> Result<noodles::sam::Header> {
    match format {
        FormatHint::Bam => {
            let mut reader = noodles::bam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
        FormatHint::Cram => {
            let mut reader = noodles::cram::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
        _ => {
            let mut reader = noodles::sam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
    }
}

/// Per-reference `mapped`/`unmapped` record counts and the file-wide
/// `n_no_coor` count, read from a sibling BAI when present. A sibling CSI
/// or CRAI (or no index at all) yields `None` for every row rather than
/// scanning the whole file to recompute the counts.
fn load_bai_stats(path: &Path) -> Option<(Vec<(Option<i64>, Option<i64>)>, Option<i64>)> {
    let bai_path = append_suffix(path, ".bai");
    if !bai_path.is_file() {
        return None;
    }
    let index = noodles::bam::bai::read(&bai_path).ok()?;
    let per_reference = index
        .reference_sequences()
        .iter()
        .map(|rs| {
            rs.metadata()
                .map(|m| (Some(m.mapped_record_count() as i64), Some(m.unmapped_record_count() as i64)))
                .unwrap_or((None, None))
        })
        .collect();
    let n_no_coor = index.unplaced_unmapped_record_count().map(|n| n as i64);
    Some((per_reference, n_no_coor))
}
