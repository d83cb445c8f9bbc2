// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! FASTA reader: sequential read, or index-backed region fetch, plus
//! the standalone `fasta_index` index-building table function.

use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk::{self, DEFAULT_VECTOR_SIZE};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

enum Source {
    Sequential(noodles::fasta::io::Reader<Box<dyn std::io::BufRead>>),
    Regions {
        reader: noodles::fasta::io::IndexedReader<std::io::BufReader<std::fs::File>>,
        regions: Vec<String>,
        next: usize,
    },
}

pub struct BindState {
    path: PathBuf,
    regions: Vec<String>,
    index_path: Option<PathBuf>,
}

pub struct FastaReader;

impl crate::scan::Reader for FastaReader {
    type BindState = BindState;
    type GlobalState = ();
    type LocalState = Source;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let region = options::named_text(bind, "region");
        let index_path = options::named_text(bind, "index_path").map(PathBuf::from);

        let mut schema = Schema::new();
        schema.push("NAME", ColumnType::Scalar(Elementary::Varchar));
        schema.push("DESCRIPTION", ColumnType::Scalar(Elementary::Varchar));
        schema.push("SEQUENCE", ColumnType::Scalar(Elementary::Varchar));
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        let regions = region.as_deref().map(options::split_regions).unwrap_or_default();

        Ok(BindState {
            path,
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
        ])
    }

    fn local_init(bind: &BindState, _global: &(), _projection: Projection) -> Result<Source> {
        if bind.regions.is_empty() {
            let file = std::fs::File::open(&bind.path)?;
            let boxed: Box<dyn std::io::BufRead> = Box::new(std::io::BufReader::new(file));
            Ok(Source::Sequential(noodles::fasta::io::Reader::new(boxed)))
        } else {
            let fai_path = bind
                .index_path
                .clone()
                .unwrap_or_else(|| append(&bind.path, ".fai"));
            let index = noodles::fasta::fai::read(&fai_path)
                .map_err(|e| Error::Htsget(format!("reading {}: {e}", fai_path.display())))?;
            let file = std::fs::File::open(&bind.path)?;
            let reader = noodles::fasta::io::IndexedReader::new(std::io::BufReader::new(file), index);
            Ok(Source::Regions {
                reader,
                regions: bind.regions.clone(),
                next: 0,
            })
        }
    }

    fn scan(
        _bind: &BindState,
        _global: &(),
        local: &mut Source,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let mut row = 0usize;
        while row < DEFAULT_VECTOR_SIZE {
            match local {
                Source::Sequential(reader) => {
                    let mut record = noodles::fasta::Record::default();
                    match reader.read_record(&mut record) {
                        Ok(0) => break,
                        Ok(_) => write_record_row(output, row, &record),
                        Err(e) => return Err(Error::Htsget(e.to_string())),
                    }
                }
                Source::Regions { reader, regions, next } => {
                    if *next >= regions.len() {
                        break;
                    }
                    let region: noodles::core::Region = regions[*next]
                        .parse()
                        .map_err(|_| Error::InvalidRegion(regions[*next].clone()))?;
                    *next += 1;
                    let record = reader
                        .query(&region)
                        .map_err(|e| Error::Htsget(format!("fetching {region}: {e}")))?;
                    write_region_row(output, row, region.name(), &record);
                }
            }
            row += 1;
        }
        output.set_len(row);
        Ok(())
    }
}

fn append(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn write_record_row(output: &mut DataChunkHandle, row: usize, record: &noodles::fasta::Record) {
    let name = String::from_utf8_lossy(record.name()).into_owned();
    let description = record
        .description()
        .map(|d| String::from_utf8_lossy(d).into_owned());
    let sequence = String::from_utf8_lossy(record.sequence().as_ref()).into_owned();
    chunk::write_varchar(output, 0, row, Some(&name));
    chunk::write_varchar(output, 1, row, description.as_deref());
    chunk::write_varchar(output, 2, row, Some(&sequence));
}

fn write_region_row(
    output: &mut DataChunkHandle,
    row: usize,
    name: &[u8],
    record: &noodles::fasta::Record,
) {
    let name = String::from_utf8_lossy(name).into_owned();
    let sequence = String::from_utf8_lossy(record.sequence().as_ref()).into_owned();
    chunk::write_varchar(output, 0, row, Some(&name));
    chunk::write_varchar(output, 1, row, None);
    chunk::write_varchar(output, 2, row, Some(&sequence));
}

/// `fasta_index(path, index_path?)`:
/// builds a `.fai` sibling and returns a one-row result.
pub struct FastaIndexBindState {
    path: PathBuf,
    index_path: PathBuf,
}

pub struct FastaIndexReader;

impl crate::scan::Reader for FastaIndexReader {
    type BindState = FastaIndexBindState;
    type GlobalState = ();
    type LocalState = bool;

    fn bind(bind: &BindInfo) -> Result<FastaIndexBindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let index_path = options::named_text(bind, "index_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| append(&path, ".fai"));

        let mut schema = Schema::new();
        schema.push("success", ColumnType::Scalar(Elementary::Boolean));
        schema.push("index_path", ColumnType::Scalar(Elementary::Varchar));
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(FastaIndexBindState { path, index_path })
    }

    fn global_init(_bind: &FastaIndexBindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![(
                    "index_path".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )])
    }

    fn local_init(
        _bind: &FastaIndexBindState,
        _global: &(),
        _projection: Projection,
    ) -> Result<bool> {
        Ok(false)
    }

    fn scan(
        bind: &FastaIndexBindState,
        _global: &(),
        local: &mut bool,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        if *local {
            output.set_len(0);
            return Ok(());
        }
        *local = true;

        let success = build_fai(&bind.path, &bind.index_path).is_ok();
        chunk::write_bool(output, 0, 0, Some(success));
        chunk::write_varchar(output, 1, 0, Some(&bind.index_path.to_string_lossy()));
        output.set_len(1);
        Ok(())
    }
}

fn build_fai(path: &std::path::Path, index_path: &std::path::Path) -> Result<()> {
    let mut reader = noodles::fasta::io::indexer::Indexer::new(std::io::BufReader::new(
            std::fs::File::open(path)?,
    ));
    let mut records = Vec::new();
    while let Some(record) = reader
        .index_record()
        .map_err(|e| Error::Htsget(e.to_string()))?
    {
        records.push(record);
    }
    let index = noodles::fasta::fai::Index::from(records);
    noodles::fasta::fai::write(index_path, &index).map_err(|e| Error::Htsget(e.to_string()))?;
    Ok(())
}
