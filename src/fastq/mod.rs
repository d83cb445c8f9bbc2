// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! FASTQ reader: sequential read, with `mate_path` or `interleaved`
//! pairing semantics layered on top.

use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk::{self, DEFAULT_VECTOR_SIZE};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pairing {
    None,
    MatePath,
    Interleaved,
}

pub struct BindState {
    path: PathBuf,
    mate_path: Option<PathBuf>,
    pairing: Pairing,
}

fn open(path: &std::path::Path) -> Result<noodles::fastq::io::Reader<Box<dyn std::io::BufRead>>> {
    let file = std::fs::File::open(path)?;
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let boxed: Box<dyn std::io::BufRead> = if name.ends_with(".bgz") {
        Box::new(std::io::BufReader::new(noodles::bgzf::Reader::new(file)))
    } else if name.ends_with(".gz") {
        Box::new(std::io::BufReader::new(flate2::read::MultiGzDecoder::new(file)))
    } else {
        Box::new(std::io::BufReader::new(file))
    };
    Ok(noodles::fastq::io::Reader::new(boxed))
}

pub struct LocalState {
    primary: noodles::fastq::io::Reader<Box<dyn std::io::BufRead>>,
    mate: Option<noodles::fastq::io::Reader<Box<dyn std::io::BufRead>>>,
    pairing: Pairing,
    /// `interleaved` mode tracks whether the next record read is mate 1 or
    /// mate 2 of the current pair.
    next_mate: u8,
    /// A mate record already read from disk but not yet written, because the
    /// chunk filled up right after its primary was emitted.
    pending_mate: Option<noodles::fastq::Record>,
}

pub struct FastqReader;

impl crate::scan::Reader for FastqReader {
    type BindState = BindState;
    type GlobalState = ();
    type LocalState = LocalState;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let mate_path = options::named_text(bind, "mate_path").map(PathBuf::from);
        let interleaved = options::named_bool(bind, "interleaved", false);

        options::require_not_both(mate_path.is_some(), "mate_path", interleaved, "interleaved")?;

        let pairing = if mate_path.is_some() {
            Pairing::MatePath
        } else if interleaved {
            Pairing::Interleaved
        } else {
            Pairing::None
        };

        let mut schema = Schema::new();
        schema.push("NAME", ColumnType::Scalar(Elementary::Varchar));
        schema.push("DESCRIPTION", ColumnType::Scalar(Elementary::Varchar));
        schema.push("SEQUENCE", ColumnType::Scalar(Elementary::Varchar));
        schema.push("QUALITY", ColumnType::Scalar(Elementary::Varchar));
        if pairing != Pairing::None {
            schema.push("MATE", ColumnType::Scalar(Elementary::USmallInt));
            schema.push("PAIR_ID", ColumnType::Scalar(Elementary::Varchar));
        }
        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        Ok(BindState {
            path,
            mate_path,
            pairing,
        })
    }

    fn global_init(_bind: &BindState) -> Result<()> {
        Ok(())
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
                (
                    "mate_path".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
                (
                    "interleaved".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Boolean),
                ),
        ])
    }

    fn local_init(bind: &BindState, _global: &(), _projection: Projection) -> Result<LocalState> {
        let primary = open(&bind.path)?;
        let mate = match &bind.mate_path {
            Some(p) => Some(open(p)?),
            None => None,
        };
        Ok(LocalState {
            primary,
            mate,
            pairing: bind.pairing,
            next_mate: 1,
            pending_mate: None,
        })
    }

    fn scan(
        bind: &BindState,
        _global: &(),
        local: &mut LocalState,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let mut row = 0usize;

        if let Some(m) = local.pending_mate.take() {
            write_row(output, row, &m, Some(2));
            row += 1;
        }

        while row < DEFAULT_VECTOR_SIZE {
            match local.pairing {
                Pairing::None => {
                    let Some(record) = read_one(&mut local.primary)? else { break };
                    write_row(output, row, &record, None);
                }
                Pairing::MatePath => {
                    let primary = read_one(&mut local.primary)?;
                    let mate = read_one(local.mate.as_mut().expect("mate_path implies mate reader"))?;
                    match (primary, mate) {
                        (None, None) => break,
                        (Some(_), None) | (None, Some(_)) => {
                            return Err(Error::PairingFailure(
                                    "mate_path streams fell out of sync (unbalanced EOF)".to_string(),
                            ));
                        }
                        (Some(p), Some(m)) => {
                            if p.name() != m.name() {
                                return Err(Error::PairingFailure(format!(
                                            "QNAME mismatch between primary and mate: {:?} != {:?}",
                                            String::from_utf8_lossy(p.name()),
                                            String::from_utf8_lossy(m.name()),
                                )));
                            }
                            write_row(output, row, &p, Some(1));
                            row += 1;
                            if row >= DEFAULT_VECTOR_SIZE {
                                local.pending_mate = Some(m);
                                break;
                            }
                            write_row(output, row, &m, Some(2));
                        }
                    }
                }
                Pairing::Interleaved => {
                    let Some(record) = read_one(&mut local.primary)? else {
                        if local.next_mate == 2 {
                            return Err(Error::PairingFailure(
                                    "interleaved file has an unpaired record".to_string(),
                            ));
                        }
                        break;
                    };
                    write_row(output, row, &record, Some(local.next_mate));
                    local.next_mate = if local.next_mate == 1 { 2 } else { 1 };
                }
            }
            row += 1;
        }
        let _ = bind;
        output.set_len(row);
        Ok(())
    }
}

fn read_one(
    reader: &mut noodles::fastq::io::Reader<Box<dyn std::io::BufRead>>,
) -> Result<Option<noodles::fastq::Record>> {
    let mut record = noodles::fastq::Record::default();
    match reader.read_record(&mut record) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(record)),
        Err(e) => Err(Error::Htsget(e.to_string())),
    }
}

fn pair_id(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    name.strip_suffix("/1")
        .or_else(|| name.strip_suffix("/2"))
        .unwrap_or(&name)
        .to_string()
}

fn write_row(output: &mut DataChunkHandle, row: usize, record: &noodles::fastq::Record, mate: Option<u16>) {
    let name = String::from_utf8_lossy(record.name()).into_owned();
    let description = record
        .description()
        .and_then(|d| if d.is_empty() { None } else { Some(d) })
        .map(|d| String::from_utf8_lossy(d).into_owned());
    let sequence = String::from_utf8_lossy(record.sequence()).into_owned();
    let quality_scores = record.quality_scores();
    let quality = if quality_scores.is_empty() || quality_scores.iter().all(|&q| q == 0xFF) {
        None
    } else {
        Some(quality_scores.iter().map(|&q| (q) as char).collect::<String>())
    };

    chunk::write_varchar(output, 0, row, Some(&name));
    chunk::write_varchar(output, 1, row, description.as_deref());
    chunk::write_varchar(output, 2, row, Some(&sequence));
    chunk::write_varchar(output, 3, row, quality.as_deref());

    if let Some(mate) = mate {
        chunk::write_u16(output, 4, row, Some(mate));
        let pid = pair_id(record.name());
        chunk::write_varchar(output, 5, row, Some(&pid));
    }
}
