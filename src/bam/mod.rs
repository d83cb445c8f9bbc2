// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! BAM/SAM/CRAM reader: 13 fixed core columns, optional typed
//! standard-tag columns, and an optional auxiliary-tag spillover map.

pub mod decode;
pub mod tags;

use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;
use indexmap::IndexMap;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record::Record as AlignmentRecord;
use noodles::sam::Header;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk::{self, ListOffsets, DEFAULT_VECTOR_SIZE};
use crate::scan::contig::{self, ContigClaimer};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

const CORE_COLUMN_COUNT: usize = 13;

enum FileKind {
    Sam,
    Bam,
    Cram,
}

enum RecordSource {
    Sam(noodles::sam::io::Reader<Box<dyn std::io::BufRead>>),
    Bam(noodles::bam::io::Reader<noodles::bgzf::Reader<std::fs::File>>),
    Cram(noodles::cram::io::Reader<std::fs::File>),
    Query(Box<dyn Iterator<Item = std::io::Result<Box<dyn AlignmentRecord>>>>),
    Contigs {
        path: PathBuf,
        kind: FileKind,
        claimer_ref: &'static ContigClaimer,
        cursor: Option<Box<dyn Iterator<Item = std::io::Result<Box<dyn AlignmentRecord>>>>>,
    },
}

pub struct BindState {
    path: PathBuf,
    header: Header,
    schema: Schema,
    standard_tags: bool,
    auxiliary_tags: bool,
    standard_tag_columns: Vec<(Tag, usize)>,
    aux_map_column: Option<usize>,
    regions: Vec<String>,
    contig_names: Vec<String>,
    has_index: bool,
}

pub struct GlobalState {
    claimer: ContigClaimer,
}

pub struct LocalState {
    header: Header,
    source: RecordSource,
    projection: Projection,
    /// Amortizes the `@RG ID -> SM` header lookup across consecutive reads
    /// sharing the same read group.
    rg_cache: Option<(String, Option<String>)>,
}

pub struct BamReader;

impl crate::scan::Reader for BamReader {
    type BindState = BindState;
    type GlobalState = GlobalState;
    type LocalState = LocalState;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let region = options::named_text(bind, "region");
        let standard_tags = options::named_bool(bind, "standard_tags", false);
        let auxiliary_tags = options::named_bool(bind, "auxiliary_tags", false);

        let kind = file_kind(&path);
        let header = read_header(&path, &kind)?;
        let contig_names: Vec<String> = header
            .reference_sequences()
            .keys()
            .map(ToString::to_string)
            .collect();
        let has_index = crate::metadata::index::sibling_index_exists(&path);

        let mut schema = Schema::new();
        schema.push("QNAME", ColumnType::Scalar(Elementary::Varchar));
        schema.push("FLAG", ColumnType::Scalar(Elementary::USmallInt));
        schema.push("RNAME", ColumnType::Scalar(Elementary::Varchar));
        schema.push("POS", ColumnType::Scalar(Elementary::BigInt));
        schema.push("MAPQ", ColumnType::Scalar(Elementary::Integer));
        schema.push("CIGAR", ColumnType::Scalar(Elementary::Varchar));
        schema.push("RNEXT", ColumnType::Scalar(Elementary::Varchar));
        schema.push("PNEXT", ColumnType::Scalar(Elementary::BigInt));
        schema.push("TLEN", ColumnType::Scalar(Elementary::BigInt));
        schema.push("SEQ", ColumnType::Scalar(Elementary::Varchar));
        schema.push("QUAL", ColumnType::Scalar(Elementary::Varchar));
        schema.push("READ_GROUP_ID", ColumnType::Scalar(Elementary::Varchar));
        schema.push("SAMPLE_ID", ColumnType::Scalar(Elementary::Varchar));
        debug_assert_eq!(schema.len(), CORE_COLUMN_COUNT);

        let mut standard_tag_columns = Vec::new();
        if standard_tags {
            for entry in tags::STANDARD_TAGS {
                let idx = schema.push(tags::tag_name(entry.tag), entry.kind.column_type());
                standard_tag_columns.push((Tag::from(entry.tag), idx));
            }
        }

        let aux_map_column = if auxiliary_tags {
            Some(schema.push("AUXILIARY_TAGS", ColumnType::MapVarcharVarchar))
        } else {
            None
        };

        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        let regions = region
            .as_deref()
            .map(options::split_regions)
            .unwrap_or_default();
        if !regions.is_empty() && !has_index {
            return Err(Error::InvalidRegion(
                    "region requested but no sibling index was found".to_string(),
            ));
        }

        Ok(BindState {
            path,
            header,
            schema,
            standard_tags,
            auxiliary_tags,
            standard_tag_columns,
            aux_map_column,
            regions,
            contig_names,
            has_index,
        })
    }

    fn global_init(bind: &BindState) -> Result<GlobalState> {
        Ok(GlobalState {
            claimer: ContigClaimer::new(bind.contig_names.clone()),
        })
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
                ("region".to_string(), LogicalTypeHandle::from(LogicalTypeId::Varchar)),
                (
                    "index_path".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
                (
                    "reference".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
                (
                    "standard_tags".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Boolean),
                ),
                (
                    "auxiliary_tags".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Boolean),
                ),
        ])
    }

    fn max_threads(bind: &BindState) -> usize {
        contig::max_threads(bind.has_index, bind.contig_names.len(), !bind.regions.is_empty())
    }

    fn local_init(
        bind: &BindState,
        global: &GlobalState,
        projection: Projection,
    ) -> Result<LocalState> {
        let kind = file_kind(&bind.path);
        let source = if !bind.regions.is_empty() {
            RecordSource::Query(open_region_query(&bind.path, &kind, &bind.header, &bind.regions)?)
        } else if global.claimer.n_contigs() > 1 && bind.has_index {
            let claimer_ref: &'static ContigClaimer =
            unsafe { std::mem::transmute::<&ContigClaimer, &'static ContigClaimer>(&global.claimer) };
            RecordSource::Contigs {
                path: bind.path.clone(),
                kind,
                claimer_ref,
                cursor: None,
            }
        } else {
            open_sequential(&bind.path, kind)?
        };

        Ok(LocalState {
            header: bind.header.clone(),
            source,
            projection,
            rg_cache: None,
        })
    }

    fn scan(
        bind: &BindState,
        _global: &GlobalState,
        local: &mut LocalState,
        output: &mut DataChunkHandle,
    ) -> Result<()> {
        let mut row = 0usize;
        let mut offsets = ListOffsets::new();

        while row < DEFAULT_VECTOR_SIZE {
            let Some(record) = next_record(&mut local.source, &local.header)? else {
                break;
            };
            write_row(bind, local, record.as_ref(), output, row, &mut offsets)?;
            row += 1;
        }

        output.set_len(row);
        Ok(())
    }
}

fn file_kind(path: &std::path::Path) -> FileKind {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let stem = name.strip_suffix(".gz").or_else(|| name.strip_suffix(".bgz")).unwrap_or(name);
    if stem.ends_with(".cram") {
        FileKind::Cram
    } else if stem.ends_with(".bam") {
        FileKind::Bam
    } else {
        FileKind::Sam
    }
}

fn read_header(path: &std::path::Path, kind: &FileKind) -> Result<Header> {
    match kind {
        FileKind::Bam => {
            let mut reader = noodles::bam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
        FileKind::Cram => {
            let mut reader = noodles::cram::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
        FileKind::Sam => {
            let mut reader = noodles::sam::io::reader::Builder::default()
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))
        }
    }
}

fn open_sequential(path: &std::path::Path, kind: FileKind) -> Result<RecordSource> {
    match kind {
        FileKind::Bam => {
            let file = std::fs::File::open(path)?;
            let mut reader = noodles::bam::io::Reader::new(noodles::bgzf::Reader::new(file));
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(RecordSource::Bam(reader))
        }
        FileKind::Cram => {
            let file = std::fs::File::open(path)?;
            let mut reader = noodles::cram::io::Reader::new(file);
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(RecordSource::Cram(reader))
        }
        FileKind::Sam => {
            let file = std::fs::File::open(path)?;
            let boxed: Box<dyn std::io::BufRead> = Box::new(std::io::BufReader::new(file));
            let mut reader = noodles::sam::io::Reader::new(boxed);
            reader.read_header().map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(RecordSource::Sam(reader))
        }
    }
}

fn open_region_query(
    path: &std::path::Path,
    kind: &FileKind,
    header: &Header,
    regions: &[String],
) -> Result<Box<dyn Iterator<Item = std::io::Result<Box<dyn AlignmentRecord>>>>> {
    let parsed: Vec<noodles::core::Region> = regions
        .iter()
        .map(|r| r.parse().map_err(|_| Error::InvalidRegion(r.clone())))
        .collect::<Result<_>>()?;

    match kind {
        FileKind::Bam => {
            let index = noodles::bam::bai::read(append(path, ".bai")).map_err(|e| Error::Htsget(e.to_string()))?;
            let mut reader = noodles::bam::io::indexed_reader::Builder::default()
                .set_index(index)
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            let chained = reader.query_multiple(header, &parsed).map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(Box::new(chained))
        }
        FileKind::Cram => {
            let index = noodles::cram::crai::read(append(path, ".crai")).map_err(|e| Error::Htsget(e.to_string()))?;
            let mut reader = noodles::cram::io::indexed_reader::Builder::default()
                .set_index(index)
                .build_from_path(path)
                .map_err(|e| Error::Htsget(e.to_string()))?;
            let chained = reader.query_multiple(header, &parsed).map_err(|e| Error::Htsget(e.to_string()))?;
            Ok(Box::new(chained))
        }
        FileKind::Sam => Err(Error::InvalidRegion(
                "region queries require an indexed BAM or CRAM file".to_string(),
        )),
    }
}

fn append(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn next_record(
    source: &mut RecordSource,
    header: &Header,
) -> Result<Option<Box<dyn AlignmentRecord>>> {
    loop {
        match source {
            RecordSource::Sam(reader) => {
                let mut record = noodles::sam::Record::default();
                match reader.read_record(header, &mut record).map_err(|e| Error::Htsget(e.to_string()))? {
                    0 => return Ok(None),
                    _ => return Ok(Some(Box::new(record))),
                }
            }
            RecordSource::Bam(reader) => {
                let mut record = noodles::bam::Record::default();
                match reader.read_record(&mut record).map_err(|e| Error::Htsget(e.to_string()))? {
                    0 => return Ok(None),
                    _ => return Ok(Some(Box::new(record))),
                }
            }
            RecordSource::Cram(reader) => match reader.read_record(header).map_err(|e| Error::Htsget(e.to_string()))? {
                Some(record) => return Ok(Some(Box::new(record))),
                None => return Ok(None),
            },
            RecordSource::Query(iter) => match iter.next() {
                Some(result) => return Ok(Some(result.map_err(|e| Error::Htsget(e.to_string()))?)),
                None => return Ok(None),
            },
            RecordSource::Contigs { path, kind, claimer_ref, cursor } => {
                if cursor.is_none() {
                    let Some(tid) = claimer_ref.claim_next() else {
                        return Ok(None);
                    };
                    let Some(name) = claimer_ref.name(tid) else {
                        log::warn!("claimed contig index {tid} out of range, skipping");
                        continue;
                    };
                    let name = name.to_string();
                    match open_region_query(path, kind, header, std::slice::from_ref(&name)) {
                        Ok(query) => *cursor = Some(query),
                        Err(e) => {
                            log::warn!("{name}: failed to construct contig iterator ({e}); skipping contig");
                            continue;
                        }
                    }
                }
                match cursor.as_mut().unwrap().next() {
                    Some(result) => {
                        return Ok(Some(result.map_err(|e| Error::Htsget(e.to_string()))?));
                    }
                    None => {
                        *cursor = None;
                        continue;
                    }
                }
            }
        }
    }
}

fn write_row(
    bind: &BindState,
    local: &mut LocalState,
    record: &dyn AlignmentRecord,
    output: &mut DataChunkHandle,
    row: usize,
    offsets: &mut ListOffsets,
) -> Result<()> {
    let header = &local.header;

    let qname = record
        .name()
        .map(|n| Ok::<_, Error>(String::from_utf8_lossy(n.as_ref()).into_owned()))
        .transpose()?;
    chunk::write_varchar(output, 0, row, qname.as_deref());

    let flags = record.flags().map_err(|e| Error::Htsget(e.to_string()))?;
    chunk::write_u16(output, 1, row, Some(flags.bits()));

    let rname = record
        .reference_sequence_id(header)
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .and_then(|id| header.reference_sequences().get_index(id).map(|(n, _)| n.to_string()));
    chunk::write_varchar(output, 2, row, rname.as_deref());

    let pos = record
        .alignment_start()
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .map(|p| p.get() as i64)
        .unwrap_or(0);
    chunk::write_i64(output, 3, row, Some(pos));

    let mapq = record
        .mapping_quality()
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .map(|q| i32::from(q.get()));
    chunk::write_i32(output, 4, row, mapq);

    let cigar = decode::format_cigar(record.cigar()).map_err(|e| Error::Htsget(e.to_string()))?;
    chunk::write_varchar(output, 5, row, Some(&cigar));

    let rnext = record
        .mate_reference_sequence_id(header)
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .and_then(|id| header.reference_sequences().get_index(id).map(|(n, _)| n.to_string()));
    chunk::write_varchar(output, 6, row, rnext.as_deref());

    let pnext = record
        .mate_alignment_start()
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .map(|p| p.get() as i64)
        .unwrap_or(0);
    chunk::write_i64(output, 7, row, Some(pnext));

    let tlen = record.template_length().map_err(|e| Error::Htsget(e.to_string()))?;
    chunk::write_i64(output, 8, row, Some(i64::from(tlen)));

    let seq = decode::format_sequence(record.sequence());
    chunk::write_varchar(output, 9, row, Some(&seq));

    let qual = decode::format_quality_scores(record.quality_scores());
    chunk::write_varchar(output, 10, row, qual.as_deref());

    let data = record.data();
    let rg_value = data
        .iter()
        .find(|r| r.as_ref().ok().map(|(tag, _)| *tag == Tag::READ_GROUP).unwrap_or(false))
        .and_then(|r| r.ok())
        .and_then(|(_, value)| match value {
            noodles::sam::alignment::record::data::field::Value::String(s) => Some(s.to_string()),
            _ => None,
    });
    chunk::write_varchar(output, 11, row, rg_value.as_deref());

    let sample_id = rg_value.as_ref().and_then(|rg| sample_for_read_group(bind, local, rg));
    chunk::write_varchar(output, 12, row, sample_id.as_deref());

    for (tag, col) in &bind.standard_tag_columns {
        let value = data.iter().find(|r| r.as_ref().ok().map(|(t, _)| t == tag).unwrap_or(false)).and_then(|r| r.ok()).map(|(_, v)| v);
        write_standard_tag(output, *col, row, value.as_ref(), offsets);
    }

    if let Some(col) = bind.aux_map_column {
        let known: Vec<Tag> = bind.standard_tag_columns.iter().map(|(t, _)| *t).collect();
        let mut map = IndexMap::new();
        for result in data.iter() {
            let (tag, value) = result.map_err(|e| Error::Htsget(e.to_string()))?;
            if tag == Tag::READ_GROUP || known.contains(&tag) {
                continue;
            }
            map.insert(
                String::from_utf8_lossy(&<[u8; 2]>::from(tag)).into_owned(),
                decode::format_aux_value(&value),
            );
        }
        let off = offsets.next(col);
        let kv = if map.is_empty() { None } else { Some(&map) };
        let off = chunk::write_map_varchar_varchar(output, col, row, off, kv);
        offsets.advance_to(col, off);
    }

    Ok(())
}

fn sample_for_read_group(bind: &BindState, local: &mut LocalState, rg: &str) -> Option<String> {
    if let Some((cached_rg, sample)) = &local.rg_cache {
        if cached_rg == rg {
            return sample.clone();
        }
    }
    let sample = bind
        .header
        .read_groups()
        .get(rg.as_bytes())
        .and_then(|record| record.sample_name())
        .map(|s| String::from_utf8_lossy(s).into_owned());
    local.rg_cache = Some((rg.to_string(), sample.clone()));
    sample
}

fn write_standard_tag(
    output: &mut DataChunkHandle,
    col: usize,
    row: usize,
    value: Option<&noodles::sam::alignment::record::data::field::Value>,
    offsets: &mut ListOffsets,
) {
    use noodles::sam::alignment::record::data::field::Value;
    match value {
        None => chunk::write_varchar(output, col, row, None),
        Some(Value::Character(c)) => {
            let s = (*c as char).to_string();
            chunk::write_varchar(output, col, row, Some(&s));
        }
        Some(Value::String(s)) => chunk::write_varchar(output, col, row, Some(s.as_ref())),
        Some(Value::Hex(s)) => chunk::write_varchar(output, col, row, Some(s.as_ref())),
        Some(Value::Int32(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::UInt8(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::Int8(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::UInt16(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::Int16(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::UInt32(n)) => chunk::write_i64(output, col, row, Some(i64::from(*n))),
        Some(Value::Float(n)) => chunk::write_f64(output, col, row, Some(f64::from(*n))),
        Some(Value::Array(array)) => {
            use noodles::sam::alignment::record::data::field::value::Array;
            let off = offsets.next(col);
            match array {
                Array::Float(items) => {
                    let values: Vec<f64> = items.iter().flatten().map(f64::from).collect();
                    let off = chunk::write_list_f64(output, col, row, off, Some(values.as_slice()));
                    offsets.advance_to(col, off);
                }
                _ => {
                    let values: Vec<i64> = match array {
                        Array::Int8(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::UInt8(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::Int16(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::UInt16(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::Int32(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::UInt32(v) => v.iter().flatten().map(i64::from).collect(),
                        Array::Float(_) => unreachable!(),
                    };
                    let off = chunk::write_list_i64(output, col, row, off, Some(values.as_slice()));
                    offsets.advance_to(col, off);
                }
            }
        }
    }
}
