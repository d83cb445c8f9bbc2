// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! BCF/VCF reader: bind derives the
//! fixed output schema (core columns, VEP columns if present, INFO columns,
//! FORMAT columns in wide or tidy shape); global-init decides contig-level
//! parallelism; local-init opens a private handle and captures the
//! projection; scan fills one chunk at a time, skipping any sub-decode the
//! projection does not need.

pub mod genotype;
pub mod schema;
pub mod spec_table;
pub mod vep;

use std::path::PathBuf;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use noodles::vcf::variant::record::info::field::value::Value as InfoValue;
use noodles::vcf::variant::record::info::field::value::Array as InfoArray;
use noodles::vcf::variant::record::samples::series::value::Value as SampleValue;
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record::{
    AlternateBases as _, Filters as _, Ids as _, Info as _, Samples as _,
};
use noodles::vcf::variant::record::samples::Sample as _;
use noodles::vcf::variant::Record as VariantRecord;
use noodles::vcf::Header;
use noodles_util::variant;

use crate::error::{Error, Result};
use crate::options;
use crate::scan::chunk::{self, ListOffsets, DEFAULT_VECTOR_SIZE};
use crate::scan::contig::{self, ContigClaimer};
use crate::scan::projection::Projection;
use crate::types::{ColumnType, Elementary, Schema};

use genotype::{decode_genotype, Allele};
use schema::{derive_format_fields, derive_info_fields, FieldMeta, ValueKind};
use vep::{derive_vep_schema, parse_transcripts, VepSchema};

const COL_CHROM: usize = 0;
const COL_POS: usize = 1;
const COL_ID: usize = 2;
const COL_REF: usize = 3;
const COL_ALT: usize = 4;
const COL_QUAL: usize = 5;
const COL_FILTER: usize = 6;
const CORE_COLUMN_COUNT: usize = 7;

/// Where the VEP subfield columns start, if any VEP-style INFO field was
/// declared in the header.
struct VepColumns {
    schema: VepSchema,
    start_column: usize,
}

/// Where each sample's FORMAT values land: one block of columns per sample
/// in declared order (wide shape), or a single shared block plus a
/// `SAMPLE_ID` column emitted once per sample row (tidy shape).
enum FormatLayout {
    Wide {
        /// `format_fields[i].output_column` offset for sample `s` is
        /// `base + s * format_fields.len() + i`.
        base: usize,
    },
    Tidy {
        sample_id_column: usize,
        base: usize,
    },
}

pub struct BindState {
    path: PathBuf,
    header: Header,
    schema: Schema,
    vep: Option<VepColumns>,
    info_fields: Vec<FieldMeta>,
    format_fields: Vec<FieldMeta>,
    format_layout: Option<FormatLayout>,
    sample_names: Vec<String>,
    tidy_format: bool,
    regions: Vec<String>,
    contig_names: Vec<String>,
    has_index: bool,
}

pub struct GlobalState {
    claimer: ContigClaimer,
}

enum RecordSource {
    Sequential(variant::io::Reader<Box<dyn std::io::BufRead>>),
    Regions {
        reader: Box<variant::io::IndexedReader<std::fs::File>>,
        regions: Vec<String>,
        current: usize,
        cursor: Option<Box<dyn Iterator<Item = std::io::Result<Box<dyn VariantRecord>>>>>,
    },
    Contigs {
        path: PathBuf,
        claimer_ref: &'static ContigClaimer,
        cursor: Option<Box<dyn Iterator<Item = std::io::Result<Box<dyn VariantRecord>>>>>,
    },
}

/// One record's already-decoded sample block, staged so a tidy-shaped scan
/// can resume mid-record across chunk boundaries.
struct PendingTidyRows {
    common: CommonValues,
    samples: Vec<SampleBlock>,
    next_sample: usize,
}

struct CommonValues {
    chrom: String,
    pos: i64,
    id: Option<String>,
    reference: String,
    alt: Vec<Option<String>>,
    qual: Option<f64>,
    filters: Vec<Option<String>>,
    info: Vec<Decoded>,
    vep_rows: Option<Vec<vep::TranscriptRow>>,
}

struct SampleBlock {
    name: String,
    values: Vec<Decoded>,
}

/// A normalized, type-erased decode of one INFO/FORMAT field's value,
/// already shaped (scalar vs. list) per its [`FieldMeta::arity`].
enum Decoded {
    Int(Option<i64>),
    IntList(Vec<Option<i64>>),
    Float(Option<f64>),
    FloatList(Vec<Option<f64>>),
    Flag(bool),
    Text(Option<String>),
    TextList(Vec<Option<String>>),
    Genotype(Option<String>),
}

pub struct LocalState {
    header: Header,
    source: RecordSource,
    projection: Projection,
    pending: Option<PendingTidyRows>,
}

pub struct VcfReader;

impl crate::scan::Reader for VcfReader {
    type BindState = BindState;
    type GlobalState = GlobalState;
    type LocalState = LocalState;

    fn bind(bind: &BindInfo) -> Result<BindState> {
        let path = PathBuf::from(options::positional_text(bind, 0));
        let region = options::named_text(bind, "region");
        let tidy_format = options::named_bool(bind, "tidy_format", false);

        let mut builder = variant::io::reader::Builder::default();
        let mut reader = builder
            .build_from_path(&path)
            .map_err(|e| Error::Htsget(format!("opening {}: {e}", path.display())))?;
        let header = reader
            .read_header()
            .map_err(|e| Error::Htsget(format!("reading header of {}: {e}", path.display())))?;

        let contig_names: Vec<String> = header
            .contigs()
            .keys()
            .map(ToString::to_string)
            .collect();
        let has_index = crate::metadata::index::sibling_index_exists(&path);

        let mut schema = Schema::new();
        schema.push("CHROM", ColumnType::Scalar(Elementary::Varchar));
        schema.push("POS", ColumnType::Scalar(Elementary::BigInt));
        schema.push("ID", ColumnType::Scalar(Elementary::Varchar));
        schema.push("REF", ColumnType::Scalar(Elementary::Varchar));
        schema.push("ALT", ColumnType::List(Elementary::Varchar));
        schema.push("QUAL", ColumnType::Scalar(Elementary::Double));
        schema.push("FILTER", ColumnType::List(Elementary::Varchar));
        debug_assert_eq!(schema.len(), CORE_COLUMN_COUNT);

        let vep = derive_vep_schema(&header).map(|vep_schema| {
                let start_column = schema.len();
                for field in &vep_schema.fields {
                    schema.push(
                        vep_schema.column_name(field),
                        ColumnType::List(elementary_for(field.ty)),
                    );
                }
                VepColumns {
                    schema: vep_schema,
                    start_column,
                }
        });

        let info_fields = derive_info_fields(&header, schema.len());
        for field in &info_fields {
            let ty = info_column_type(field);
            schema.push(field.column_name("INFO"), ty);
        }

        let format_fields = derive_format_fields(&header);
        let sample_names: Vec<String> = header.sample_names().iter().cloned().collect();

        let format_layout = if sample_names.is_empty() || format_fields.is_empty() {
            None
        } else if tidy_format {
            let sample_id_column = schema.push("SAMPLE_ID", ColumnType::Scalar(Elementary::Varchar));
            let base = schema.len();
            for field in &format_fields {
                schema.push(field.column_name("FORMAT"), format_column_type(field));
            }
            Some(FormatLayout::Tidy {
                sample_id_column,
                base,
            })
        } else {
            let base = schema.len();
            for sample in &sample_names {
                for field in &format_fields {
                    let name = format!("FORMAT_{}_{sample}", field.name);
                    schema.push(name, format_column_type(field));
                }
            }
            Some(FormatLayout::Wide { base })
        };

        for spec in schema.columns() {
            bind.add_result_column(&spec.name, spec.ty.to_logical_type());
        }

        let regions = region
            .as_deref()
            .map(options::split_regions)
            .unwrap_or_default();

        Ok(BindState {
            path,
            header,
            schema,
            vep,
            info_fields,
            format_fields,
            format_layout,
            sample_names,
            tidy_format,
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
                (
                    "region".to_string(),
                    LogicalTypeHandle::from(LogicalTypeId::Varchar),
                ),
                (
                    "tidy_format".to_string(),
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
        let source = if !bind.regions.is_empty() {
            let file = std::fs::File::open(&bind.path)?;
            let reader = variant::io::IndexedReader::new(file, &bind.path)
                .map_err(|e| Error::Htsget(format!("opening index for {}: {e}", bind.path.display())))?;
            RecordSource::Regions {
                reader: Box::new(reader),
                regions: bind.regions.clone(),
                current: 0,
                cursor: None,
            }
        } else if global.claimer.n_contigs() > 1 && bind.has_index {
            // Safety of the 'static borrow: the claimer outlives every
            // worker's local state, since it is owned by `BindData`'s
            // `OnceLock` for the whole scan.
            let claimer_ref: &'static ContigClaimer =
            unsafe { std::mem::transmute::<&ContigClaimer, &'static ContigClaimer>(&global.claimer) };
            RecordSource::Contigs {
                path: bind.path.clone(),
                claimer_ref,
                cursor: None,
            }
        } else {
            let mut builder = variant::io::reader::Builder::default();
            let reader = builder
                .build_from_path(&bind.path)
                .map_err(|e| Error::Htsget(format!("opening {}: {e}", bind.path.display())))?;
            RecordSource::Sequential(reader)
        };

        Ok(LocalState {
            header: bind.header.clone(),
            source,
            projection,
            pending: None,
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
            if let Some(mut pending) = local.pending.take() {
                row = emit_tidy_rows(bind, &mut pending, output, row, &mut offsets)?;
                if pending.next_sample < pending.samples.len() {
                    local.pending = Some(pending);
                    break;
                }
                continue;
            }

            let Some(record) = next_record(&mut local.source, &local.header)? else {
                break;
            };

            let common = decode_common(bind, &local.projection, &local.header, record.as_ref())?;

            match &bind.format_layout {
                Some(FormatLayout::Tidy { .. }) if !bind.sample_names.is_empty() => {
                    let samples = decode_samples(bind, &local.projection, &local.header, record.as_ref())?;
                    let mut pending = PendingTidyRows {
                        common,
                        samples,
                        next_sample: 0,
                    };
                    row = emit_tidy_rows(bind, &mut pending, output, row, &mut offsets)?;
                    if pending.next_sample < pending.samples.len() {
                        local.pending = Some(pending);
                        break;
                    }
                }
                _ => {
                    write_common_row(bind, &common, output, row, &mut offsets);
                    if let Some(FormatLayout::Wide { base }) = &bind.format_layout {
                        let samples = decode_samples(bind, &local.projection, &local.header, record.as_ref())?;
                        for (s, sample) in samples.iter().enumerate() {
                            for (i, field) in bind.format_fields.iter().enumerate() {
                                let col = base + s * bind.format_fields.len() + i;
                                write_decoded(output, col, row, &sample.values[i], &mut offsets);
                            }
                        }
                    }
                    row += 1;
                }
            }
        }

        output.set_len(row);
        Ok(())
    }
}

fn elementary_for(ty: ValueKind) -> Elementary {
    match ty {
        ValueKind::Integer => Elementary::BigInt,
        ValueKind::Float => Elementary::Double,
        ValueKind::Flag => Elementary::Boolean,
        ValueKind::Character | ValueKind::String => Elementary::Varchar,
    }
}

fn info_column_type(field: &FieldMeta) -> ColumnType {
    let elem = elementary_for(field.ty);
    if field.arity.is_list() && field.ty != ValueKind::Flag {
        ColumnType::List(elem)
    } else {
        ColumnType::Scalar(elem)
    }
}

fn format_column_type(field: &FieldMeta) -> ColumnType {
    if field.name == "GT" {
        return ColumnType::Scalar(Elementary::Varchar);
    }
    info_column_type(field)
}

fn next_record(
    source: &mut RecordSource,
    header: &Header,
) -> Result<Option<Box<dyn VariantRecord>>> {
    loop {
        match source {
            RecordSource::Sequential(reader) => {
                let mut record = None;
                for result in reader.records(header) {
                    record = Some(result.map_err(|e| Error::Htsget(e.to_string()))?);
                    break;
                }
                return Ok(record);
            }
            RecordSource::Regions {
                reader,
                regions,
                current,
                cursor,
            } => {
                if cursor.is_none() {
                    if *current >= regions.len() {
                        return Ok(None);
                    }
                    let region: noodles::core::Region = regions[*current]
                        .parse()
                        .map_err(|_| Error::InvalidRegion(regions[*current].clone()))?;
                    *current += 1;
                    let query = reader
                        .query(header, &region)
                        .map_err(|e| Error::Htsget(e.to_string()))?;
                    *cursor = Some(Box::new(query));
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
            RecordSource::Contigs {
                path,
                claimer_ref,
                cursor,
            } => {
                if cursor.is_none() {
                    let Some(tid) = claimer_ref.claim_next() else {
                        return Ok(None);
                    };
                    let Some(name) = claimer_ref.name(tid) else {
                        log::warn!("claimed contig index {tid} out of range, skipping");
                        continue;
                    };
                    let Ok(region) = name.parse::<noodles::core::Region>() else {
                        log::warn!("{name}: not a valid region, skipping contig");
                        continue;
                    };
                    let opened: Result<
                        Box<dyn Iterator<Item = std::io::Result<Box<dyn VariantRecord>>>>,
                    > = (|| {
                        let file = std::fs::File::open(path)?;
                        let mut reader = variant::io::IndexedReader::new(file, path.as_path())
                            .map_err(|e| Error::Htsget(e.to_string()))?;
                        let query = reader
                            .query(header, &region)
                            .map_err(|e| Error::Htsget(e.to_string()))?;
                        Ok(Box::new(query))
                    })();
                    match opened {
                        Ok(boxed) => *cursor = Some(boxed),
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

fn decode_common(
    bind: &BindState,
    projection: &Projection,
    header: &Header,
    record: &dyn VariantRecord,
) -> Result<CommonValues> {
    let chrom = record
        .reference_sequence_name(header)
        .map_err(|e| Error::Htsget(e.to_string()))?
        .to_string();

    let pos = record
        .variant_start()
        .transpose()
        .map_err(|e| Error::Htsget(e.to_string()))?
        .map(|p| p.get() as i64)
        .unwrap_or(0);

    let id_parts: Vec<String> = record.ids().iter().map(ToString::to_string).collect();
    let id = if id_parts.is_empty() {
        None
    } else {
        Some(id_parts.join(";"))
    };

    let reference: String = record
        .reference_bases()
        .map(|r| r.map_err(|e| Error::Htsget(e.to_string())))
        .collect::<Result<String>>()?;

    let alt: Vec<Option<String>> = record
        .alternate_bases()
        .iter()
        .map(|a| a.map(|s| Some(s.to_string())).map_err(|e| Error::Htsget(e.to_string())))
        .collect::<Result<Vec<_>>>()?;

    let qual = record
        .quality_score()
        .transpose()
        .unwrap_or_else(|e| {
            log::warn!("{}: malformed QUAL: {e}", bind.path.display());
            None
    })
        .map(f64::from);

    let mut filters: Vec<Option<String>> = record
        .filters()
        .iter(header)
        .map(|f| f.map(|s| Some(s.to_string())).map_err(|e| Error::Htsget(e.to_string())))
        .collect::<Result<Vec<_>>>()?;
    if filters.is_empty() {
        // No filters recorded reads as PASS.
        filters.push(Some("PASS".to_string()));
    }

    let wants_info = projection.contains_any(
        &bind
            .info_fields
            .iter()
            .map(|f| f.output_column as u64)
            .collect::<Vec<_>>(),
    );

    let mut raw_vep: Option<String> = None;
    let info = if wants_info || bind.vep.is_some() {
        let mut slots: Vec<Decoded> = bind
            .info_fields
            .iter()
            .map(|f| empty_decoded(f))
            .collect();
        for result in record.info().iter(header) {
            let (key, value) = result.map_err(|e| Error::Htsget(e.to_string()))?;
            if let Some(vep) = &bind.vep {
                if key == vep.schema.info_id {
                    raw_vep = value.as_ref().and_then(info_value_as_string);
                    continue;
                }
            }
            if let Some(idx) = bind.info_fields.iter().position(|f| f.name == key) {
                slots[idx] = decode_info_value(&bind.info_fields[idx], value.as_ref());
            }
        }
        slots
    } else {
        Vec::new()
    };

    let vep_rows = match (&bind.vep, raw_vep) {
        (Some(vep), Some(raw)) => Some(parse_transcripts(&vep.schema, &raw)),
        _ => None,
    };

    Ok(CommonValues {
        chrom,
        pos,
        id,
        reference,
        alt,
        qual,
        filters,
        info,
        vep_rows,
    })
}

fn empty_decoded(field: &FieldMeta) -> Decoded {
    match field.ty {
        ValueKind::Integer if field.arity.is_list() => Decoded::IntList(Vec::new()),
        ValueKind::Integer => Decoded::Int(None),
        ValueKind::Float if field.arity.is_list() => Decoded::FloatList(Vec::new()),
        ValueKind::Float => Decoded::Float(None),
        ValueKind::Flag => Decoded::Flag(false),
        _ if field.arity.is_list() => Decoded::TextList(Vec::new()),
        _ => Decoded::Text(None),
    }
}

fn decode_info_value(field: &FieldMeta, value: Option<&InfoValue>) -> Decoded {
    match (field.ty, value) {
        (ValueKind::Flag, _) => Decoded::Flag(true),
        (_, None) => empty_decoded(field),
        (ValueKind::Integer, Some(InfoValue::Integer(n))) => Decoded::Int(Some(i64::from(*n))),
        (ValueKind::Integer, Some(InfoValue::Array(InfoArray::Integer(items)))) => {
            Decoded::IntList(items.iter().flatten().map(|&n| Some(i64::from(n))).collect())
        }
        (ValueKind::Float, Some(InfoValue::Float(n))) => Decoded::Float(Some(f64::from(*n))),
        (ValueKind::Float, Some(InfoValue::Array(InfoArray::Float(items)))) => {
            Decoded::FloatList(items.iter().flatten().map(|&n| Some(f64::from(n))).collect())
        }
        (_, Some(InfoValue::String(s))) => Decoded::Text(Some(s.clone())),
        (_, Some(InfoValue::Character(c))) => Decoded::Text(Some(c.to_string())),
        (_, Some(InfoValue::Array(InfoArray::String(items)))) => {
            Decoded::TextList(items.iter().cloned().collect())
        }
        (_, Some(other)) => Decoded::Text(info_value_as_string(other)),
    }
}

fn info_value_as_string(value: &InfoValue) -> Option<String> {
    match value {
        InfoValue::String(s) => Some(s.clone()),
        InfoValue::Character(c) => Some(c.to_string()),
        InfoValue::Integer(n) => Some(n.to_string()),
        InfoValue::Float(n) => Some(n.to_string()),
        InfoValue::Flag => None,
        InfoValue::Array(_) => None,
    }
}

fn decode_samples(
    bind: &BindState,
    projection: &Projection,
    header: &Header,
    record: &dyn VariantRecord,
) -> Result<Vec<SampleBlock>> {
    if bind.format_fields.is_empty() || bind.sample_names.is_empty() {
        return Ok(Vec::new());
    }
    let wants_format = match &bind.format_layout {
        Some(FormatLayout::Wide { base }) => projection.contains_any(
            &(*base..*base + bind.sample_names.len() * bind.format_fields.len())
                .map(|c| c as u64)
                .collect::<Vec<_>>(),
        ),
        Some(FormatLayout::Tidy { base, .. }) => projection.contains_any(
            &(*base..*base + bind.format_fields.len())
                .map(|c| c as u64)
                .collect::<Vec<_>>(),
        ),
        None => false,
    };
    if !wants_format {
        return Ok(bind
            .sample_names
            .iter()
            .map(|name| SampleBlock {
                    name: name.clone(),
                    values: bind.format_fields.iter().map(empty_decoded).collect(),
            })
                .collect());
    }

    let samples = record.samples().map_err(|e| Error::Htsget(e.to_string()))?;
    let mut out = Vec::with_capacity(bind.sample_names.len());

    for (name, sample) in bind.sample_names.iter().zip(samples.iter()) {
        let mut values = Vec::with_capacity(bind.format_fields.len());
        for field in &bind.format_fields {
            let raw = sample
                .get(header, &field.name)
                .transpose()
                .map_err(|e| Error::Htsget(e.to_string()))?
                .flatten();
            let decoded = if field.name == "GT" {
                Decoded::Genotype(raw.as_ref().and_then(decode_gt_value))
            } else {
                decode_sample_value(field, raw.as_ref())
            };
            values.push(decoded);
        }
        out.push(SampleBlock {
            name: name.clone(),
            values,
        });
    }
    Ok(out)
}

fn decode_gt_value(value: &SampleValue) -> Option<String> {
    let SampleValue::Genotype(genotype) = value else {
        return None;
    };
    let mut alleles = Vec::new();
    for result in genotype.iter() {
        let (position, phasing) = result.ok()?;
        alleles.push(Allele {
            position,
            phased: matches!(phasing, Phasing::Phased),
        });
    }
    Some(decode_genotype(&alleles))
}

fn decode_sample_value(field: &FieldMeta, value: Option<&SampleValue>) -> Decoded {
    match (field.ty, value) {
        (_, None) => empty_decoded(field),
        (ValueKind::Integer, Some(SampleValue::Integer(n))) => Decoded::Int(Some(i64::from(*n))),
        (ValueKind::Integer, Some(SampleValue::Array(arr))) => match arr {
            noodles::vcf::variant::record::samples::series::value::Array::Integer(items) => {
                Decoded::IntList(items.iter().flatten().map(|&n| Some(i64::from(n))).collect())
            }
            _ => Decoded::IntList(Vec::new()),
        },
        (ValueKind::Float, Some(SampleValue::Float(n))) => Decoded::Float(Some(f64::from(*n))),
        (ValueKind::Float, Some(SampleValue::Array(arr))) => match arr {
            noodles::vcf::variant::record::samples::series::value::Array::Float(items) => {
                Decoded::FloatList(items.iter().flatten().map(|&n| Some(f64::from(n))).collect())
            }
            _ => Decoded::FloatList(Vec::new()),
        },
        (_, Some(SampleValue::String(s))) => Decoded::Text(Some(s.clone())),
        (_, Some(SampleValue::Character(c))) => Decoded::Text(Some(c.to_string())),
        (_, Some(_)) => empty_decoded(field),
    }
}

fn write_common_row(
    bind: &BindState,
    common: &CommonValues,
    output: &mut DataChunkHandle,
    row: usize,
    offsets: &mut ListOffsets,
) {
    chunk::write_varchar(output, COL_CHROM, row, Some(&common.chrom));
    chunk::write_i64(output, COL_POS, row, Some(common.pos));
    chunk::write_varchar(output, COL_ID, row, common.id.as_deref());
    chunk::write_varchar(output, COL_REF, row, Some(&common.reference));
    let off = offsets.next(COL_ALT);
    let off = chunk::write_list_varchar(output, COL_ALT, row, off, Some(&common.alt));
    offsets.advance_to(COL_ALT, off);
    chunk::write_f64(output, COL_QUAL, row, common.qual);
    let off = offsets.next(COL_FILTER);
    let off = chunk::write_list_varchar(output, COL_FILTER, row, off, Some(&common.filters));
    offsets.advance_to(COL_FILTER, off);

    if let Some(vep) = &bind.vep {
        for (i, field) in vep.schema.fields.iter().enumerate() {
            let col = vep.start_column + i;
            let value = common
                .vep_rows
                .as_ref()
                .map(|rows| vep::column_for_field(rows, i));
            let off = offsets.next(col);
            let off = write_vep_list(output, col, row, off, field.ty, value.as_deref());
            offsets.advance_to(col, off);
        }
    }

    for (decoded, field) in common.info.iter().zip(bind.info_fields.iter()) {
        write_decoded(output, field.output_column, row, decoded, offsets);
    }
}

fn write_decoded(
    output: &mut DataChunkHandle,
    col: usize,
    row: usize,
    decoded: &Decoded,
    offsets: &mut ListOffsets,
) {
    match decoded {
        Decoded::Int(v) => chunk::write_i64(output, col, row, *v),
        Decoded::Float(v) => chunk::write_f64(output, col, row, *v),
        Decoded::Flag(v) => chunk::write_bool(output, col, row, Some(*v)),
        Decoded::Text(v) => chunk::write_varchar(output, col, row, v.as_deref()),
        Decoded::Genotype(v) => chunk::write_varchar(output, col, row, v.as_deref()),
        Decoded::IntList(items) => {
            // `write_list_i64` stores a flat i64 child; a missing element
            // inside an otherwise-present array surfaces as 0 rather than
            // NULL (DuckDB list children here have no separate validity
            // mask), matching how bcftools itself prints a missing `.`
            // inside an INFO/FORMAT array.
            let flat: Vec<i64> = items.iter().map(|v| v.unwrap_or(0)).collect();
            let off = offsets.next(col);
            let off = chunk::write_list_i64(output, col, row, off, Some(flat.as_slice()));
            offsets.advance_to(col, off);
        }
        Decoded::FloatList(items) => {
            let flat: Vec<f64> = items.iter().map(|v| v.unwrap_or(0.0)).collect();
            let off = offsets.next(col);
            let off = chunk::write_list_f64(output, col, row, off, Some(flat.as_slice()));
            offsets.advance_to(col, off);
        }
        Decoded::TextList(items) => {
            let off = offsets.next(col);
            let off = chunk::write_list_varchar(output, col, row, off, Some(items.as_slice()));
            offsets.advance_to(col, off);
        }
    }
}

/// Writes one VEP subfield's transcript-by-row values as a typed list,
/// matching the elementary type `elementary_for` assigned this column at
/// bind time (integer/float VEP subfields decode to numeric lists rather
/// than always falling back to `LIST<VARCHAR>`).
fn write_vep_list(
    output: &mut DataChunkHandle,
    col: usize,
    row: usize,
    offset: usize,
    ty: ValueKind,
    values: Option<&[Option<String>]>,
) -> usize {
    match ty {
        ValueKind::Integer => {
            let parsed: Option<Vec<i64>> = values
                .map(|items| items.iter().map(|v| v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)).collect());
            chunk::write_list_i64(output, col, row, offset, parsed.as_deref())
        }
        ValueKind::Float => {
            let parsed: Option<Vec<f64>> = values
                .map(|items| items.iter().map(|v| v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0.0)).collect());
            chunk::write_list_f64(output, col, row, offset, parsed.as_deref())
        }
        ValueKind::Flag | ValueKind::Character | ValueKind::String => {
            chunk::write_list_varchar(output, col, row, offset, values)
        }
    }
}

fn emit_tidy_rows(
    bind: &BindState,
    pending: &mut PendingTidyRows,
    output: &mut DataChunkHandle,
    mut row: usize,
    offsets: &mut ListOffsets,
) -> Result<usize> {
    let Some(FormatLayout::Tidy { sample_id_column, base }) = &bind.format_layout else {
        return Err(Error::Schema("tidy emit called without a tidy FORMAT layout".into()));
    };

    while row < DEFAULT_VECTOR_SIZE && pending.next_sample < pending.samples.len() {
        write_common_row(bind, &pending.common, output, row, offsets);
        let sample = &pending.samples[pending.next_sample];
        chunk::write_varchar(output, *sample_id_column, row, Some(&sample.name));
        for (i, decoded) in sample.values.iter().enumerate() {
            write_decoded(output, base + i, row, decoded, offsets);
        }
        pending.next_sample += 1;
        row += 1;
    }

    Ok(row)
}
