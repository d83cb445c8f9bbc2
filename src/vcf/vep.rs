// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! VEP/CSQ/BCSQ/ANN annotation unpacking.
//!
//! Type inference is string-pattern based over the subfield name, kept as
//! a small classified predicate set rather than a lookup table, per the
//! design note ("VEP type inference").

use super::schema::ValueKind;

pub const VEP_INFO_IDS: &[&str] = &["CSQ", "BCSQ", "ANN"];

/// One transcript-effect subfield: its name and inferred elementary type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VepField {
    pub name: String,
    pub ty: ValueKind,
}

/// The ordered subfield list for one VEP-style INFO field, derived from
/// its header `Description`.
#[derive(Debug, Clone, Default)]
pub struct VepSchema {
    pub info_id: String,
    pub fields: Vec<VepField>,
}

impl VepSchema {
    #[must_use]
    pub fn column_name(&self, field: &VepField) -> String {
        format!("VEP_{}", field.name)
    }
}

const INTEGER_SUBFIELDS: &[&str] = &["DISTANCE", "STRAND", "TSL"];
const STRING_LIST_SUBFIELDS: &[&str] = &["Consequence", "FLAGS", "CLIN_SIG"];

#[must_use]
pub fn classify_subfield(name: &str) -> ValueKind {
    if INTEGER_SUBFIELDS.contains(&name) {
        return ValueKind::Integer;
    }
    if STRING_LIST_SUBFIELDS.contains(&name) {
        return ValueKind::String;
    }
    if name.contains("_AF")
    || name.contains("AF_")
    || name == "MAX_AF"
    || name == "MOTIF_SCORE_CHANGE"
    || name.starts_with("SpliceAI_pred_DS_")
    {
        return ValueKind::Float;
    }
    ValueKind::String
}

/// Finds the `Format: a|b|c` subfield list inside an INFO header
/// `Description` and builds a [`VepSchema`] from it. Returns `None` when
/// the description has no recognizable `Format:` clause.
#[must_use]
pub fn parse_description(info_id: &str, description: &str) -> Option<VepSchema> {
    let marker = "Format: ";
    let start = description.find(marker)? + marker.len();
    let raw = description[start..].trim().trim_end_matches('"');

    let fields = raw
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| VepField {
            ty: classify_subfield(name),
            name: name.to_string(),
    })
        .collect::<Vec<_>>();

    if fields.is_empty() {
        None
    } else {
        Some(VepSchema {
            info_id: info_id.to_string(),
            fields,
        })
    }
}

/// Finds the first VEP-style INFO header (`CSQ`, `BCSQ`, or `ANN`) and
/// derives its schema, if any such field is declared.
#[must_use]
pub fn derive_vep_schema(header: &noodles::vcf::Header) -> Option<VepSchema> {
    for id in VEP_INFO_IDS {
        if let Some(def) = header.infos().get(*id) {
            if let Some(schema) = parse_description(id, def.description()) {
                return Some(schema);
            }
        }
    }
    None
}

/// One transcript's worth of decoded subfield values, in schema order.
/// A `None` element means that transcript's value for that subfield was
/// empty or `.` (missing).
pub type TranscriptRow = Vec<Option<String>>;

/// Parses a raw `CSQ|BCSQ|ANN` INFO string into a transcript-by-field
/// matrix, splitting transcripts on `,` and subfields on `|`.
#[must_use]
pub fn parse_transcripts(schema: &VepSchema, raw: &str) -> Vec<TranscriptRow> {
    raw.split(',')
        .map(|transcript| {
            let mut parts = transcript.split('|');
            schema
                .fields
                .iter()
                .map(|_| {
                    let raw_value = parts.next().unwrap_or("");
                    if raw_value.is_empty() || raw_value == "." {
                        None
                    } else {
                        Some(raw_value.to_string())
                    }
            })
                .collect()
    })
        .collect()
}

/// Transposes a transcript-by-field matrix into one column per subfield,
/// each a `LIST<T>` with one element per transcript.
#[must_use]
pub fn column_for_field(rows: &[TranscriptRow], field_index: usize) -> Vec<Option<String>> {
    rows.iter()
        .map(|row| row.get(field_index).cloned().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_integer_fields() {
        assert_eq!(classify_subfield("STRAND"), ValueKind::Integer);
        assert_eq!(classify_subfield("TSL"), ValueKind::Integer);
    }

    #[test]
    fn classify_float_patterns() {
        assert_eq!(classify_subfield("gnomAD_AF"), ValueKind::Float);
        assert_eq!(classify_subfield("AF_popmax"), ValueKind::Float);
        assert_eq!(classify_subfield("MAX_AF"), ValueKind::Float);
        assert_eq!(classify_subfield("SpliceAI_pred_DS_AG"), ValueKind::Float);
    }

    #[test]
    fn classify_default_is_string() {
        assert_eq!(classify_subfield("SYMBOL"), ValueKind::String);
        assert_eq!(classify_subfield("Consequence"), ValueKind::String);
    }

    #[test]
    fn parses_description_format_clause() {
        let description =
        "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|STRAND|MAX_AF";
        let schema = parse_description("CSQ", description).unwrap();
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.fields[2].name, "STRAND");
        assert_eq!(schema.fields[2].ty, ValueKind::Integer);
        assert_eq!(schema.fields[3].ty, ValueKind::Float);
    }

    #[test]
    fn parses_multi_transcript_values_with_missing() {
        let schema = VepSchema {
            info_id: "CSQ".into(),
            fields: vec![
                VepField { name: "Allele".into(), ty: ValueKind::String },
                VepField { name: "STRAND".into(), ty: ValueKind::Integer },
            ],
        };
        let rows = parse_transcripts(&schema, "A|1,T|.");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Some("A".to_string()), Some("1".to_string())]);
        assert_eq!(rows[1], vec![Some("T".to_string()), None]);

        let strand_col = column_for_field(&rows, 1);
        assert_eq!(strand_col, vec![Some("1".to_string()), None]);
    }
}
