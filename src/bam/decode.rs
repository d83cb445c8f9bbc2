// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! CIGAR/SEQ/QUAL formatting and auxiliary-tag value serialization.

use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::value::array::Subtype;
use noodles::sam::alignment::record::data::field::Value as AuxValue;
use noodles::sam::alignment::record::{Cigar, QualityScores, Sequence};

/// The canonical 4-bit nibble alphabet BAM packs `SEQ` bases into.
pub const NIBBLE_ALPHABET: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

/// Concatenates `<len><op>` tokens in record order; `*` for an empty CIGAR.
#[must_use]
pub fn format_cigar(cigar: &dyn Cigar) -> Result<String, std::io::Error> {
    let mut out = String::new();
    for result in cigar.iter() {
        let op = result?;
        out.push_str(&op.len().to_string());
        out.push(kind_char(op.kind()));
    }
    if out.is_empty() {
        out.push('*');
    }
    Ok(out)
}

fn kind_char(kind: Kind) -> char {
    match kind {
        Kind::Match => 'M',
        Kind::Insertion => 'I',
        Kind::Deletion => 'D',
        Kind::Skip => 'N',
        Kind::SoftClip => 'S',
        Kind::HardClip => 'H',
        Kind::Pad => 'P',
        Kind::SequenceMatch => '=',
        Kind::SequenceMismatch => 'X',
    }
}

/// Bases formatted through the nibble alphabet; `*` when the sequence is
/// empty. A decode-then-reencode of any positive-length sequence is a
/// round trip by construction, since every base noodles yields is one of
/// the 16 alphabet symbols.
#[must_use]
pub fn format_sequence(sequence: &dyn Sequence) -> String {
    if sequence.is_empty() {
        return "*".to_string();
    }
    sequence
        .iter()
        .map(|base| base as char)
        .collect::<String>()
}

/// Phred+33 string; `None` when every quality byte is the BAM "no quality"
/// sentinel (`0xFF`).
#[must_use]
pub fn format_quality_scores(quality: &dyn QualityScores) -> Option<String> {
    let scores: Vec<u8> = quality.iter().collect();
    if scores.is_empty() || scores.iter().all(|&q| q == 0xFF) {
        return None;
    }
    Some(scores.iter().map(|&q| (q + 33) as char).collect())
}

/// Canonical VARCHAR serialization for one auxiliary-tag value: scalars as
/// printed numbers or the raw `Z` string; arrays as `<subtype>,v1,v2,…`.
#[must_use]
pub fn format_aux_value(value: &AuxValue) -> String {
    match value {
        AuxValue::Character(c) => (*c as char).to_string(),
        AuxValue::Int32(n) => n.to_string(),
        AuxValue::UInt8(n) => n.to_string(),
        AuxValue::Int8(n) => n.to_string(),
        AuxValue::UInt16(n) => n.to_string(),
        AuxValue::Int16(n) => n.to_string(),
        AuxValue::UInt32(n) => n.to_string(),
        AuxValue::Float(n) => n.to_string(),
        AuxValue::String(s) => s.to_string(),
        AuxValue::Hex(s) => s.to_string(),
        AuxValue::Array(array) => format_aux_array(array),
    }
}

fn format_aux_array(array: &noodles::sam::alignment::record::data::field::value::Array) -> String {
    use noodles::sam::alignment::record::data::field::value::Array;
    let (subtype, values) = match array {
        Array::Int8(v) => (Subtype::Int8, v.iter().flatten().map(|n| n.to_string()).collect::<Vec<_>>()),
        Array::UInt8(v) => (Subtype::UInt8, v.iter().flatten().map(|n| n.to_string()).collect()),
        Array::Int16(v) => (Subtype::Int16, v.iter().flatten().map(|n| n.to_string()).collect()),
        Array::UInt16(v) => (Subtype::UInt16, v.iter().flatten().map(|n| n.to_string()).collect()),
        Array::Int32(v) => (Subtype::Int32, v.iter().flatten().map(|n| n.to_string()).collect()),
        Array::UInt32(v) => (Subtype::UInt32, v.iter().flatten().map(|n| n.to_string()).collect()),
        Array::Float(v) => (Subtype::Float, v.iter().flatten().map(|n| n.to_string()).collect()),
    };
    let subtype_char = match subtype {
        Subtype::Int8 => 'c',
        Subtype::UInt8 => 'C',
        Subtype::Int16 => 's',
        Subtype::UInt16 => 'S',
        Subtype::Int32 => 'i',
        Subtype::UInt32 => 'I',
        Subtype::Float => 'f',
    };
    let mut out = subtype_char.to_string();
    for v in values {
        out.push(',');
        out.push_str(&v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::NIBBLE_ALPHABET;

    #[test]
    fn nibble_alphabet_has_sixteen_symbols() {
        assert_eq!(NIBBLE_ALPHABET.len(), 16);
        assert_eq!(NIBBLE_ALPHABET[0], b'=');
        assert_eq!(NIBBLE_ALPHABET[15], b'N');
    }
}
