// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Field metadata: the validated `(type, arity)` pair that drives both
//! schema construction and later decoding for every INFO/FORMAT field.

use noodles::vcf::header::record::value::map::info::Number as InfoNumber;
use noodles::vcf::header::record::value::map::format::Number as FormatNumber;
use noodles::vcf::header::Number as GenericNumber;

use super::spec_table::{self, StandardField};

/// Arity class a `Number` field resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Var,
    AlternateBases,
    ReferenceAlternateBases,
    Samples,
}

impl Arity {
    #[must_use]
    pub fn is_list(self) -> bool {
        !matches!(self, Self::Fixed(1))
    }
}

/// Elementary value type a field decodes to, independent of arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

impl ValueKind {
    #[must_use]
    pub fn from_header_type_name(name: &str) -> Self {
        match name {
            "Integer" => Self::Integer,
            "Float" => Self::Float,
            "Flag" => Self::Flag,
            "Character" => Self::Character,
            _ => Self::String,
        }
    }
}

/// One INFO or FORMAT field's validated metadata and its position in the
/// output schema.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub ty: ValueKind,
    pub arity: Arity,
    pub output_column: usize,
}

impl FieldMeta {
    #[must_use]
    pub fn column_name(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.name)
    }
}

fn arity_from_info_number(n: InfoNumber) -> Arity {
    match n {
        InfoNumber::Count(0) => Arity::Fixed(0),
        InfoNumber::Count(1) => Arity::Fixed(1),
        InfoNumber::Count(n) => Arity::Fixed(n),
        InfoNumber::AlternateBases => Arity::AlternateBases,
        InfoNumber::ReferenceAlternateBases => Arity::ReferenceAlternateBases,
        InfoNumber::Samples => Arity::Samples,
        _ => Arity::Var,
    }
}

fn arity_from_format_number(n: FormatNumber) -> Arity {
    match n {
        FormatNumber::Count(0) => Arity::Fixed(0),
        FormatNumber::Count(1) => Arity::Fixed(1),
        FormatNumber::Count(n) => Arity::Fixed(n),
        FormatNumber::AlternateBases => Arity::AlternateBases,
        FormatNumber::ReferenceAlternateBases => Arity::ReferenceAlternateBases,
        FormatNumber::Samples => Arity::Samples,
        _ => Arity::Var,
    }
}

/// Validates a header-declared `(Number, Type)` pair for one field against
/// the built-in standard table. On mismatch,
/// a warning is logged and the standard arity is adopted while the
/// header's declared `Type` is kept.
fn validate(
    kind: &str,
    name: &str,
    header_arity: Arity,
    header_ty: ValueKind,
) -> (Arity, ValueKind) {
    let Some(standard) = spec_table::lookup(kind, name) else {
        return (header_arity, header_ty);
    };

    if standard.number != header_arity {
        log::warn!(
            "{kind}/{name}: header declares Number={header_arity:?} but the VCF 4.x \
            standard defines {:?} for this reserved key; keeping the standard arity",
            standard.number
        );
    }

    (standard.number, header_ty)
}

pub fn derive_info_fields(header: &noodles::vcf::Header, start_column: usize) -> Vec<FieldMeta> {
    let mut out = Vec::with_capacity(header.infos().len());
    let mut next_column = start_column;
    for (name, def) in header.infos().iter() {
        let header_arity = arity_from_info_number(def.number());
        let header_ty = ValueKind::from_header_type_name(&def.ty().to_string());
        let (arity, ty) = validate("INFO", name, header_arity, header_ty);
        out.push(FieldMeta {
            name: name.to_string(),
            ty,
            arity,
            output_column: next_column,
        });
        next_column += 1;
    }
    out
}

pub fn derive_format_fields(header: &noodles::vcf::Header) -> Vec<FieldMeta> {
    let mut out = Vec::with_capacity(header.formats().len());
    for (idx, (name, def)) in header.formats().iter().enumerate() {
        let header_arity = arity_from_format_number(def.number());
        let header_ty = ValueKind::from_header_type_name(&def.ty().to_string());
        let (arity, ty) = validate("FORMAT", name, header_arity, header_ty);
        out.push(FieldMeta {
            name: name.to_string(),
            ty,
            arity,
            output_column: idx,
        });
    }
    out
}

/// Generic `Number` (used by a few header accessors that return the
/// shared enum rather than the INFO/FORMAT-specific ones).
#[allow(dead_code)]
fn arity_from_generic_number(n: GenericNumber) -> Arity {
    match n {
        GenericNumber::Count(1) => Arity::Fixed(1),
        GenericNumber::Count(n) => Arity::Fixed(n),
        _ => Arity::Var,
    }
}

impl From<&StandardField> for Arity {
    fn from(value: &StandardField) -> Self {
        value.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_kind_from_names() {
        assert_eq!(ValueKind::from_header_type_name("Integer"), ValueKind::Integer);
        assert_eq!(ValueKind::from_header_type_name("Float"), ValueKind::Float);
        assert_eq!(ValueKind::from_header_type_name("Flag"), ValueKind::Flag);
        assert_eq!(ValueKind::from_header_type_name("String"), ValueKind::String);
        assert_eq!(ValueKind::from_header_type_name("Bogus"), ValueKind::String);
    }

    #[test]
    fn arity_is_list_rules() {
        assert!(!Arity::Fixed(1).is_list());
        assert!(Arity::Fixed(0).is_list());
        assert!(Arity::Fixed(2).is_list());
        assert!(Arity::AlternateBases.is_list());
        assert!(Arity::Var.is_list());
    }
}
