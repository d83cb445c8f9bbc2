// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The built-in standard VCF INFO/FORMAT spec table (design note:
//! "Standard-tag table as data"). Validation is a lookup, not code.

use super::schema::Arity;

#[derive(Debug, Clone, Copy)]
pub struct StandardField {
    pub name: &'static str,
    pub number: Arity,
}

const fn f(name: &'static str, number: Arity) -> StandardField {
    StandardField { name, number }
}

pub static STANDARD_INFO: &[StandardField] = &[
    f("AC", Arity::AlternateBases),
    f("AF", Arity::AlternateBases),
    f("AN", Arity::Fixed(1)),
    f("BQ", Arity::Fixed(1)),
    f("CIGAR", Arity::AlternateBases),
    f("DB", Arity::Fixed(0)),
    f("DP", Arity::Fixed(1)),
    f("END", Arity::Fixed(1)),
    f("H2", Arity::Fixed(0)),
    f("H3", Arity::Fixed(0)),
    f("MQ", Arity::Fixed(1)),
    f("MQ0", Arity::Fixed(1)),
    f("NS", Arity::Fixed(1)),
    f("SB", Arity::Fixed(4)),
    f("SOMATIC", Arity::Fixed(0)),
    f("VALIDATED", Arity::Fixed(0)),
    f("1000G", Arity::Fixed(0)),
];

pub static STANDARD_FORMAT: &[StandardField] = &[
    f("AD", Arity::ReferenceAlternateBases),
    f("ADF", Arity::ReferenceAlternateBases),
    f("ADR", Arity::ReferenceAlternateBases),
    f("DP", Arity::Fixed(1)),
    f("EC", Arity::AlternateBases),
    f("FT", Arity::Fixed(1)),
    f("GL", Arity::Samples),
    f("GP", Arity::Samples),
    f("GQ", Arity::Fixed(1)),
    f("GT", Arity::Fixed(1)),
    f("HQ", Arity::Fixed(2)),
    f("MQ", Arity::Fixed(1)),
    f("PL", Arity::Samples),
    f("PP", Arity::Samples),
    f("PQ", Arity::Fixed(1)),
    f("PS", Arity::Fixed(1)),
];

#[must_use]
pub fn lookup(kind: &str, name: &str) -> Option<&'static StandardField> {
    let table: &[StandardField] = match kind {
        "INFO" => STANDARD_INFO,
        "FORMAT" => STANDARD_FORMAT,
        _ => return None,
    };
    table.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_resolve() {
        assert!(matches!(
            lookup("INFO", "AF").map(|f| f.number),
            Some(Arity::AlternateBases)
        ));
        assert!(matches!(
            lookup("FORMAT", "GT").map(|f| f.number),
            Some(Arity::Fixed(1))
        ));
    }

    #[test]
    fn unknown_fields_have_no_standard_entry() {
        assert!(lookup("INFO", "MY_CUSTOM_FIELD").is_none());
        assert!(lookup("BOGUS_KIND", "AF").is_none());
    }
}
