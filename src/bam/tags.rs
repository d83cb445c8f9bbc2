// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The built-in standard SAM aux-tag table and
//! the canonical auxiliary-tag-value serialization.

use crate::types::{ColumnType, Elementary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Character,
    String,
    Hex,
    Int,
    Float,
    ArrayInt,
    ArrayFloat,
}

#[derive(Debug, Clone, Copy)]
pub struct StandardTag {
    pub tag: [u8; 2],
    pub kind: TagKind,
}

const fn t(tag: &str, kind: TagKind) -> StandardTag {
    let bytes = tag.as_bytes();
    StandardTag {
        tag: [bytes[0], bytes[1]],
        kind,
    }
}

pub static STANDARD_TAGS: &[StandardTag] = &[
    t("NM", TagKind::Int),
    t("AS", TagKind::Int),
    t("XS", TagKind::Int),
    t("MD", TagKind::String),
    t("RG", TagKind::String),
    t("ML", TagKind::ArrayInt),
    t("MC", TagKind::String),
    t("SA", TagKind::String),
    t("NH", TagKind::Int),
    t("HI", TagKind::Int),
    t("MQ", TagKind::Int),
    t("UQ", TagKind::Int),
];

impl TagKind {
    #[must_use]
    pub fn column_type(self) -> ColumnType {
        match self {
            Self::Character | Self::String | Self::Hex => ColumnType::Scalar(Elementary::Varchar),
            Self::Int => ColumnType::Scalar(Elementary::BigInt),
            Self::Float => ColumnType::Scalar(Elementary::Double),
            Self::ArrayInt => ColumnType::List(Elementary::BigInt),
            Self::ArrayFloat => ColumnType::List(Elementary::Double),
        }
    }
}

#[must_use]
pub fn lookup(tag: [u8; 2]) -> Option<&'static StandardTag> {
    STANDARD_TAGS.iter().find(|entry| entry.tag == tag)
}

#[must_use]
pub fn tag_name(tag: [u8; 2]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_resolve() {
        assert_eq!(lookup(*b"NM").map(|t| t.kind), Some(TagKind::Int));
        assert_eq!(lookup(*b"ML").map(|t| t.kind), Some(TagKind::ArrayInt));
    }

    #[test]
    fn unknown_tags_have_no_standard_entry() {
        assert!(lookup(*b"ZZ").is_none());
    }
}
