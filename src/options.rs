// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Small helpers for pulling positional/named parameters off `BindInfo`
//! into this crate's option structs.

use duckdb::vtab::BindInfo;

use crate::error::{Error, Result};

#[must_use]
pub fn positional_text(bind: &BindInfo, index: u64) -> String {
    bind.get_parameter(index).to_string()
}

#[must_use]
pub fn named_text(bind: &BindInfo, name: &str) -> Option<String> {
    bind.get_named_parameter(name).map(|v| v.to_string())
}

#[must_use]
pub fn named_bool(bind: &BindInfo, name: &str, default: bool) -> bool {
    match bind.get_named_parameter(name) {
        Some(v) => matches!(v.to_string().to_ascii_lowercase().as_str(), "true" | "1"),
        None => default,
    }
}

pub fn named_text_list(bind: &BindInfo, name: &str) -> Option<Vec<String>> {
    bind.get_named_parameter(name).map(|v| {
        // DuckDB renders a LIST parameter's value as `[a, b, c]`; named
        // list parameters only ever carry plain identifiers/words in this
        // crate's surface (header names, type names), so a simple split
        // is sufficient and avoids pulling in a full value-to-list API.
        let rendered = v.to_string();
        let trimmed = rendered.trim_start_matches('[').trim_end_matches(']');
        if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed
                .split(',')
                .map(|s| s.trim().trim_matches('\'').trim_matches('"').to_string())
                .collect()
        }
    })
}

/// Splits a comma-separated region list into trimmed, non-empty parts.
#[must_use]
pub fn split_regions(region: &str) -> Vec<String> {
    region
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn require_not_both(
    a_set: bool,
    a_name: &str,
    b_set: bool,
    b_name: &str,
) -> Result<()> {
    if a_set && b_set {
        Err(Error::UnsupportedOption(format!(
                    "`{a_name}` and `{b_name}` are mutually exclusive"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_regions_trims_and_drops_empty() {
        assert_eq!(
            split_regions(" chr1:1-100 , chr2 ,, chr3:5-10"),
            vec!["chr1:1-100", "chr2", "chr3:5-10"]
        );
    }

    #[test]
    fn mutually_exclusive_options_rejected() {
        assert!(require_not_both(true, "mate_path", true, "interleaved").is_err());
        assert!(require_not_both(true, "mate_path", false, "interleaved").is_ok());
    }
}
