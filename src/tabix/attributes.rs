// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! GFF3/GTF attribute-string parsing into order-preserving key/value maps.

use indexmap::IndexMap;

/// GFF3 attributes: `;`-separated `KEY=VAL` pairs.
#[must_use]
pub fn parse_gff3(raw: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for field in raw.split(';') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        if let Some((key, value)) = field.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

/// GTF attributes: `;`-separated `KEY "VAL"` (quoted) or `KEY VAL`
/// (unquoted) pairs.
#[must_use]
pub fn parse_gtf(raw: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for field in raw.split(';') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let Some((key, rest)) = field.split_once(char::is_whitespace) else {
            continue;
        };
        let value = rest.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        map.insert(key.trim().to_string(), value.to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gff3_pairs() {
        let map = parse_gff3("ID=gene1;Name=BRCA2;Parent=mrna1");
        assert_eq!(map.get("ID").map(String::as_str), Some("gene1"));
        assert_eq!(map.get("Name").map(String::as_str), Some("BRCA2"));
        assert_eq!(map.keys().next().map(String::as_str), Some("ID"));
    }

    #[test]
    fn parses_gtf_quoted_and_unquoted_pairs() {
        let map = parse_gtf(r#"gene_id "ENSG001"; transcript_id "ENST001"; exon_number 3"#);
        assert_eq!(map.get("gene_id").map(String::as_str), Some("ENSG001"));
        assert_eq!(map.get("exon_number").map(String::as_str), Some("3"));
    }
}
