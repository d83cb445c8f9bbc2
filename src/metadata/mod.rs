// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! HTS metadata readers: `read_hts_header` and `read_hts_index`,
//! plus the two macros layered on top of the latter.

pub mod header;
pub mod index;

/// `format` hint accepted by both metadata readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Auto,
    Vcf,
    Bcf,
    Sam,
    Bam,
    Cram,
    Fasta,
    Fastq,
    Tabix,
}

impl FormatHint {
    #[must_use]
    pub fn parse(hint: Option<&str>) -> Self {
        match hint.map(str::to_ascii_lowercase).as_deref() {
            Some("vcf") => Self::Vcf,
            Some("bcf") => Self::Bcf,
            Some("sam") => Self::Sam,
            Some("bam") => Self::Bam,
            Some("cram") => Self::Cram,
            Some("fasta" | "fa") => Self::Fasta,
            Some("fastq" | "fq") => Self::Fastq,
            Some("tabix") => Self::Tabix,
            _ => Self::Auto,
        }
    }

    /// Resolves `Auto` by sniffing the path's extension (stripping a
    /// trailing `.gz`/`.bgz`), per the conventional file-extension
    /// mapping the rest of the core already relies on.
    #[must_use]
    pub fn resolve(self, path: &std::path::Path) -> Self {
        if self != Self::Auto {
            return self;
        }
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let stem = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".bgz"))
            .unwrap_or(name);
        if stem.ends_with(".vcf") {
            Self::Vcf
        } else if stem.ends_with(".bcf") {
            Self::Bcf
        } else if stem.ends_with(".sam") {
            Self::Sam
        } else if stem.ends_with(".bam") {
            Self::Bam
        } else if stem.ends_with(".cram") {
            Self::Cram
        } else if stem.ends_with(".fasta") || stem.ends_with(".fa") || stem.ends_with(".fna") {
            Self::Fasta
        } else if stem.ends_with(".fastq") || stem.ends_with(".fq") {
            Self::Fastq
        } else {
            Self::Tabix
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resolves_by_extension_through_compression_suffix() {
        assert_eq!(
            FormatHint::Auto.resolve(Path::new("a.vcf.gz")),
            FormatHint::Vcf
        );
        assert_eq!(FormatHint::Auto.resolve(Path::new("a.bam")), FormatHint::Bam);
        assert_eq!(
            FormatHint::Auto.resolve(Path::new("a.gff3.gz")),
            FormatHint::Tabix
        );
    }

    #[test]
    fn explicit_hint_is_not_overridden() {
        assert_eq!(
            FormatHint::Bcf.resolve(Path::new("a.vcf")),
            FormatHint::Bcf
        );
    }
}
