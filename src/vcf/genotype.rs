// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! FORMAT/GT decoding.

/// One decoded allele: its integer call (`None` = missing, `.`) and
/// whether it is phased relative to the previous allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allele {
    pub position: Option<usize>,
    pub phased: bool,
}

/// Joins allele calls into the textual genotype form: `|` when phased,
/// `/` otherwise, `.` for a missing allele. The first allele's phasing
/// flag never contributes a leading separator. A vector-end sentinel
/// (signalled by the caller simply not including it) truncates ploidy.
#[must_use]
pub fn decode_genotype(alleles: &[Allele]) -> String {
    let mut out = String::new();
    for (i, allele) in alleles.iter().enumerate() {
        if i > 0 {
            out.push(if allele.phased { '|' } else { '/' });
        }
        match allele.position {
            Some(p) => out.push_str(&p.to_string()),
            None => out.push('.'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phased_diploid() {
        let alleles = [
            Allele { position: Some(0), phased: false },
            Allele { position: Some(1), phased: true },
        ];
        assert_eq!(decode_genotype(&alleles), "0|1");
    }

    #[test]
    fn unphased_diploid() {
        let alleles = [
            Allele { position: Some(1), phased: false },
            Allele { position: Some(1), phased: false },
        ];
        assert_eq!(decode_genotype(&alleles), "1/1");
    }

    #[test]
    fn missing_allele_becomes_dot() {
        let alleles = [
            Allele { position: None, phased: false },
            Allele { position: Some(0), phased: false },
        ];
        assert_eq!(decode_genotype(&alleles), "./0");
    }

    #[test]
    fn haploid_has_no_separator() {
        let alleles = [Allele { position: Some(2), phased: false }];
        assert_eq!(decode_genotype(&alleles), "2");
    }

    #[test]
    fn truncated_ploidy_from_vector_end() {
        // A vector-end sentinel is modeled by the caller simply handing
        // us a shorter slice than the header's declared ploidy.
        let alleles = [Allele { position: Some(0), phased: false }];
        assert_eq!(decode_genotype(&alleles), "0");
    }
}
