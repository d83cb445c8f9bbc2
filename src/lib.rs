// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Exposes BCF/VCF, BAM/SAM/CRAM, FASTA/FASTQ and tabix/GTF/GFF genomics
//! file formats as typed, columnar DuckDB tables, and HTS header/index
//! metadata as two further table functions.
//!
//! Every reader implements the shared bind -> global-init -> local-init ->
//! scan lifecycle in [`scan::Reader`], adapted to `duckdb`'s table-function
//! trait by [`scan::ReaderVTab`]. [`registration::register_all`] wires
//! every reader and macro onto a live connection; this is the one function
//! the loadable-extension entry point below calls.

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bam;
pub mod error;
pub mod fasta;
pub mod fastq;
pub mod gff;
pub mod gtf;
pub mod metadata;
pub mod options;
pub mod registration;
pub mod scan;
pub mod tabix;
pub mod types;
pub mod vcf;

pub use error::{Error, Result};

#[cfg(feature = "loadable-extension")]
mod entrypoint {
    use duckdb::Connection;
    use duckdb_loadable_macros::duckdb_entrypoint_c_api;

    #[duckdb_entrypoint_c_api(ext_name = "hts_duckdb", min_duckdb_version = "v1.1.1")]
    pub unsafe fn hts_duckdb_init(con: Connection) -> Result<(), Box<dyn std::error::Error>> {
        crate::registration::register_all(&con)?;
        Ok(())
    }
}
