// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Registers every table function and SQL macro this core exposes on a live connection.

use duckdb::Connection;

use crate::bam::BamReader;
use crate::fasta::{FastaIndexReader, FastaReader};
use crate::fastq::FastqReader;
use crate::gff::GffReader;
use crate::gtf::GtfReader;
use crate::metadata::header::HeaderReader;
use crate::metadata::index::IndexReader;
use crate::scan::ReaderVTab;
use crate::tabix::TabixReader;
use crate::vcf::VcfReader;

/// Registers `read_bcf`, `read_bam`, `read_fasta`, `fasta_index`,
/// `read_fastq`, `read_tabix`, `read_gff`, `read_gtf`, `read_hts_header`,
/// `read_hts_index`, plus the two macros layered atop `read_hts_index`.
pub fn register_all(conn: &Connection) -> duckdb::Result<()> {
    conn.register_table_function::<ReaderVTab<VcfReader>>("read_bcf")?;
    conn.register_table_function::<ReaderVTab<BamReader>>("read_bam")?;
    conn.register_table_function::<ReaderVTab<FastaReader>>("read_fasta")?;
    conn.register_table_function::<ReaderVTab<FastaIndexReader>>("fasta_index")?;
    conn.register_table_function::<ReaderVTab<FastqReader>>("read_fastq")?;
    conn.register_table_function::<ReaderVTab<TabixReader>>("read_tabix")?;
    conn.register_table_function::<ReaderVTab<GffReader>>("read_gff")?;
    conn.register_table_function::<ReaderVTab<GtfReader>>("read_gtf")?;
    conn.register_table_function::<ReaderVTab<HeaderReader>>("read_hts_header")?;
    conn.register_table_function::<ReaderVTab<IndexReader>>("read_hts_index")?;

    register_macros(conn)?;
    Ok(())
}

/// `read_hts_index_spans` adds NULL `bin/chunk_beg/end/seq_start` columns
/// to look like a span-annotated view; `read_hts_index_raw` collapses to
/// one `(index_type, index_path, raw)` row when index metadata is present.
fn register_macros(conn: &Connection) -> duckdb::Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE MACRO read_hts_index_spans(path, format := NULL, index_path := NULL) AS TABLE
            SELECT
                file_format, seqname, tid, length, mapped, unmapped, n_no_coor,
                index_type, index_path, meta,
                NULL::BIGINT AS bin,
                NULL::BIGINT AS chunk_beg,
                NULL::BIGINT AS chunk_end,
                NULL::BIGINT AS seq_start
            FROM read_hts_index(path, format := format, index_path := index_path);

        CREATE OR REPLACE MACRO read_hts_index_raw(path, format := NULL, index_path := NULL) AS TABLE
            SELECT DISTINCT index_type, index_path, meta AS raw
            FROM read_hts_index(path, format := format, index_path := index_path)
            WHERE meta IS NOT NULL;
        ",
    )
}
