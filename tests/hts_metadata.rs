use duckdb::Connection;
use test_log::test;

#[test]
fn read_hts_header_lists_vcf_info_and_contig_records() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("calls.vcf");
    std::fs::write(
        &path,
        "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=248956422>\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr1\t100\t.\tA\tG\t50\tPASS\tDP=30\n",
    )?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT record_type, id FROM read_hts_header('{}') ORDER BY record_type, id",
        path.display()
    ))?;
    let rows: Vec<(String, Option<String>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    assert!(rows.iter().any(|(t, id)| t == "contig" && id.as_deref() == Some("chr1")));
    assert!(rows.iter().any(|(t, id)| t == "info" && id.as_deref() == Some("DP")));

    Ok(())
}

#[test]
fn read_hts_index_reports_fasta_sequence_lengths() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("genome.fa");
    std::fs::write(&path, ">chr1\nACGTACGTAC\n>chr2\nACGT\n")?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    conn.execute(&format!("SELECT success FROM fasta_index('{}')", path.display()), [])?;

    let mut stmt = conn.prepare(&format!(
        "SELECT seqname, length, mapped, unmapped FROM read_hts_index('{}', format := 'fasta') ORDER BY seqname",
        path.display()
    ))?;
    let rows: Vec<(String, i64, Option<i64>, Option<i64>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("chr1".to_string(), 10, None, None));
    assert_eq!(rows[1], ("chr2".to_string(), 4, None, None));

    Ok(())
}

#[test]
fn read_hts_index_spans_adds_null_span_columns() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("genome.fa");
    std::fs::write(&path, ">chr1\nACGTACGTAC\n")?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;
    conn.execute(&format!("SELECT success FROM fasta_index('{}')", path.display()), [])?;

    let mut stmt = conn.prepare(&format!(
        "SELECT bin, chunk_beg, chunk_end, seq_start FROM read_hts_index_spans('{}', format := 'fasta')",
        path.display()
    ))?;
    let row: (Option<i64>, Option<i64>, Option<i64>, Option<i64>) =
        stmt.query_row([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?;
    assert_eq!(row, (None, None, None, None));

    Ok(())
}
