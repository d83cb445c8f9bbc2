use duckdb::Connection;
use test_log::test;

fn write_sam(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        "@HD\tVN:1.6\tSO:coordinate\n\
@SQ\tSN:chr1\tLN:248956422\n\
read1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
read2\t16\tchr1\t200\t40\t2M1I2M\t*\t0\t0\tACGTA\tIIIII\n",
    )
}

#[test]
fn sam_scan_materializes_core_fields() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reads.sam");
    write_sam(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT QNAME, FLAG, RNAME, POS, CIGAR FROM read_bam('{}') ORDER BY POS",
        path.display()
    ))?;
    let rows: Vec<(String, i64, String, i64, String)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("read1".to_string(), 0, "chr1".to_string(), 100, "4M".to_string()));
    assert_eq!(rows[1], ("read2".to_string(), 16, "chr1".to_string(), 200, "2M1I2M".to_string()));

    Ok(())
}

#[test]
fn region_query_without_sibling_index_is_bind_fatal() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reads.sam");
    write_sam(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let err = conn
        .prepare(&format!(
            "SELECT * FROM read_bam('{}', region := 'chr1:100-150')",
            path.display()
        ))
        .unwrap_err();
    assert!(err.to_string().contains("index"), "error should mention the missing index: {err}");

    Ok(())
}
