use duckdb::Connection;
use test_log::test;

fn write_bed(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        "chr1\t100\t200\tregionA\t1.5\n\
chr1\t300\t400\tregionB\t2.25\n\
chr2\t50\t60\tregionC\t0.0\n",
    )
}

#[test]
fn auto_detect_tightens_integer_and_double_columns() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("regions.bed");
    write_bed(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT column0, column1, column4 FROM read_tabix('{}', auto_detect := true) ORDER BY column1",
        path.display()
    ))?;
    let rows: Vec<(String, i64, f64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], ("chr1".to_string(), 100, 1.5));
    assert_eq!(rows[2], ("chr2".to_string(), 50, 0.0));

    Ok(())
}

#[test]
fn explicit_column_types_override_inference() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("regions.bed");
    write_bed(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT column1 FROM read_tabix('{}', column_types := ['chr', 'varchar', 'varchar', 'varchar', 'double']) LIMIT 1",
        path.display()
    ))?;
    let value: String = stmt.query_row([], |row| row.get(0))?;
    assert_eq!(value, "100", "column_types=varchar keeps the raw text rather than parsing as BIGINT");

    Ok(())
}

#[test]
fn mismatched_column_types_length_is_bind_fatal() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("regions.bed");
    write_bed(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let err = conn
        .prepare(&format!(
            "SELECT * FROM read_tabix('{}', column_types := ['varchar'])",
            path.display()
        ))
        .unwrap_err();
    assert!(err.to_string().contains("column_types"));

    Ok(())
}
