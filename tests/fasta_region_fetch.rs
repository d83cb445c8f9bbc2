use duckdb::Connection;
use test_log::test;

fn write_fasta(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        ">chr1 first contig\n\
ACGTACGTACGTACGTACGT\n\
ACGTACGTACGTACGTACGT\n\
>chr2\n\
TTTTGGGGCCCCAAAA\n",
    )
}

#[test]
fn sequential_scan_reads_every_record() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("genome.fa");
    write_fasta(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT NAME, DESCRIPTION, length(SEQUENCE) FROM read_fasta('{}') ORDER BY NAME",
        path.display()
    ))?;
    let rows: Vec<(String, Option<String>, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("chr1".to_string(), Some("first contig".to_string()), 40));
    assert_eq!(rows[1], ("chr2".to_string(), None, 16));

    Ok(())
}

#[test]
fn indexed_region_fetch_returns_the_requested_slice() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("genome.fa");
    write_fasta(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut build = conn.prepare(&format!("SELECT success FROM fasta_index('{}')", path.display()))?;
    let built: bool = build.query_row([], |row| row.get(0))?;
    assert!(built, "fasta_index should build a sibling .fai");

    let mut stmt = conn.prepare(&format!(
        "SELECT NAME, SEQUENCE FROM read_fasta('{}', region := 'chr1:1-4')",
        path.display()
    ))?;
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], ("chr1".to_string(), "ACGT".to_string()));

    Ok(())
}
