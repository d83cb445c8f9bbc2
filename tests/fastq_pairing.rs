use duckdb::Connection;
use test_log::test;

fn write_fastq(path: &std::path::Path, records: &[(&str, &str)]) -> std::io::Result<()> {
    let mut body = String::new();
    for (name, seq) in records {
        let qual = "I".repeat(seq.len());
        body.push_str(&format!("@{name}\n{seq}\n+\n{qual}\n"));
    }
    std::fs::write(path, body)
}

#[test]
fn mate_path_pairs_are_emitted_with_matching_pair_id() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let r1 = dir.path().join("reads_1.fastq");
    let r2 = dir.path().join("reads_2.fastq");
    write_fastq(&r1, &[("frag1/1", "ACGT"), ("frag2/1", "TTTT")])?;
    write_fastq(&r2, &[("frag1/2", "TGCA"), ("frag2/2", "AAAA")])?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT PAIR_ID, MATE, SEQUENCE FROM read_fastq('{}', mate_path := '{}')",
        r1.display(),
        r2.display()
    ))?;
    let rows: Vec<(String, i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].0, "frag1");
    assert_eq!(rows[1].0, "frag1");
    assert_eq!(rows[0].1, 1);
    assert_eq!(rows[1].1, 2);
    assert_eq!(rows[2].0, "frag2");
    assert_eq!(rows[3].0, "frag2");

    Ok(())
}

#[test]
fn mate_path_qname_mismatch_fails_the_scan() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let r1 = dir.path().join("reads_1.fastq");
    let r2 = dir.path().join("reads_2.fastq");
    write_fastq(&r1, &[("frag1/1", "ACGT")])?;
    write_fastq(&r2, &[("other/2", "TGCA")])?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM read_fastq('{}', mate_path := '{}')",
        r1.display(),
        r2.display()
    ))?;
    let result = stmt.query_map([], |_| Ok(())).and_then(|mut it| it.try_for_each(|r| r.map(|_| ())));
    assert!(result.is_err(), "QNAME mismatch between primary and mate must fail the scan");

    Ok(())
}

#[test]
fn mate_path_and_interleaved_are_mutually_exclusive() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let r1 = dir.path().join("reads_1.fastq");
    let r2 = dir.path().join("reads_2.fastq");
    write_fastq(&r1, &[("frag1/1", "ACGT")])?;
    write_fastq(&r2, &[("frag1/2", "TGCA")])?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let err = conn
        .prepare(&format!(
            "SELECT * FROM read_fastq('{}', mate_path := '{}', interleaved := true)",
            r1.display(),
            r2.display()
        ))
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("mutually") || err.to_string().contains("mate_path"));

    Ok(())
}
