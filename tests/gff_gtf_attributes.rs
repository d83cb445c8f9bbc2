use duckdb::Connection;
use test_log::test;

#[test]
fn gff3_attributes_map_preserves_key_order_and_values() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annotation.gff3");
    std::fs::write(
        &path,
        "##gff-version 3\n\
chr1\tensembl\tgene\t1000\t2000\t.\t+\t.\tID=gene1;Name=BRCA1;biotype=protein_coding\n",
    )?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT seqname, feature, start, \"end\", map_keys(attributes_map), map_values(attributes_map) \
         FROM read_gff('{}', attributes_map := true)",
        path.display()
    ))?;
    let rows: Vec<(String, String, i64, i64, Vec<String>, Vec<String>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 1);
    let (seqname, feature, start, end, keys, values) = &rows[0];
    assert_eq!(seqname, "chr1");
    assert_eq!(feature, "gene");
    assert_eq!(*start, 1000);
    assert_eq!(*end, 2000);
    assert_eq!(keys, &["ID", "Name", "biotype"]);
    assert_eq!(values, &["gene1", "BRCA1", "protein_coding"]);

    Ok(())
}

#[test]
fn gtf_attributes_strip_quotes_around_values() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annotation.gtf");
    std::fs::write(
        &path,
        "chr1\tensembl\ttranscript\t1000\t2000\t.\t+\t.\tgene_id \"ENSG1\"; transcript_id \"ENST1\";\n",
    )?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT map_values(attributes_map) FROM read_gtf('{}', attributes_map := true)",
        path.display()
    ))?;
    let values: Vec<String> = stmt.query_row([], |row| row.get(0))?;
    assert_eq!(values, vec!["ENSG1".to_string(), "ENST1".to_string()]);

    Ok(())
}
