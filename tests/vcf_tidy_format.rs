use duckdb::Connection;
use test_log::test;

fn write_vcf(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=248956422>\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Sample depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t100\trs1\tA\tG\t50\tPASS\tDP=30\tGT:DP\t0/1:20\t1/1:10\n\
chr1\t200\t.\tC\tT\t.\tq10\tDP=5\tGT:DP\t0/0:5\t./.:.\n",
    )
}

#[test]
fn tidy_format_melts_samples_into_rows() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("calls.vcf");
    write_vcf(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let sql = format!(
        "SELECT CHROM, POS, list_aggr(FILTER, 'string_agg', ',') AS filter, SAMPLE_ID \
         FROM read_bcf('{}', tidy_format := true) ORDER BY POS, SAMPLE_ID",
        path.display()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<(String, i64, String, String)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 4, "two records x two samples each");
    assert_eq!(rows[0], ("chr1".to_string(), 100, "PASS".to_string(), "S1".to_string()));
    assert_eq!(rows[1], ("chr1".to_string(), 100, "PASS".to_string(), "S2".to_string()));
    assert_eq!(rows[2].2, "q10");

    Ok(())
}

#[test]
fn wide_format_keeps_one_row_per_record() -> hts_duckdb::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("calls.vcf");
    write_vcf(&path)?;

    let conn = Connection::open_in_memory()?;
    hts_duckdb::registration::register_all(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT COUNT(*) FROM read_bcf('{}')",
        path.display()
    ))?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    assert_eq!(count, 2, "wide shape emits one row per record regardless of sample count");

    Ok(())
}
