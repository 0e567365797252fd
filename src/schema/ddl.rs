//! CREATE TABLE generation for backing-store relations.

/// Generate CREATE TABLE SQL for a table's backing relation.
///
/// The geo key columns lead the compound primary key, in
/// `(geo_level, geo_code, geo_version)` order, so that lookups by
/// geography hit the primary key index without a secondary index.
/// Every data column is a nullable INTEGER count.
pub fn generate_create_table(db_table: &str, data_columns: &[&str]) -> String {
    let mut columns = vec![
        "    geo_level TEXT NOT NULL".to_string(),
        "    geo_code TEXT NOT NULL".to_string(),
        "    geo_version TEXT NOT NULL DEFAULT ''".to_string(),
    ];

    for col in data_columns {
        columns.push(format!("    {} INTEGER", col));
    }

    columns.push("    PRIMARY KEY (geo_level, geo_code, geo_version)".to_string());

    format!("CREATE TABLE {} (\n{}\n)", db_table, columns.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table("gender", &["male", "female", "total"]);
        assert!(sql.contains("CREATE TABLE gender"));
        assert!(sql.contains("geo_level TEXT NOT NULL"));
        assert!(sql.contains("male INTEGER"));
        assert!(sql.contains("PRIMARY KEY (geo_level, geo_code, geo_version)"));
    }

    #[test]
    fn test_geo_columns_lead() {
        let sql = generate_create_table("gender", &["male"]);
        let geo_pos = sql.find("geo_level").unwrap();
        let data_pos = sql.find("male").unwrap();
        assert!(geo_pos < data_pos);
    }
}
