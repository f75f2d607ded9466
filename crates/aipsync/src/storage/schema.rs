//! `SQLite` schema definitions for aipsync.
//!
//! Every category lives in its own table keyed by the record's position in
//! the downloaded batch. The record itself is stored as JSON.

use crate::record::Category;

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement creating the table of one category.
///
/// `seq` is the zero-based position of the record in the batch it was
/// written with, so `ORDER BY seq` restores the publisher's order.
#[must_use]
pub fn create_category_table(category: Category) -> String {
    format!(
        r"
CREATE TABLE IF NOT EXISTS {} (
    seq INTEGER PRIMARY KEY,
    body TEXT NOT NULL
)
",
        category.table()
    )
}

/// All schema creation statements in order.
#[must_use]
pub fn schema_statements() -> Vec<String> {
    let mut statements: Vec<String> = Category::ALL
        .into_iter()
        .map(create_category_table)
        .collect();
    statements.push(CREATE_METADATA_TABLE.to_string());
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_cover_every_category() {
        let statements = schema_statements();
        assert_eq!(statements.len(), Category::ALL.len() + 1);
        for category in Category::ALL {
            assert!(statements.iter().any(|s| s.contains(category.table())));
        }
    }

    #[test]
    fn test_category_table_structure() {
        let sql = create_category_table(Category::Notam);
        assert!(sql.contains("notam_records"));
        assert!(sql.contains("seq INTEGER PRIMARY KEY"));
        assert!(sql.contains("body TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
