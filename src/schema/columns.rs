//! Ordered column model for a statistical table.

use std::collections::HashMap;

use serde::Serialize;

/// Geography key columns, never part of a table's data columns.
pub const GEO_COLUMNS: &[&str] = &["geo_level", "geo_code", "geo_version"];

/// Display metadata for one output column.
///
/// `indent` carries no computational meaning; it drives hierarchical
/// nesting in the UI (0 for the total column, 1 for everything else).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub indent: u8,
}

/// Ordered mapping from column key to display metadata, in the backing
/// relation's declared column order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnModel {
    entries: Vec<(String, ColumnInfo)>,
}

impl ColumnModel {
    /// Build a model from data-column keys (geo key columns already
    /// excluded). Display names default to the key with underscores
    /// spaced out and the first letter capitalized; `overrides` supplies
    /// presentable names for keys where that derivation falls short.
    pub fn build<'a>(
        keys: impl IntoIterator<Item = &'a str>,
        total_column: Option<&str>,
        overrides: &HashMap<String, String>,
    ) -> Self {
        let base_indent = if total_column.is_some() { 1 } else { 0 };

        let entries = keys
            .into_iter()
            .map(|key| {
                let name = overrides
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| display_name(key));
                let indent = if Some(key) == total_column {
                    0
                } else {
                    base_indent
                };
                (key.to_string(), ColumnInfo { name, indent })
            })
            .collect();

        Self { entries }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&ColumnInfo> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, info)| info)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnInfo)> {
        self.entries.iter().map(|(k, info)| (k.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comma-separated key list for error messages.
    pub fn valid_list(&self) -> String {
        self.keys().collect::<Vec<_>>().join(", ")
    }
}

/// Derive a display name from a column key: "age_group" -> "Age group".
pub fn display_name(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("age_group"), "Age group");
        assert_eq!(display_name("total"), "Total");
    }

    #[test]
    fn test_total_column_indent() {
        let model = ColumnModel::build(
            ["total", "male", "female"],
            Some("total"),
            &HashMap::new(),
        );
        assert_eq!(model.get("total").unwrap().indent, 0);
        assert_eq!(model.get("male").unwrap().indent, 1);
    }

    #[test]
    fn test_no_total_column_indent() {
        let model = ColumnModel::build(["male", "female"], None, &HashMap::new());
        assert_eq!(model.get("male").unwrap().indent, 0);
        assert_eq!(model.get("female").unwrap().indent, 0);
    }

    #[test]
    fn test_preserves_order() {
        let model = ColumnModel::build(["b_col", "a_col"], None, &HashMap::new());
        let keys: Vec<_> = model.keys().collect();
        assert_eq!(keys, vec!["b_col", "a_col"]);
    }

    #[test]
    fn test_display_override() {
        let mut overrides = HashMap::new();
        overrides.insert("female_under_18".to_string(), "Female, < 18".to_string());
        let model = ColumnModel::build(["female_under_18"], None, &overrides);
        assert_eq!(model.get("female_under_18").unwrap().name, "Female, < 18");
    }
}
