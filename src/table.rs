//! Table descriptors: the declarative metadata for one statistical table.

use std::collections::{HashMap, HashSet};

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::schema::columns::ColumnModel;
use crate::schema::ident::{generate_table_id, NameLimits};
use crate::store::DataStore;

/// How values should be displayed downstream. Not enforced by the
/// aggregator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Number,
    Percentage,
}

/// Variant-specific descriptor data.
#[derive(Debug)]
pub enum TableKind {
    /// A flat spreadsheet-style table: one row of numeric columns per
    /// geography, optionally with a designated total column. Without a
    /// total column the table has no concept of a total and callers use
    /// absolute values only.
    Simple { total_column: Option<String> },

    /// An 'inverted' table whose columns are combinations of classifying
    /// field values (e.g. gender x age group). Combination enumeration is
    /// a schema-builder concern; this core consumes whatever columns the
    /// backing relation declares.
    Field {
        /// Field names in nesting order.
        fields: Vec<String>,
        /// Membership-only view of `fields`.
        field_set: HashSet<String>,
        /// Key value of the rightmost field that identifies the "total"
        /// row, for tables whose rows overlap rather than partition the
        /// universe.
        denominator_key: Option<String>,
        /// When false, percentages are disallowed for this table.
        has_total: bool,
    },
}

/// Declarative metadata for one statistical table. Immutable after
/// construction; built via [`SimpleTableDef`] or [`FieldTableDef`].
#[derive(Debug)]
pub struct Table {
    id: String,
    db_table: String,
    universe: String,
    description: String,
    year: String,
    dataset: String,
    stat_type: StatType,
    kind: TableKind,
    display_overrides: HashMap<String, String>,
    columns: OnceCell<ColumnModel>,
}

impl Table {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the backing relation in the store.
    pub fn db_table(&self) -> &str {
        &self.db_table
    }

    pub fn universe(&self) -> &str {
        &self.universe
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn stat_type(&self) -> StatType {
        self.stat_type
    }

    pub fn kind(&self) -> &TableKind {
        &self.kind
    }

    /// The column treated as this table's total, if it has one.
    pub fn total_column(&self) -> Option<&str> {
        match &self.kind {
            TableKind::Simple { total_column } => total_column.as_deref(),
            TableKind::Field { has_total, .. } => has_total.then_some("total"),
        }
    }

    /// Field names in nesting order, for field tables.
    pub fn fields(&self) -> Option<&[String]> {
        match &self.kind {
            TableKind::Field { fields, .. } => Some(fields),
            TableKind::Simple { .. } => None,
        }
    }

    /// The column model for this table, built on first use by
    /// introspecting the backing relation and cached with the descriptor.
    pub fn columns<'a>(&'a self, store: &DataStore) -> Result<&'a ColumnModel> {
        self.columns.get_or_try_init(|| {
            let keys = store.data_columns(&self.db_table)?;
            Ok(ColumnModel::build(
                keys.iter().map(String::as_str),
                self.total_column(),
                &self.display_overrides,
            ))
        })
    }

    /// Serializable summary consumed by presentation collaborators.
    pub fn metadata(&self) -> TableMetadata<'_> {
        TableMetadata {
            title: &self.description,
            universe: &self.universe,
            year: &self.year,
            dataset: &self.dataset,
            denominator_column_id: self.total_column(),
            table_id: &self.id,
            stat_type: self.stat_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata<'a> {
    pub title: &'a str,
    pub universe: &'a str,
    pub year: &'a str,
    pub dataset: &'a str,
    pub denominator_column_id: Option<&'a str>,
    pub table_id: &'a str,
    pub stat_type: StatType,
}

/// Definition of a simple table. Defaults: year 2011, dataset
/// "Census 2011", total column "total", stat type number, backing
/// relation named after the lowercased id.
#[derive(Debug)]
pub struct SimpleTableDef {
    id: String,
    universe: String,
    description: String,
    year: String,
    dataset: String,
    stat_type: StatType,
    total_column: Option<String>,
    db_table: Option<String>,
}

impl SimpleTableDef {
    pub fn new(id: &str, universe: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            universe: universe.to_string(),
            description: description.to_string(),
            year: "2011".to_string(),
            dataset: "Census 2011".to_string(),
            stat_type: StatType::Number,
            total_column: Some("total".to_string()),
            db_table: None,
        }
    }

    pub fn year(mut self, year: &str) -> Self {
        self.year = year.to_string();
        self
    }

    pub fn dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    pub fn stat_type(mut self, stat_type: StatType) -> Self {
        self.stat_type = stat_type;
        self
    }

    /// Name the total column, or pass `None` for a table with no
    /// meaningful total (disables percentages by caller convention).
    pub fn total_column(mut self, column: Option<&str>) -> Self {
        self.total_column = column.map(str::to_string);
        self
    }

    /// Use an existing backing relation instead of one named after the id.
    pub fn db_table(mut self, name: &str) -> Self {
        self.db_table = Some(name.to_string());
        self
    }

    pub fn build(self) -> Table {
        let id = self.id.to_uppercase();
        deprecation_notice("SimpleTable", &id);

        Table {
            db_table: self.db_table.unwrap_or_else(|| id.to_lowercase()),
            id,
            universe: self.universe,
            description: self.description,
            year: self.year,
            dataset: self.dataset,
            stat_type: self.stat_type,
            kind: TableKind::Simple {
                total_column: self.total_column,
            },
            display_overrides: HashMap::new(),
            columns: OnceCell::new(),
        }
    }
}

/// Definition of a field table. The id is derived from the field set
/// unless supplied; the description defaults to
/// `"{universe} by {field, field, ...}"`.
#[derive(Debug)]
pub struct FieldTableDef {
    fields: Vec<String>,
    id: Option<String>,
    universe: String,
    description: Option<String>,
    year: String,
    dataset: String,
    stat_type: StatType,
    denominator_key: Option<String>,
    has_total: bool,
    db_table: Option<String>,
    name_limits: NameLimits,
    display_overrides: HashMap<String, String>,
}

impl FieldTableDef {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            id: None,
            universe: "Population".to_string(),
            description: None,
            year: "2011".to_string(),
            dataset: "Census 2011".to_string(),
            stat_type: StatType::Number,
            denominator_key: None,
            has_total: true,
            db_table: None,
            name_limits: NameLimits::default(),
            display_overrides: HashMap::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn universe(mut self, universe: &str) -> Self {
        self.universe = universe.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn year(mut self, year: &str) -> Self {
        self.year = year.to_string();
        self
    }

    pub fn dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    pub fn stat_type(mut self, stat_type: StatType) -> Self {
        self.stat_type = stat_type;
        self
    }

    /// Key value of the rightmost field that identifies the total row,
    /// for tables whose rows sum to more than the true universe.
    pub fn denominator_key(mut self, key: &str) -> Self {
        self.denominator_key = Some(key.to_string());
        self
    }

    /// Whether a total column and percentages make sense for this table.
    pub fn has_total(mut self, has_total: bool) -> Self {
        self.has_total = has_total;
        self
    }

    /// Share an existing backing relation, e.g. when two tables present
    /// the same fields in a different nesting order.
    pub fn db_table(mut self, name: &str) -> Self {
        self.db_table = Some(name.to_string());
        self
    }

    /// Name-length limits of the target storage engine.
    pub fn name_limits(mut self, limits: NameLimits) -> Self {
        self.name_limits = limits;
        self
    }

    /// Presentable display name for a combination-column key whose
    /// derived capitalization falls short.
    pub fn display_name(mut self, key: &str, name: &str) -> Self {
        self.display_overrides
            .insert(key.to_string(), name.to_string());
        self
    }

    pub fn build(self) -> Result<Table> {
        if self.fields.is_empty() {
            return Err(EngineError::EmptyFields);
        }

        let id = match self.id {
            Some(id) => id.to_uppercase(),
            None => generate_table_id(&self.fields, &self.name_limits),
        };
        deprecation_notice("FieldTable", &id);

        let description = self
            .description
            .unwrap_or_else(|| format!("{} by {}", self.universe, self.fields.join(", ")));
        let field_set = self.fields.iter().cloned().collect();

        Ok(Table {
            db_table: self.db_table.unwrap_or_else(|| id.to_lowercase()),
            id,
            universe: self.universe,
            description,
            year: self.year,
            dataset: self.dataset,
            stat_type: self.stat_type,
            kind: TableKind::Field {
                fields: self.fields,
                field_set,
                denominator_key: self.denominator_key,
                has_total: self.has_total,
            },
            display_overrides: self.display_overrides,
            columns: OnceCell::new(),
        })
    }
}

/// Declarative table definitions are a legacy style; the notice is
/// informational and never blocks execution.
fn deprecation_notice(style: &str, id: &str) {
    tracing::warn!(
        target: "census_tables::deprecation",
        table = %id,
        "declarative {} definitions are deprecated; migrate to managed table models",
        style
    );
}
