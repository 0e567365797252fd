//! The stat aggregator: turns raw rows into named, ordered,
//! percentage-or-absolute statistics with a correct denominator.

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{EngineError, Result};
use crate::geo::Geography;
use crate::store::{DataStore, RawRow};
use crate::table::{StatType, Table};

/// How the denominator for percentage values is chosen. When unset, the
/// denominator is the sum of the selected fields' raw values.
#[derive(Debug, Clone, PartialEq)]
pub enum TotalSpec {
    /// Use this value directly.
    Value(i64),
    /// Use the named column's raw value.
    Column(String),
}

/// Parameters for [`Table::get_stat_data`].
#[derive(Debug, Clone)]
pub struct StatParams {
    /// Columns to fetch stats for; all non-geography columns when unset.
    pub fields: Option<Vec<String>>,
    /// Explicit ordering of source fields for the result; defaults to the
    /// order of `fields`, or natural column order when `fields` is unset.
    pub key_order: Option<Vec<String>>,
    /// Compute percentages of the denominator, or return raw values.
    pub percent: bool,
    pub total: Option<TotalSpec>,
    /// Map from source field to output key. Several fields may recode to
    /// the same key; their values accumulate.
    pub recode: HashMap<String, String>,
}

impl Default for StatParams {
    fn default() -> Self {
        Self {
            fields: None,
            key_order: None,
            percent: true,
            total: None,
            recode: HashMap::new(),
        }
    }
}

impl StatParams {
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn key_order(mut self, order: &[&str]) -> Self {
        self.key_order = Some(order.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn percent(mut self, percent: bool) -> Self {
        self.percent = percent;
        self
    }

    pub fn total(mut self, total: TotalSpec) -> Self {
        self.total = Some(total);
        self
    }

    pub fn recode(mut self, pairs: &[(&str, &str)]) -> Self {
        self.recode = pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        self
    }
}

/// Per-geography value channel. `this` is the requested geography;
/// the shape leaves room for comparative geographies upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSet {
    pub this: f64,
}

/// One named output statistic.
#[derive(Debug, Clone, Serialize)]
pub struct StatEntry {
    pub name: String,
    pub values: ValueSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numerators: Option<ValueSet>,
}

/// Ordered result set of one `get_stat_data` call, with the descriptor
/// metadata attached as a side channel.
#[derive(Debug, Serialize)]
pub struct StatResult {
    pub table_id: String,
    pub universe: String,
    pub description: String,
    pub stat_type: StatType,
    #[serde(serialize_with = "entries_as_map")]
    entries: Vec<(String, StatEntry)>,
}

impl StatResult {
    pub fn get(&self, key: &str) -> Option<&StatEntry> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    /// Output keys in result order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatEntry)> {
        self.entries.iter().map(|(k, entry)| (k.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entries_as_map<S: Serializer>(
    entries: &[(String, StatEntry)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, entry) in entries {
        map.serialize_entry(key, entry)?;
    }
    map.end()
}

/// Unprocessed per-geography data from [`Table::raw_data_for_geos`].
/// The error channel is always zero in this dataset; it is retained for
/// API-shape compatibility with datasets that carry margins of error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeoRawData {
    pub estimate: HashMap<String, i64>,
    pub error: HashMap<String, i64>,
}

/// Ratio of a count to its denominator; a percentage of an empty
/// universe is presented as 0, not a division error.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl Table {
    /// Get a data dictionary for one place from this table.
    ///
    /// Fetches the row for `geo`, recodes and accumulates the selected
    /// fields, and returns the ordered result set together with the
    /// denominator used. A geography with no stored row yields zeros.
    pub fn get_stat_data(
        &self,
        store: &DataStore,
        geo: &Geography,
        params: &StatParams,
    ) -> Result<(StatResult, i64)> {
        let columns = self.columns(store)?;

        // Resolve and validate the selected fields before any data query.
        // An empty selection means the same as none: all data columns.
        let fields: Vec<String> = match params.fields.as_deref() {
            Some(requested) if !requested.is_empty() => {
                for field in requested {
                    if !columns.contains(field) {
                        return Err(EngineError::InvalidField {
                            field: field.clone(),
                            table: self.id().to_string(),
                            valid: columns.valid_list(),
                        });
                    }
                }
                requested.to_vec()
            }
            _ => columns.keys().map(str::to_string).collect(),
        };

        if let Some(TotalSpec::Column(column)) = &params.total {
            if !columns.contains(column) {
                return Err(EngineError::InvalidTotalColumn {
                    column: column.clone(),
                    table: self.id().to_string(),
                    valid: columns.valid_list(),
                });
            }
        }

        // The denominator column is fetched too when it sits outside the
        // selected fields.
        let mut query_columns = fields.clone();
        if let Some(TotalSpec::Column(column)) = &params.total {
            if !query_columns.contains(column) {
                query_columns.push(column.clone());
            }
        }

        let session = store.session()?;
        let row: RawRow = session
            .fetch_one(self.db_table(), &query_columns, geo)?
            .unwrap_or_default();
        drop(session);

        let raw = |field: &str| -> i64 { row.get(field).copied().flatten().unwrap_or(0) };

        let total: i64 = match &params.total {
            None => fields.iter().map(|field| raw(field)).sum(),
            Some(TotalSpec::Column(column)) => raw(column),
            Some(TotalSpec::Value(value)) => *value,
        };

        let key_order: &[String] = params.key_order.as_deref().unwrap_or(&fields);

        let mut result = StatResult {
            table_id: self.id().to_string(),
            universe: self.universe().to_string(),
            description: self.description().to_string(),
            stat_type: self.stat_type(),
            entries: Vec::with_capacity(key_order.len()),
        };

        // Multiple fields may recode to the same output key, so values
        // accumulate into any existing partial entry rather than
        // overwriting it.
        for field in key_order {
            let val = raw(field);
            let key = params
                .recode
                .get(field)
                .cloned()
                .unwrap_or_else(|| field.clone());
            let name = params.recode.get(field).cloned().unwrap_or_else(|| {
                columns
                    .get(field)
                    .map(|info| info.name.clone())
                    .unwrap_or_else(|| field.clone())
            });

            let pos = match result.entries.iter().position(|(k, _)| k == &key) {
                Some(pos) => pos,
                None => {
                    result.entries.push((
                        key,
                        StatEntry {
                            name,
                            values: ValueSet { this: 0.0 },
                            numerators: None,
                        },
                    ));
                    result.entries.len() - 1
                }
            };
            let entry = &mut result.entries[pos].1;

            if params.percent {
                let numerator =
                    entry.numerators.as_ref().map_or(0.0, |n| n.this) + val as f64;
                entry.values = ValueSet {
                    this: ratio(numerator, total as f64),
                };
                entry.numerators = Some(ValueSet { this: numerator });
            } else {
                entry.values = ValueSet {
                    this: entry.values.this + val as f64,
                };
            }
        }

        Ok((result, total))
    }

    /// Unprocessed multi-geography counterpart to [`Table::get_stat_data`]:
    /// raw estimates per column for every requested geography, keyed
    /// `"<level>-<code>"`. Geographies with no stored row get all-zero
    /// estimates, never a missing key.
    pub fn raw_data_for_geos(
        &self,
        store: &DataStore,
        geos: &[Geography],
    ) -> Result<HashMap<String, GeoRawData>> {
        let columns: Vec<String> = self
            .columns(store)?
            .keys()
            .map(str::to_string)
            .collect();

        let mut data = HashMap::with_capacity(geos.len());
        for (geo, row) in store.fetch_rows(self, geos)? {
            let mut geo_values = GeoRawData::default();
            for column in &columns {
                let val = row.get(column).copied().flatten().unwrap_or(0);
                geo_values.estimate.insert(column.clone(), val);
                geo_values.error.insert(column.clone(), 0);
            }
            data.insert(geo.geo_key(), geo_values);
        }

        Ok(data)
    }
}
