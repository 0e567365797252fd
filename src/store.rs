//! SQLite-backed column store: scoped sessions and the row fetcher.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::Result;
use crate::geo::Geography;
use crate::schema::columns::GEO_COLUMNS;
use crate::schema::ddl::generate_create_table;
use crate::table::Table;

/// One numeric value per declared column for a single geography.
/// Absent or NULL values are carried as `None` and resolved to 0 at the
/// point of use.
pub type RawRow = HashMap<String, Option<i64>>;

/// Handle on the backing store. Each engine call opens exactly one
/// [`Session`] for its duration; the session's connection is released on
/// drop on every exit path.
#[derive(Debug)]
pub struct DataStore {
    path: PathBuf,
}

impl DataStore {
    /// Open a store at the given database path, verifying it is reachable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.session()?;
        Ok(store)
    }

    pub(crate) fn session(&self) -> Result<Session> {
        let conn = Connection::open(&self.path)?;
        Ok(Session { conn })
    }

    /// Create the backing relation for a table. The loading pipeline that
    /// populates it is an external collaborator; this exists so schema
    /// builders and fixtures can materialize relations for declared tables.
    pub fn create_table(&self, table: &Table, data_columns: &[&str]) -> Result<()> {
        let session = self.session()?;
        session
            .conn
            .execute(&generate_create_table(table.db_table(), data_columns), [])?;
        Ok(())
    }

    /// Insert one geography's row into a table's backing relation.
    pub fn insert_row(
        &self,
        table: &Table,
        geo: &Geography,
        values: &[(&str, i64)],
    ) -> Result<()> {
        let session = self.session()?;

        let columns: Vec<&str> = values.iter().map(|(col, _)| *col).collect();
        let placeholders = vec!["?"; values.len() + 3];
        let sql = format!(
            "INSERT INTO {} (geo_level, geo_code, geo_version, {}) VALUES ({})",
            table.db_table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&geo.level, &geo.code, &geo.version];
        for (_, val) in values {
            params.push(val);
        }
        session.conn.execute(&sql, params.as_slice())?;
        Ok(())
    }

    /// Non-geo columns of a backing relation, in declared order.
    pub(crate) fn data_columns(&self, db_table: &str) -> Result<Vec<String>> {
        let session = self.session()?;
        session.data_columns(db_table)
    }

    /// Fetch raw rows for a set of geographies in one batched query.
    ///
    /// The result is pre-seeded with an all-zero row for every requested
    /// geography, then overwritten where a stored row was found: a
    /// geography with no recorded data resolves to zeros, never to a
    /// missing key.
    pub fn fetch_rows(
        &self,
        table: &Table,
        geos: &[Geography],
    ) -> Result<HashMap<Geography, RawRow>> {
        let columns: Vec<String> = table
            .columns(self)?
            .keys()
            .map(str::to_string)
            .collect();

        let mut data: HashMap<Geography, RawRow> = geos
            .iter()
            .map(|geo| {
                let zeros = columns.iter().map(|col| (col.clone(), Some(0))).collect();
                (geo.clone(), zeros)
            })
            .collect();

        if geos.is_empty() {
            return Ok(data);
        }

        let session = self.session()?;
        for (geo, row) in session.fetch_many(table.db_table(), &columns, geos)? {
            data.insert(geo, row);
        }

        Ok(data)
    }
}

/// A scoped storage session: one connection, closed on drop.
pub(crate) struct Session {
    conn: Connection,
}

impl Session {
    fn data_columns(&self, db_table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", db_table))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;

        let mut columns = Vec::new();
        for name in names {
            let name = name?;
            if !GEO_COLUMNS.contains(&name.as_str()) {
                columns.push(name);
            }
        }
        Ok(columns)
    }

    /// Fetch the single row for one geography, or `None` if the store has
    /// no data for it.
    pub(crate) fn fetch_one(
        &self,
        db_table: &str,
        columns: &[String],
        geo: &Geography,
    ) -> Result<Option<RawRow>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE geo_level = ?1 AND geo_code = ?2 AND geo_version = ?3",
            columns.join(", "),
            db_table
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params![geo.level, geo.code, geo.version])?;

        match rows.next()? {
            Some(row) => {
                let mut raw = RawRow::with_capacity(columns.len());
                for (idx, col) in columns.iter().enumerate() {
                    raw.insert(col.clone(), row.get::<_, Option<i64>>(idx)?);
                }
                Ok(Some(raw))
            }
            None => Ok(None),
        }
    }

    /// Fetch rows for many geographies with one disjunction filter over
    /// exact `(geo_level, geo_code, geo_version)` triples.
    fn fetch_many(
        &self,
        db_table: &str,
        columns: &[String],
        geos: &[Geography],
    ) -> Result<Vec<(Geography, RawRow)>> {
        let clause = vec!["(geo_level = ? AND geo_code = ? AND geo_version = ?)"; geos.len()]
            .join(" OR ");
        let sql = format!(
            "SELECT geo_level, geo_code, geo_version, {} FROM {} WHERE {}",
            columns.join(", "),
            db_table,
            clause
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(
            geos.iter()
                .flat_map(|geo| [&geo.level, &geo.code, &geo.version]),
        );
        let mut rows = stmt.query(params)?;

        let mut found = Vec::new();
        while let Some(row) = rows.next()? {
            let geo = Geography::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            );
            let mut raw = RawRow::with_capacity(columns.len());
            for (idx, col) in columns.iter().enumerate() {
                raw.insert(col.clone(), row.get::<_, Option<i64>>(idx + 3)?);
            }
            found.push((geo, raw));
        }
        Ok(found)
    }
}
