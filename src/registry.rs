//! Lookup from table id to descriptor.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::table::{Table, TableKind};

/// Registry of declared tables, owned by the application's composition
/// root. Registration happens at startup and requires `&mut`; steady-state
/// lookups are read-only.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Arc<Table>>,
    // Insertion order, for stable iteration.
    order: Vec<String>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. A duplicate id is a conflict, not an overwrite:
    /// two field tables declared with the same fields in different orders
    /// derive the same id, and that collision should surface at
    /// declaration time.
    pub fn register(&mut self, table: Table) -> Result<Arc<Table>> {
        let id = table.id().to_string();
        if self.tables.contains_key(&id) {
            return Err(EngineError::DuplicateTable(id));
        }

        let table = Arc::new(table);
        self.tables.insert(id.clone(), Arc::clone(&table));
        self.order.push(id);
        Ok(table)
    }

    /// Look up a descriptor by id (case-insensitive).
    pub fn lookup(&self, id: &str) -> Option<Arc<Table>> {
        self.tables.get(&id.to_uppercase()).cloned()
    }

    /// All registered descriptors, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.order.iter().filter_map(|id| self.tables.get(id))
    }

    /// Union of all registered field tables' field names, sorted.
    pub fn field_names(&self) -> BTreeSet<String> {
        self.tables
            .values()
            .filter_map(|table| match table.kind() {
                TableKind::Field { fields, .. } => Some(fields.iter().cloned()),
                TableKind::Simple { .. } => None,
            })
            .flatten()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
