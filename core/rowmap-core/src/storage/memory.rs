//! In-memory row store over ordered maps.

use super::{Cell, Increment, Row, RowMutation, RowStore};
use crate::error::{MappingError, MappingResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// In-memory [`RowStore`]: table name → row key → row.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<String, BTreeMap<Vec<u8>, Row>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl RowStore for MemoryRowStore {
    fn get(&self, table: &str, key: &[u8]) -> MappingResult<Option<Row>> {
        let tables = self.tables.read();
        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    fn put(&self, table: &str, mutation: &RowMutation) -> MappingResult<()> {
        if mutation.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write();
        let row = tables
            .entry(table.to_string())
            .or_default()
            .entry(mutation.key().to_vec())
            .or_insert_with(|| Row::new(mutation.key()));
        for cell in mutation.cells() {
            row.insert(cell.clone());
        }
        Ok(())
    }

    fn increment(&self, table: &str, increment: &Increment) -> MappingResult<Row> {
        let mut tables = self.tables.write();
        let row = tables
            .entry(table.to_string())
            .or_default()
            .entry(increment.key.clone())
            .or_insert_with(|| Row::new(increment.key.as_slice()));

        let current = match row.value(&increment.family, &increment.qualifier) {
            None => 0,
            Some(bytes) => <[u8; 8]>::try_from(bytes).map(i64::from_be_bytes).map_err(|_| {
                MappingError::serialization(format!(
                    "counter cell holds {} bytes, expected 8",
                    bytes.len()
                ))
            })?,
        };
        let cell = Cell::new(
            increment.family.as_slice(),
            increment.qualifier.as_slice(),
            current.wrapping_add(increment.amount).to_be_bytes(),
        );
        row.insert(cell.clone());
        Ok(Row::from_cells(increment.key.as_slice(), [cell]))
    }

    fn scan_prefix(&self, table: &str, prefix: &[u8]) -> MappingResult<Vec<Row>> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, row)| row.clone())
            .collect())
    }
}
