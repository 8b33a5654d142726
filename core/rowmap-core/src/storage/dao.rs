//! Entity-level access to a [`RowStore`].

use super::RowStore;
use crate::error::{MappingError, MappingResult};
use crate::mapper::EntityMapper;
use crate::record::Record;
use crate::value::Value;
use std::sync::Arc;

/// Pairs a mapper with a store and a table.
pub struct EntityDao<E, S> {
    mapper: Arc<EntityMapper<E>>,
    store: Arc<S>,
    table: String,
}

impl<E: Record, S: RowStore> EntityDao<E, S> {
    /// Uses the first table the entity schema lists.
    pub fn new(mapper: Arc<EntityMapper<E>>, store: Arc<S>) -> MappingResult<Self> {
        let table = mapper.entity_schema().tables().first().cloned().ok_or_else(|| {
            MappingError::Precondition(format!(
                "schema '{}' lists no tables",
                mapper.entity_schema().record_schema().full_name()
            ))
        })?;
        Ok(Self::with_table(mapper, store, table))
    }

    pub fn with_table(mapper: Arc<EntityMapper<E>>, store: Arc<S>, table: impl Into<String>) -> Self {
        Self {
            mapper,
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mapper(&self) -> &Arc<EntityMapper<E>> {
        &self.mapper
    }

    /// Entity stored under `key` (a key record or an entity).
    pub fn get(&self, key: &dyn Record) -> MappingResult<Option<E>> {
        let key = self.mapper.key_serde().serialize(key)?;
        match self.store.get(&self.table, &key)? {
            Some(row) => self.mapper.map_to_entity(&row),
            None => Ok(None),
        }
    }

    pub fn put(&self, entity: &E) -> MappingResult<()> {
        let mutation = self.mapper.map_from_entity(entity)?;
        self.store.put(&self.table, &mutation)
    }

    /// Add `amount` to a counter field; returns the new value.
    pub fn increment(&self, key: &dyn Record, field_name: &str, amount: i64) -> MappingResult<i64> {
        let increment = self.mapper.map_to_increment(key, field_name, amount)?;
        let result = self.store.increment(&self.table, &increment)?;
        self.mapper.map_from_increment_result(&result, field_name)
    }

    /// Entities whose leading key fields equal `key_prefix`, in key order.
    pub fn scan(&self, key_prefix: &[Value]) -> MappingResult<Vec<E>> {
        let prefix = self.mapper.key_serde().serialize_parts(key_prefix)?;
        let mut entities = Vec::new();
        for row in self.store.scan_prefix(&self.table, &prefix)? {
            if let Some(entity) = self.mapper.map_to_entity(&row)? {
                entities.push(entity);
            }
        }
        tracing::trace!(table = %self.table, found = entities.len(), "scanned key prefix");
        Ok(entities)
    }
}
