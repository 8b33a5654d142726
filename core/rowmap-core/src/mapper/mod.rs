//! Entity ↔ row mapping.
//!
//! [`EntityMapper`] is the entry point: it turns stored rows into entities,
//! entities into row mutations, and counter fields into increments. Mappers
//! are assembled by [`EntityMapperBuilder`] and are immutable afterwards, so
//! one instance can serve any number of threads.

mod entity_serde;
mod key_serde;
mod provider;

pub use entity_serde::EntitySerDe;
pub use key_serde::KeySerDe;
pub use provider::EntityMapperBuilder;

use crate::codec::column::counter_value;
use crate::composer::EntityComposer;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{EntitySchema, FieldMapping, KeySchema, MappingKind};
use crate::record::Record;
use crate::storage::{Increment, Row, RowMutation};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Maps entities of type `E` onto rows and back.
pub struct EntityMapper<E> {
    key_schema: Arc<KeySchema>,
    entity_schema: Arc<EntitySchema>,
    key_serde: KeySerDe,
    entity_serde: EntitySerDe<E>,
}

impl<E: Record> EntityMapper<E> {
    pub fn new(key_serde: KeySerDe, entity_serde: EntitySerDe<E>) -> Self {
        let key_schema = key_serde.key_schema().clone();
        let entity_schema = entity_serde.entity_schema().clone();
        tracing::info!(
            entity = %entity_schema.record_schema().full_name(),
            key_fields = key_schema.len(),
            mapped_fields = entity_schema.field_mappings().len(),
            "entity mapper ready"
        );
        Self {
            key_schema,
            entity_schema,
            key_serde,
            entity_serde,
        }
    }

    /// Entity stored in `row`, or `None` when no non-key field has a value.
    ///
    /// Absent fields with a declared default take it; defaults do not make
    /// the row count as present.
    pub fn map_to_entity(&self, row: &Row) -> MappingResult<Option<E>> {
        let key = self.key_serde.deserialize(row.key())?;
        let mut builder = self.composer().builder();
        let mut all_absent = true;

        for mapping in self.entity_schema.field_mappings() {
            let value = match mapping.key_position() {
                Some(pos) => Some(key.get(pos)),
                None => self.entity_serde.deserialize(mapping, row)?,
            };
            match value {
                Some(value) => {
                    builder.put(mapping.field_name(), value)?;
                    if !mapping.is_key() {
                        all_absent = false;
                    }
                }
                None => {
                    if let Some(default) = mapping.default_value() {
                        builder.put(mapping.field_name(), default.clone())?;
                    }
                }
            }
        }

        if all_absent {
            tracing::trace!(key_len = row.key().len(), "row holds no fields of this entity");
            return Ok(None);
        }
        Ok(Some(builder.build()))
    }

    /// Key and cells for storing `entity`. Null fields write no cells.
    pub fn map_from_entity(&self, entity: &E) -> MappingResult<RowMutation> {
        let mut mutation = RowMutation::new(self.key_of(entity)?);
        for mapping in self.entity_schema.field_mappings() {
            if mapping.is_key() {
                continue;
            }
            let value = self.composer().extract_field(entity, mapping.field_name())?;
            if value.is_null() {
                continue;
            }
            mutation.extend(self.entity_serde.serialize(mapping, &value)?);
        }
        tracing::trace!(cells = mutation.cells().len(), "mapped entity to row mutation");
        Ok(mutation)
    }

    /// Encoded row key of `entity`.
    pub fn key_of(&self, entity: &E) -> MappingResult<Vec<u8>> {
        self.key_serde.serialize_parts(&self.composer().key_parts(entity))
    }

    /// Counter delta for `field_name` of the row identified by `key`.
    ///
    /// `key` may be a key record or an entity.
    pub fn map_to_increment(&self, key: &dyn Record, field_name: &str, amount: i64) -> MappingResult<Increment> {
        let mapping = self.counter_mapping(field_name)?;
        let (Some(family), Some(qualifier)) = (mapping.family(), mapping.qualifier()) else {
            return Err(MappingError::NotACounter {
                field: field_name.to_string(),
            });
        };
        Ok(Increment {
            key: self.key_serde.serialize(key)?,
            family: family.to_vec(),
            qualifier: qualifier.to_vec(),
            amount,
        })
    }

    /// Counter value held in an increment result row.
    ///
    /// Cells are 8 bytes; 4-byte cells are accepted too.
    pub fn map_from_increment_result(&self, row: &Row, field_name: &str) -> MappingResult<i64> {
        let mapping = self.counter_mapping(field_name)?;
        let bytes = match (mapping.family(), mapping.qualifier()) {
            (Some(f), Some(q)) => row.value(f, q),
            _ => None,
        }
        .ok_or_else(|| {
            MappingError::serialization(format!("increment result holds no cell for counter '{field_name}'"))
        })?;

        counter_value(bytes)
    }

    fn counter_mapping(&self, field_name: &str) -> MappingResult<&FieldMapping> {
        let mapping = self.entity_schema.field_mapping(field_name).ok_or_else(|| {
            MappingError::UnknownField {
                field: field_name.to_string(),
                schema: self.entity_schema.record_schema().full_name(),
            }
        })?;
        if mapping.kind() != MappingKind::Counter {
            return Err(MappingError::NotACounter {
                field: field_name.to_string(),
            });
        }
        Ok(mapping)
    }

    /// `family:qualifier` for every column and counter, `family:` for every
    /// key-as-column field.
    pub fn required_columns(&self) -> BTreeSet<String> {
        self.entity_schema.required_columns()
    }

    pub fn required_column_families(&self) -> BTreeSet<String> {
        self.entity_schema.required_column_families()
    }

    pub fn key_schema(&self) -> &Arc<KeySchema> {
        &self.key_schema
    }

    pub fn entity_schema(&self) -> &Arc<EntitySchema> {
        &self.entity_schema
    }

    pub fn key_serde(&self) -> &KeySerDe {
        &self.key_serde
    }

    pub fn entity_serde(&self) -> &EntitySerDe<E> {
        &self.entity_serde
    }

    pub fn composer(&self) -> &Arc<EntityComposer<E>> {
        self.entity_serde.composer()
    }
}

impl<E> fmt::Debug for EntityMapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapper")
            .field("entity", &self.entity_schema.record_schema().full_name())
            .field("key_fields", &self.key_schema.len())
            .field("mapped_fields", &self.entity_schema.field_mappings().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GenericRecord;
    use crate::storage::Cell;
    use crate::value::Value;

    const SCHEMA: &str = r#"{
        "name": "page", "type": "record",
        "fields": [
            {"name": "site", "type": "string", "mapping": {"type": "key", "value": "0"}},
            {"name": "path", "type": "string", "mapping": {"type": "key", "value": "1"}},
            {"name": "title", "type": ["null", "string"], "mapping": {"type": "column", "value": "meta:title"}},
            {"name": "lang", "type": "string", "default": "en", "mapping": {"type": "column", "value": "meta:lang"}},
            {"name": "views", "type": "long", "mapping": {"type": "counter", "value": "stats:views"}}
        ]
    }"#;

    fn mapper() -> EntityMapper<GenericRecord> {
        EntityMapperBuilder::new(SCHEMA).build_generic().unwrap()
    }

    fn page(m: &EntityMapper<GenericRecord>) -> GenericRecord {
        let mut b = m.composer().builder();
        b.put("site", Value::from("ex.org")).unwrap();
        b.put("path", Value::from("/a")).unwrap();
        b.put("title", Value::from("A")).unwrap();
        b.put("lang", Value::from("de")).unwrap();
        b.build()
    }

    #[test]
    fn test_entity_round_trip() {
        let m = mapper();
        let entity = page(&m);
        let mutation = m.map_from_entity(&entity).unwrap();
        // views is unset but non-nullable, so it is written as zero
        assert_eq!(mutation.cells().len(), 3);
        assert_eq!(mutation.get(b"stats", b"views")[0].value, vec![0; 8]);

        let row = Row::from_cells(mutation.key().to_vec(), mutation.cells().to_vec());
        let back = m.map_to_entity(&row).unwrap().unwrap();
        assert_eq!(back.get_by_name("title"), Some(&Value::from("A")));
        assert_eq!(back.get_by_name("site"), Some(&Value::from("ex.org")));
        assert_eq!(back.get_by_name("views"), Some(&Value::Long(0)));
    }

    #[test]
    fn test_default_and_absence() {
        let m = mapper();
        let key = m.key_of(&page(&m)).unwrap();
        assert!(m.map_to_entity(&Row::new(key.clone())).unwrap().is_none());

        let row = Row::from_cells(key, vec![Cell::new("meta", "title", b"T".to_vec())]);
        let entity = m.map_to_entity(&row).unwrap().unwrap();
        assert_eq!(entity.get_by_name("lang"), Some(&Value::from("en")));
        assert_eq!(entity.get_by_name("views"), Some(&Value::Null));
    }

    #[test]
    fn test_increment() {
        let m = mapper();
        let key = m.key_serde().key_record(vec![Value::from("ex.org"), Value::from("/a")]).unwrap();
        let inc = m.map_to_increment(&key, "views", 5).unwrap();
        assert_eq!(inc.family, b"stats");
        assert_eq!(inc.amount, 5);
        assert_eq!(inc.key, m.key_of(&page(&m)).unwrap());

        assert!(matches!(m.map_to_increment(&key, "title", 1), Err(MappingError::NotACounter { .. })));
        assert!(matches!(m.map_to_increment(&key, "nope", 1), Err(MappingError::UnknownField { .. })));
    }

    #[test]
    fn test_increment_result_widths() {
        let m = mapper();
        let wide = Row::from_cells(b"k".to_vec(), vec![Cell::new("stats", "views", 7i64.to_be_bytes())]);
        assert_eq!(m.map_from_increment_result(&wide, "views").unwrap(), 7);
        let narrow = Row::from_cells(b"k".to_vec(), vec![Cell::new("stats", "views", (-2i32).to_be_bytes())]);
        assert_eq!(m.map_from_increment_result(&narrow, "views").unwrap(), -2);
        let odd = Row::from_cells(b"k".to_vec(), vec![Cell::new("stats", "views", vec![1, 2])]);
        assert!(m.map_from_increment_result(&odd, "views").is_err());
        assert!(m.map_from_increment_result(&Row::new(b"k".to_vec()), "views").is_err());
    }

    #[test]
    fn test_required_columns() {
        let m = mapper();
        assert_eq!(
            m.required_columns().into_iter().collect::<Vec<_>>(),
            ["meta:lang", "meta:title", "stats:views"]
        );
        assert_eq!(m.required_column_families().len(), 2);
    }
}
