use super::{FieldMapping, MappingKind};
use crate::error::{MappingError, MappingResult};
use crate::schema::RecordSchema;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Every mapped field of one record type.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    tables: Vec<String>,
    raw_schema: String,
    record_schema: Arc<RecordSchema>,
    mappings: Vec<FieldMapping>,
    by_name: HashMap<String, usize>,
}

impl EntitySchema {
    pub fn new(
        tables: Vec<String>,
        record_schema: Arc<RecordSchema>,
        raw_schema: impl Into<String>,
        mappings: Vec<FieldMapping>,
    ) -> Self {
        let by_name = mappings
            .iter()
            .enumerate()
            .map(|(i, m)| (m.field_name().to_string(), i))
            .collect();
        Self {
            name: record_schema.name().to_string(),
            tables,
            raw_schema: raw_schema.into(),
            record_schema,
            mappings,
            by_name,
        }
    }

    /// Same mappings over a different (shape-compatible) record schema.
    pub fn with_record_schema(&self, record_schema: Arc<RecordSchema>) -> Self {
        Self {
            record_schema,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables the entity may be stored in (the record's `tables` attribute).
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn raw_schema(&self) -> &str {
        &self.raw_schema
    }

    pub fn record_schema(&self) -> &Arc<RecordSchema> {
        &self.record_schema
    }

    pub fn field_mapping(&self, field_name: &str) -> Option<&FieldMapping> {
        self.by_name.get(field_name).map(|&i| &self.mappings[i])
    }

    /// Mappings in field declaration order.
    pub fn field_mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn required_columns(&self) -> BTreeSet<String> {
        self.mappings.iter().filter_map(FieldMapping::column_name).collect()
    }

    pub fn required_column_families(&self) -> BTreeSet<String> {
        self.mappings
            .iter()
            .filter_map(FieldMapping::family)
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

/// The key fields of a record type, in ascending key order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySchema {
    raw_schema: String,
    record_schema: Arc<RecordSchema>,
    mappings: Vec<FieldMapping>,
}

impl KeySchema {
    /// Project the key fields of `entity` into a key record.
    ///
    /// Key positions must be unique and cover `0..n`.
    pub fn new(
        entity: &RecordSchema,
        raw_schema: impl Into<String>,
        mappings: impl IntoIterator<Item = FieldMapping>,
    ) -> MappingResult<Self> {
        let mut mappings: Vec<FieldMapping> = mappings
            .into_iter()
            .filter(|m| m.kind() == MappingKind::Key)
            .collect();
        mappings.sort_by_key(|m| m.key_position());
        for (expected, m) in mappings.iter().enumerate() {
            if m.key_position() != Some(expected) {
                return Err(MappingError::schema(format!(
                    "key positions of '{}' must be unique and dense from 0; field '{}' has position {}, expected {expected}",
                    entity.full_name(),
                    m.field_name(),
                    m.location()
                )));
            }
        }
        let names: Vec<&str> = mappings.iter().map(FieldMapping::field_name).collect();
        let record_schema = Arc::new(entity.project(&names)?);
        Ok(Self {
            raw_schema: raw_schema.into(),
            record_schema,
            mappings,
        })
    }

    pub fn raw_schema(&self) -> &str {
        &self.raw_schema
    }

    /// Record holding exactly the key fields, in key order.
    pub fn record_schema(&self) -> &Arc<RecordSchema> {
        &self.record_schema
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Record holding the first `len` key fields.
    pub fn prefix_schema(&self, len: usize) -> MappingResult<Arc<RecordSchema>> {
        if len > self.len() {
            return Err(MappingError::Precondition(format!(
                "key prefix of {len} fields requested, key has {}",
                self.len()
            )));
        }
        if len == self.len() {
            return Ok(self.record_schema.clone());
        }
        let names: Vec<&str> = self.mappings[..len].iter().map(FieldMapping::field_name).collect();
        Ok(Arc::new(self.record_schema.project(&names)?))
    }
}
