use super::{EntitySchema, FieldMapping, KeySchema, MappingKind};
use crate::codec::{BinaryCodec, RecordCodec};
use crate::error::{MappingError, MappingResult};
use crate::record::GenericRecord;
use crate::schema::{Field, RecordSchema, Schema};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads `mapping` annotations out of a record schema.
///
/// ```json
/// {"name": "id", "type": "long", "mapping": {"type": "key", "value": "0"}}
/// ```
///
/// Fields without an annotation, or with an unrecognised mapping type, are
/// left out of the mapper.
#[derive(Debug, Clone)]
pub struct KeyEntitySchemaParser {
    codec: Arc<dyn RecordCodec>,
}

impl Default for KeyEntitySchemaParser {
    fn default() -> Self {
        Self::new(BinaryCodec::shared())
    }
}

impl KeyEntitySchemaParser {
    /// `codec` supplies default-value semantics.
    pub fn new(codec: Arc<dyn RecordCodec>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Arc<dyn RecordCodec> {
        &self.codec
    }

    pub fn parse_entity_schema(&self, raw_schema: &str) -> MappingResult<EntitySchema> {
        let record = Schema::parse_record(raw_schema)?;
        let mappings = self.field_mappings(&record)?;
        // Rejects bad key positions even when only the entity side is used.
        KeySchema::new(&record, raw_schema, mappings.iter().cloned())?;
        let tables = tables(&record)?;
        tracing::debug!(
            entity = %record.full_name(),
            mapped = mappings.len(),
            "parsed entity schema"
        );
        Ok(EntitySchema::new(tables, record, raw_schema, mappings))
    }

    pub fn parse_key_schema(&self, raw_schema: &str) -> MappingResult<KeySchema> {
        let record = Schema::parse_record(raw_schema)?;
        let mappings = self.field_mappings(&record)?;
        KeySchema::new(&record, raw_schema, mappings)
    }

    /// Both schemas from one parse of the text.
    pub fn parse(&self, raw_schema: &str) -> MappingResult<(EntitySchema, KeySchema)> {
        let record = Schema::parse_record(raw_schema)?;
        let mappings = self.field_mappings(&record)?;
        let key = KeySchema::new(&record, raw_schema, mappings.iter().cloned())?;
        let tables = tables(&record)?;
        Ok((EntitySchema::new(tables, record, raw_schema, mappings), key))
    }

    fn field_mappings(&self, record: &RecordSchema) -> MappingResult<Vec<FieldMapping>> {
        let mut defaults = self.default_values(record)?;
        let mut mappings = Vec::new();
        for field in record.fields() {
            if let Some(mapping) = field_mapping(field, defaults.remove(field.name()))? {
                tracing::debug!(
                    field = field.name(),
                    kind = %mapping.kind(),
                    location = mapping.location(),
                    "parsed field mapping"
                );
                mappings.push(mapping);
            }
        }
        Ok(mappings)
    }

    /// Defaults obtained by writing an empty record and reading it back
    /// through a schema holding only the defaulted fields, so they follow
    /// the codec's own resolution rules.
    fn default_values(&self, record: &RecordSchema) -> MappingResult<HashMap<String, Value>> {
        let defaulted: Vec<Field> = record
            .fields()
            .iter()
            .filter(|f| f.default().is_some())
            .cloned()
            .collect();
        if defaulted.is_empty() {
            return Ok(HashMap::new());
        }
        let names: Vec<String> = defaulted.iter().map(|f| f.name().to_string()).collect();

        let empty = Arc::new(RecordSchema::anonymous(Vec::new())?);
        let values_only = Schema::Record(Arc::new(RecordSchema::anonymous(defaulted)?));
        let empty_schema = Schema::Record(empty.clone());
        let bytes = self
            .codec
            .encode(&Value::Record(GenericRecord::new(empty)), &empty_schema)?;
        let decoded = self.codec.decode(&bytes, &empty_schema, &values_only)?;
        let Value::Record(defaults) = decoded else {
            return Err(MappingError::schema(format!(
                "default values of '{}' did not decode to a record",
                record.full_name()
            )));
        };
        Ok(names
            .into_iter()
            .zip(defaults.values().iter().cloned())
            .collect())
    }
}

fn field_mapping(field: &Field, default_value: Option<Value>) -> MappingResult<Option<FieldMapping>> {
    let Some(annotation) = field.prop("mapping") else {
        return Ok(None);
    };
    let invalid = |msg: &str| MappingError::schema(format!("field '{}': {msg}", field.name()));

    let annotation = annotation
        .as_object()
        .ok_or_else(|| invalid("mapping attribute must be an object"))?;
    let kind_name = annotation
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| invalid("mapping attribute must contain type"))?;
    let Some(kind) = MappingKind::parse(kind_name) else {
        tracing::debug!(field = field.name(), mapping_type = kind_name, "ignoring unknown mapping type");
        return Ok(None);
    };
    let location = match annotation.get("value") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) if kind == MappingKind::Key => n.to_string(),
        Some(_) => return Err(invalid("mapping value must be a string")),
        None => return Err(invalid(&format!("{kind} mapping must contain a value"))),
    };

    match (kind, field.schema()) {
        (MappingKind::Counter, Schema::Int | Schema::Long) => {}
        (MappingKind::Counter, other) => {
            return Err(invalid(&format!(
                "counter mapping type must be an int or a long, found {other}"
            )));
        }
        (MappingKind::KeyAsColumn, Schema::Map(_) | Schema::Record(_)) => {}
        (MappingKind::KeyAsColumn, other) => {
            return Err(invalid(&format!(
                "only map or record types are valid for keyAsColumn, found {other}"
            )));
        }
        (MappingKind::Key, schema) => crate::codec::ordered::validate(schema)?,
        _ => {}
    }

    FieldMapping::new(field.name(), kind, location, default_value).map(Some)
}

fn tables(record: &RecordSchema) -> MappingResult<Vec<String>> {
    match record.prop("tables") {
        None => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|t| {
                t.as_str().map(str::to_string).ok_or_else(|| {
                    MappingError::schema(format!("tables of '{}' must be strings", record.full_name()))
                })
            })
            .collect(),
        Some(_) => Err(MappingError::schema(format!(
            "tables of '{}' must be an array",
            record.full_name()
        ))),
    }
}
