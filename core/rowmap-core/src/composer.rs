//! Structural access to entity fields, independent of representation.

use crate::codec::RecordCodec;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{EntitySchema, KeySchema, MappingKind};
use crate::record::{GenericRecord, Record, RecordFactory};
use crate::schema::{RecordSchema, Schema};
use crate::value::Value;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Key values of one entity, in key order.
pub type KeyParts = SmallVec<[Value; 4]>;

/// Gets and sets entity fields by name and flattens key-as-column fields.
pub struct EntityComposer<E> {
    entity_schema: Arc<EntitySchema>,
    factory: Arc<dyn RecordFactory<E>>,
    /// Record positions of the key fields, in key order.
    key_positions: Vec<usize>,
    /// Blank sub-records for record-typed key-as-column fields.
    kac_templates: HashMap<String, GenericRecord>,
}

impl<E: Record> EntityComposer<E> {
    pub fn new(
        entity_schema: Arc<EntitySchema>,
        key_schema: &KeySchema,
        factory: Arc<dyn RecordFactory<E>>,
        codec: &dyn RecordCodec,
    ) -> MappingResult<Self> {
        let record = entity_schema.record_schema().clone();
        let key_positions = key_schema
            .mappings()
            .iter()
            .map(|m| position(&record, m.field_name()))
            .collect::<MappingResult<Vec<_>>>()?;

        let mut kac_templates = HashMap::new();
        for mapping in entity_schema.field_mappings() {
            if mapping.kind() != MappingKind::KeyAsColumn {
                continue;
            }
            let field = field_schema(&record, mapping.field_name())?;
            match field {
                Schema::Record(sub) => {
                    kac_templates.insert(mapping.field_name().to_string(), template(sub, codec)?);
                }
                Schema::Map(_) => {}
                other => return Err(kac_type_error(other)),
            }
        }

        Ok(Self {
            entity_schema,
            factory,
            key_positions,
            kac_templates,
        })
    }

    pub fn entity_schema(&self) -> &Arc<EntitySchema> {
        &self.entity_schema
    }

    /// Fresh builder for one entity.
    pub fn builder(&self) -> EntityBuilder<E> {
        EntityBuilder {
            record: self.factory.create(),
            schema: self.entity_schema.record_schema().clone(),
        }
    }

    /// Field value; a null numeric or boolean primitive reads as its zero.
    pub fn extract_field(&self, entity: &E, field_name: &str) -> MappingResult<Value> {
        let record = self.entity_schema.record_schema();
        let field = record.field(field_name).ok_or_else(|| unknown(record, field_name))?;
        let value = entity.get(field.position());
        if value.is_null() {
            if let Some(zero) = field.schema().zero_value() {
                return Ok(zero);
            }
        }
        Ok(value)
    }

    /// Key values of `entity` in key order.
    pub fn key_parts(&self, entity: &E) -> KeyParts {
        self.key_positions.iter().map(|&pos| entity.get(pos)).collect()
    }

    /// Flatten a map- or record-valued field into named entries.
    pub fn extract_key_as_column_values(
        &self,
        field_name: &str,
        value: &Value,
    ) -> MappingResult<BTreeMap<String, Value>> {
        let schema = field_schema(self.entity_schema.record_schema(), field_name)?;
        match (schema, value) {
            (_, Value::Null) => Ok(BTreeMap::new()),
            (Schema::Map(_), Value::Map(entries)) => Ok(entries.clone()),
            (Schema::Record(_), Value::Record(record)) => Ok(record
                .schema()
                .fields()
                .iter()
                .map(|f| (f.name().to_string(), record.get(f.position())))
                .collect()),
            (Schema::Map(_) | Schema::Record(_), other) => Err(MappingError::serialization(format!(
                "field '{field_name}' holds {} where {schema} was expected",
                other.type_label()
            ))),
            (other, _) => Err(kac_type_error(other)),
        }
    }

    /// Inverse of [`extract_key_as_column_values`](Self::extract_key_as_column_values).
    ///
    /// Record sub-fields missing from `values` take their declared default,
    /// else the primitive zero, else null.
    pub fn build_key_as_column_field(
        &self,
        field_name: &str,
        values: BTreeMap<String, Value>,
    ) -> MappingResult<Value> {
        let schema = field_schema(self.entity_schema.record_schema(), field_name)?;
        match schema {
            Schema::Map(_) => Ok(Value::Map(values)),
            Schema::Record(_) => {
                let mut record = self
                    .kac_templates
                    .get(field_name)
                    .cloned()
                    .ok_or_else(|| MappingError::Precondition(format!("'{field_name}' is not a keyAsColumn field")))?;
                for (name, value) in values {
                    record.put_by_name(&name, value)?;
                }
                Ok(Value::Record(record))
            }
            other => Err(kac_type_error(other)),
        }
    }
}

/// Stateful put-by-name builder. Not reusable across entities.
pub struct EntityBuilder<E> {
    record: E,
    schema: Arc<RecordSchema>,
}

impl<E: Record> EntityBuilder<E> {
    pub fn put(&mut self, field_name: &str, value: Value) -> MappingResult<&mut Self> {
        let pos = position(&self.schema, field_name)?;
        self.record.put(pos, value)?;
        Ok(self)
    }

    pub fn build(self) -> E {
        self.record
    }
}

fn template(schema: &Arc<RecordSchema>, codec: &dyn RecordCodec) -> MappingResult<GenericRecord> {
    let mut record = GenericRecord::new(schema.clone());
    for field in schema.fields() {
        let fill = match codec.default_value(field)? {
            Some(default) => default,
            None => field.schema().zero_value().unwrap_or_default(),
        };
        record.put(field.position(), fill)?;
    }
    Ok(record)
}

fn position(record: &RecordSchema, field_name: &str) -> MappingResult<usize> {
    record.position(field_name).ok_or_else(|| unknown(record, field_name))
}

fn field_schema<'a>(record: &'a RecordSchema, field_name: &str) -> MappingResult<&'a Schema> {
    record
        .field(field_name)
        .map(|f| f.schema())
        .ok_or_else(|| unknown(record, field_name))
}

fn unknown(record: &RecordSchema, field_name: &str) -> MappingError {
    MappingError::UnknownField {
        field: field_name.to_string(),
        schema: record.full_name(),
    }
}

fn kac_type_error(schema: &Schema) -> MappingError {
    MappingError::schema(format!(
        "only map or record types are valid for keyAsColumn fields, found {schema}"
    ))
}
