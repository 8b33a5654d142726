use crate::codec::{ByteReader, ordered};
use crate::error::{MappingError, MappingResult};
use crate::mapping::KeySchema;
use crate::record::{GenericRecord, Record};
use crate::schema::RecordSchema;
use crate::value::Value;
use std::sync::Arc;

/// Row key encoder/decoder.
///
/// A key is the order-preserving encodings of its fields concatenated in
/// key order. Encoding accepts a leading subset of the fields (a partial
/// key, for prefix scans); decoding always expects every field.
#[derive(Debug, Clone)]
pub struct KeySerDe {
    key_schema: Arc<KeySchema>,
    /// `prefixes[n - 1]` holds the first `n` key fields.
    prefixes: Vec<Arc<RecordSchema>>,
}

impl KeySerDe {
    pub fn new(key_schema: Arc<KeySchema>) -> MappingResult<Self> {
        for field in key_schema.record_schema().fields() {
            ordered::validate(field.schema())?;
        }
        let prefixes = (1..=key_schema.len())
            .map(|len| key_schema.prefix_schema(len))
            .collect::<MappingResult<Vec<_>>>()?;
        Ok(Self { key_schema, prefixes })
    }

    pub fn key_schema(&self) -> &Arc<KeySchema> {
        &self.key_schema
    }

    /// Schema of the first `len` key fields (`1..=N`).
    pub fn prefix_schema(&self, len: usize) -> MappingResult<Arc<RecordSchema>> {
        len.checked_sub(1)
            .and_then(|i| self.prefixes.get(i))
            .cloned()
            .ok_or_else(|| {
                MappingError::Precondition(format!(
                    "key prefix length must be between 1 and {}, got {len}",
                    self.prefixes.len()
                ))
            })
    }

    /// Encode the key fields present on `key`, matched by name.
    ///
    /// `key` may be a full entity, a full key record, or a partial key
    /// record holding a leading run of the key fields.
    pub fn serialize(&self, key: &dyn Record) -> MappingResult<Vec<u8>> {
        let schema = key.schema();
        let parts: Vec<Value> = self
            .key_schema
            .record_schema()
            .fields()
            .iter()
            .map_while(|f| schema.position(f.name()).map(|pos| key.get(pos)))
            .collect();
        if parts.is_empty() {
            return Err(MappingError::Precondition(format!(
                "record '{}' holds none of the key fields",
                schema.full_name()
            )));
        }
        self.serialize_parts(&parts)
    }

    /// Encode leading key values given in key order.
    pub fn serialize_parts(&self, parts: &[Value]) -> MappingResult<Vec<u8>> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }
        let schema = self.prefix_schema(parts.len())?;
        let mut out = Vec::with_capacity(parts.len() * 8);
        for (field, value) in schema.fields().iter().zip(parts) {
            if value.is_null() && !field.schema().is_nullable() {
                return Err(MappingError::NullKeyField {
                    field: field.name().to_string(),
                });
            }
            ordered::encode_into(&mut out, value, field.schema())?;
        }
        tracing::trace!(fields = parts.len(), bytes = out.len(), "serialized row key");
        Ok(out)
    }

    /// Decode a full key.
    pub fn deserialize(&self, bytes: &[u8]) -> MappingResult<GenericRecord> {
        let schema = self.key_schema.record_schema();
        let mut reader = ByteReader::new(bytes);
        let mut record = GenericRecord::new(schema.clone());
        for field in schema.fields() {
            let value = ordered::decode_from(&mut reader, field.schema())?;
            record.put(field.position(), value)?;
        }
        reader.finish()?;
        Ok(record)
    }

    /// Key record (full or partial) holding `values` in key order.
    pub fn key_record(&self, values: Vec<Value>) -> MappingResult<GenericRecord> {
        let mut record = GenericRecord::new(self.prefix_schema(values.len())?);
        for (pos, value) in values.into_iter().enumerate() {
            record.put(pos, value)?;
        }
        Ok(record)
    }
}
