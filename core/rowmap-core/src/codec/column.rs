//! Single-column value codec.
//!
//! `int` → 4-byte big-endian, `long` → 8-byte big-endian, `string` → raw
//! UTF-8. Every other type goes through the structured [`RecordCodec`].
//! Counter cells are always 8-byte big-endian whatever the declared type,
//! matching what a store-side atomic increment produces.

use super::RecordCodec;
use crate::error::{MappingError, MappingResult};
use crate::schema::Schema;
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ColumnCodec {
    delegate: Arc<dyn RecordCodec>,
}

impl ColumnCodec {
    pub fn new(delegate: Arc<dyn RecordCodec>) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &Arc<dyn RecordCodec> {
        &self.delegate
    }

    /// Whether `schema` is stored in packed form rather than delegated.
    pub fn is_packed(schema: &Schema) -> bool {
        matches!(schema, Schema::Int | Schema::Long | Schema::String)
    }

    pub fn encode(&self, value: &Value, schema: &Schema) -> MappingResult<Vec<u8>> {
        match (schema, value) {
            (Schema::Int, Value::Int(v)) => Ok(v.to_be_bytes().to_vec()),
            (Schema::Long, Value::Long(v)) => Ok(v.to_be_bytes().to_vec()),
            (Schema::Long, Value::Int(v)) => Ok(i64::from(*v).to_be_bytes().to_vec()),
            (Schema::String, Value::String(s)) => Ok(s.as_bytes().to_vec()),
            (Schema::Int | Schema::Long | Schema::String, other) => Err(MappingError::serialization(
                format!("cannot encode {} as a {} column", other.type_label(), schema.type_name()),
            )),
            _ => self.delegate.encode(value, schema),
        }
    }

    /// Decode a cell written as `written`, resolved to `read`.
    pub fn decode(&self, bytes: &[u8], written: &Schema, read: &Schema) -> MappingResult<Value> {
        if Self::is_packed(written) {
            let raw = decode_packed(bytes, written)?;
            self.delegate.resolve(raw, written, read)
        } else {
            self.delegate.decode(bytes, written, read)
        }
    }

    /// 8-byte big-endian counter cell for an `int` or `long` value.
    pub fn encode_counter(&self, value: &Value) -> MappingResult<Vec<u8>> {
        match value {
            Value::Int(v) => Ok(i64::from(*v).to_be_bytes().to_vec()),
            Value::Long(v) => Ok(v.to_be_bytes().to_vec()),
            other => Err(MappingError::serialization(format!(
                "cannot encode {} as a counter",
                other.type_label()
            ))),
        }
    }

    /// Counter cell narrowed to `read` (`int` or `long`).
    pub fn decode_counter(&self, bytes: &[u8], read: &Schema) -> MappingResult<Value> {
        let raw = counter_value(bytes)?;
        match read {
            Schema::Int => i32::try_from(raw).map(Value::Int).map_err(|_| {
                MappingError::serialization(format!("counter value {raw} does not fit an int field"))
            }),
            Schema::Long => Ok(Value::Long(raw)),
            other => Err(MappingError::serialization(format!(
                "counter cannot be read as {other}"
            ))),
        }
    }
}

/// Value of a counter cell. Store-native cells are 8 bytes; 4-byte cells
/// left by `int` columns are accepted too.
pub fn counter_value(bytes: &[u8]) -> MappingResult<i64> {
    if let Ok(wide) = <[u8; 8]>::try_from(bytes) {
        Ok(i64::from_be_bytes(wide))
    } else if let Ok(narrow) = <[u8; 4]>::try_from(bytes) {
        Ok(i64::from(i32::from_be_bytes(narrow)))
    } else {
        Err(MappingError::serialization(format!(
            "counter cell must be 8 or 4 bytes, got {}",
            bytes.len()
        )))
    }
}

fn decode_packed(bytes: &[u8], schema: &Schema) -> MappingResult<Value> {
    let wrong_width = |want: usize| {
        MappingError::serialization(format!(
            "{} column must be {want} bytes, got {}",
            schema.type_name(),
            bytes.len()
        ))
    };
    Ok(match schema {
        Schema::Int => Value::Int(i32::from_be_bytes(
            bytes.try_into().map_err(|_| wrong_width(4))?,
        )),
        Schema::Long => Value::Long(i64::from_be_bytes(
            bytes.try_into().map_err(|_| wrong_width(8))?,
        )),
        _ => Value::String(
            std::str::from_utf8(bytes)
                .map_err(|e| MappingError::serialization(format!("invalid utf-8 column: {e}")))?
                .to_string(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryCodec;

    fn codec() -> ColumnCodec {
        ColumnCodec::new(BinaryCodec::shared())
    }

    #[test]
    fn test_packed_forms() {
        let c = codec();
        assert_eq!(c.encode(&Value::Int(1), &Schema::Int).unwrap(), vec![0, 0, 0, 1]);
        assert_eq!(c.encode(&Value::Long(-1), &Schema::Long).unwrap(), vec![0xff; 8]);
        assert_eq!(c.encode(&Value::from("hi"), &Schema::String).unwrap(), b"hi".to_vec());
        assert_eq!(
            c.decode(&[0, 0, 0, 7], &Schema::Int, &Schema::Int).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn test_packed_int_read_as_long() {
        assert_eq!(
            codec().decode(&[0, 0, 1, 0], &Schema::Int, &Schema::Long).unwrap(),
            Value::Long(256)
        );
    }

    #[test]
    fn test_wrong_width_rejected() {
        let err = codec().decode(&[0, 1], &Schema::Long, &Schema::Long).unwrap_err();
        assert!(err.to_string().contains("must be 8 bytes"));
    }

    #[test]
    fn test_other_types_delegate() {
        let schema = Schema::Union(vec![Schema::Null, Schema::Int]);
        let c = codec();
        let bytes = c.encode(&Value::Int(1), &schema).unwrap();
        assert_eq!(bytes, vec![0x02, 0x02]);
        assert_eq!(c.decode(&bytes, &schema, &schema).unwrap(), Value::Int(1));
        assert_eq!(c.encode(&Value::Boolean(true), &Schema::Boolean).unwrap(), vec![1]);
    }

    #[test]
    fn test_counter_cells_are_wide() {
        let c = codec();
        assert_eq!(c.encode_counter(&Value::Int(3)).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(c.encode_counter(&Value::Long(-1)).unwrap(), vec![0xff; 8]);
        assert!(c.encode_counter(&Value::from("x")).is_err());

        assert_eq!(c.decode_counter(&[0, 0, 0, 0, 0, 0, 0, 5], &Schema::Int).unwrap(), Value::Int(5));
        assert_eq!(c.decode_counter(&[0, 0, 0, 5], &Schema::Long).unwrap(), Value::Long(5));
        assert_eq!(c.decode_counter(&[0xff; 8], &Schema::Int).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_counter_narrowing_out_of_range() {
        let bytes = (i64::from(i32::MAX) + 1).to_be_bytes();
        let err = codec().decode_counter(&bytes, &Schema::Int).unwrap_err();
        assert!(err.to_string().contains("does not fit an int"));
        assert!(counter_value(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_packed_type_mismatch() {
        assert!(codec().encode(&Value::Null, &Schema::Int).is_err());
    }
}
