//! Compact structured-record codec.
//!
//! Wire format:
//! - int/long: zig-zag varint
//! - float/double: little-endian IEEE-754
//! - bytes/string: varint length + raw bytes
//! - boolean: one byte
//! - enum: varint ordinal; union: varint branch index + branch value
//! - array/map: blocks of (varint count, items), closed by a zero count
//! - record: fields in declaration order, no framing
//!
//! Decoding always reads with the schema the bytes were *written* with and
//! then resolves the result against the schema the caller wants to *read*.

use super::ByteReader;
use crate::error::{MappingError, MappingResult};
use crate::record::{GenericRecord, Record};
use crate::schema::{Field, RecordSchema, Schema};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Structured encoder/decoder used for every non-packed column value.
///
/// Pluggable so a mapper can be pointed at a different wire format.
pub trait RecordCodec: Send + Sync + fmt::Debug {
    /// Encode `value` as `schema`.
    fn encode(&self, value: &Value, schema: &Schema) -> MappingResult<Vec<u8>>;

    /// Decode bytes written with `written`, resolved to the `read` shape.
    fn decode(&self, bytes: &[u8], written: &Schema, read: &Schema) -> MappingResult<Value>;

    /// Reshape an already-decoded value from `written` to `read`.
    fn resolve(&self, value: Value, written: &Schema, read: &Schema) -> MappingResult<Value>;

    /// The field's declared default as a value; `None` when it has none.
    fn default_value(&self, field: &Field) -> MappingResult<Option<Value>> {
        field
            .default()
            .map(|json| json_to_value(json, field.schema()))
            .transpose()
    }
}

/// The bundled [`RecordCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl BinaryCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn shared() -> Arc<dyn RecordCodec> {
        Arc::new(Self)
    }
}

impl RecordCodec for BinaryCodec {
    fn encode(&self, value: &Value, schema: &Schema) -> MappingResult<Vec<u8>> {
        let mut out = Vec::new();
        encode_value(&mut out, value, schema)?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8], written: &Schema, read: &Schema) -> MappingResult<Value> {
        let mut reader = ByteReader::new(bytes);
        let value = decode_value(&mut reader, written)?;
        reader.finish()?;
        resolve(value, written, read)
    }

    fn resolve(&self, value: Value, written: &Schema, read: &Schema) -> MappingResult<Value> {
        resolve(value, written, read)
    }
}

// ===== varints =====

pub(crate) fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z & !0x7F != 0 {
        out.push(((z & 0x7F) | 0x80) as u8);
        z >>= 7;
    }
    out.push(z as u8);
}

pub(crate) fn read_long(reader: &mut ByteReader<'_>) -> MappingResult<i64> {
    let mut z: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        if shift >= 64 {
            return Err(MappingError::serialization("varint longer than 10 bytes"));
        }
        z |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok((z >> 1) as i64 ^ -((z & 1) as i64))
}

fn read_int(reader: &mut ByteReader<'_>) -> MappingResult<i32> {
    let n = read_long(reader)?;
    i32::try_from(n).map_err(|_| MappingError::serialization(format!("int out of range: {n}")))
}

fn read_len(reader: &mut ByteReader<'_>) -> MappingResult<usize> {
    let n = read_long(reader)?;
    usize::try_from(n).map_err(|_| MappingError::serialization(format!("negative length: {n}")))
}

// ===== encode =====

fn cannot_encode(value: &Value, schema: &Schema) -> MappingError {
    MappingError::serialization(format!("cannot encode {} as {schema}", value.type_label()))
}

fn encode_value(out: &mut Vec<u8>, value: &Value, schema: &Schema) -> MappingResult<()> {
    match (schema, value) {
        (Schema::Union(branches), _) => {
            let idx = value
                .union_branch(branches)
                .ok_or_else(|| cannot_encode(value, schema))?;
            write_long(out, idx as i64);
            encode_value(out, value, &branches[idx])
        }
        (Schema::Null, Value::Null) => Ok(()),
        (Schema::Boolean, Value::Boolean(b)) => {
            out.push(u8::from(*b));
            Ok(())
        }
        (Schema::Int, Value::Int(v)) => {
            write_long(out, i64::from(*v));
            Ok(())
        }
        (Schema::Long, Value::Long(v)) => {
            write_long(out, *v);
            Ok(())
        }
        (Schema::Long, Value::Int(v)) => {
            write_long(out, i64::from(*v));
            Ok(())
        }
        (Schema::Float, Value::Float(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Schema::Double, Value::Double(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Schema::Bytes, Value::Bytes(b)) => {
            write_long(out, b.len() as i64);
            out.extend_from_slice(b);
            Ok(())
        }
        (Schema::String, Value::String(s)) => {
            write_long(out, s.len() as i64);
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        (Schema::Fixed(fixed), Value::Fixed(b)) if b.len() == fixed.size => {
            out.extend_from_slice(b);
            Ok(())
        }
        (Schema::Enum(e), Value::Enum(_, symbol)) => {
            let ordinal = e.ordinal(symbol).ok_or_else(|| {
                MappingError::serialization(format!("'{symbol}' is not a symbol of {schema}"))
            })?;
            write_long(out, ordinal as i64);
            Ok(())
        }
        (Schema::Array(items), Value::Array(values)) => {
            if !values.is_empty() {
                write_long(out, values.len() as i64);
                for v in values {
                    encode_value(out, v, items)?;
                }
            }
            write_long(out, 0);
            Ok(())
        }
        (Schema::Map(values_schema), Value::Map(entries)) => {
            if !entries.is_empty() {
                write_long(out, entries.len() as i64);
                for (k, v) in entries {
                    write_long(out, k.len() as i64);
                    out.extend_from_slice(k.as_bytes());
                    encode_value(out, v, values_schema)?;
                }
            }
            write_long(out, 0);
            Ok(())
        }
        (Schema::Record(record_schema), Value::Record(record)) => {
            for field in record_schema.fields() {
                let v = record.get_by_name(field.name()).unwrap_or(&Value::Null);
                encode_value(out, v, field.schema())?;
            }
            Ok(())
        }
        _ => Err(cannot_encode(value, schema)),
    }
}

// ===== decode =====

fn decode_value(reader: &mut ByteReader<'_>, schema: &Schema) -> MappingResult<Value> {
    Ok(match schema {
        Schema::Null => Value::Null,
        Schema::Boolean => match reader.read_u8()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            b => return Err(MappingError::serialization(format!("invalid boolean byte {b:#04x}"))),
        },
        Schema::Int => Value::Int(read_int(reader)?),
        Schema::Long => Value::Long(read_long(reader)?),
        Schema::Float => Value::Float(f32::from_le_bytes(reader.read_array()?)),
        Schema::Double => Value::Double(f64::from_le_bytes(reader.read_array()?)),
        Schema::Bytes => {
            let len = read_len(reader)?;
            Value::Bytes(reader.read_exact(len)?.to_vec())
        }
        Schema::String => {
            let len = read_len(reader)?;
            let raw = reader.read_exact(len)?;
            Value::String(
                String::from_utf8(raw.to_vec())
                    .map_err(|e| MappingError::serialization(format!("invalid utf-8: {e}")))?,
            )
        }
        Schema::Fixed(fixed) => Value::Fixed(reader.read_exact(fixed.size)?.to_vec()),
        Schema::Enum(e) => {
            let ordinal = read_len(reader)?;
            let symbol = e.symbols.get(ordinal).ok_or_else(|| {
                MappingError::serialization(format!("enum ordinal {ordinal} out of range for {schema}"))
            })?;
            Value::Enum(ordinal, symbol.clone())
        }
        Schema::Union(branches) => {
            let idx = read_len(reader)?;
            let branch = branches.get(idx).ok_or_else(|| {
                MappingError::serialization(format!("union branch {idx} out of range for {schema}"))
            })?;
            decode_value(reader, branch)?
        }
        Schema::Array(items) => {
            let mut values = Vec::new();
            read_blocks(reader, |reader| {
                values.push(decode_value(reader, items)?);
                Ok(())
            })?;
            Value::Array(values)
        }
        Schema::Map(values_schema) => {
            let mut entries = BTreeMap::new();
            read_blocks(reader, |reader| {
                let len = read_len(reader)?;
                let key = String::from_utf8(reader.read_exact(len)?.to_vec())
                    .map_err(|e| MappingError::serialization(format!("invalid utf-8 map key: {e}")))?;
                entries.insert(key, decode_value(reader, values_schema)?);
                Ok(())
            })?;
            Value::Map(entries)
        }
        Schema::Record(record_schema) => {
            let mut record = GenericRecord::new(record_schema.clone());
            for field in record_schema.fields() {
                let v = decode_value(reader, field.schema())?;
                record.put(field.position(), v)?;
            }
            Value::Record(record)
        }
    })
}

/// Array/map block framing. A negative count is followed by the block's
/// byte size, which is skipped.
fn read_blocks(
    reader: &mut ByteReader<'_>,
    mut item: impl FnMut(&mut ByteReader<'_>) -> MappingResult<()>,
) -> MappingResult<()> {
    loop {
        let mut count = read_long(reader)?;
        if count == 0 {
            return Ok(());
        }
        if count < 0 {
            count = count
                .checked_neg()
                .ok_or_else(|| MappingError::serialization("block count overflow"))?;
            read_long(reader)?;
        }
        for _ in 0..count {
            item(reader)?;
        }
    }
}

// ===== resolution =====

fn unresolvable(written: &Schema, read: &Schema) -> MappingError {
    MappingError::serialization(format!("data written as {written} cannot be read as {read}"))
}

/// Reshape `value` (conforming to `written`) into the `read` schema.
///
/// Reader fields missing from the writer take their declared default;
/// writer fields the reader lacks are dropped. Numeric promotions follow
/// int → long → float → double; string and bytes interconvert.
pub fn resolve(value: Value, written: &Schema, read: &Schema) -> MappingResult<Value> {
    match (written, read) {
        (Schema::Union(branches), _) => {
            let idx = value
                .union_branch(branches)
                .ok_or_else(|| unresolvable(written, read))?;
            resolve(value, &branches[idx], read)
        }
        (_, Schema::Union(branches)) => {
            for branch in branches {
                if let Ok(v) = resolve(value.clone(), written, branch) {
                    return Ok(v);
                }
            }
            Err(unresolvable(written, read))
        }
        (Schema::Null, Schema::Null)
        | (Schema::Boolean, Schema::Boolean)
        | (Schema::Int, Schema::Int)
        | (Schema::Long, Schema::Long)
        | (Schema::Float, Schema::Float)
        | (Schema::Double, Schema::Double)
        | (Schema::Bytes, Schema::Bytes)
        | (Schema::String, Schema::String) => Ok(value),
        (Schema::Int, Schema::Long | Schema::Float | Schema::Double)
        | (Schema::Long, Schema::Float | Schema::Double)
        | (Schema::Float, Schema::Double)
        | (Schema::String, Schema::Bytes)
        | (Schema::Bytes, Schema::String) => promote(value, read),
        (Schema::Fixed(w), Schema::Fixed(r)) if w.size == r.size => Ok(value),
        (Schema::Enum(_), Schema::Enum(r)) => {
            let Value::Enum(_, symbol) = value else {
                return Err(unresolvable(written, read));
            };
            match r.ordinal(&symbol) {
                Some(i) => Ok(Value::Enum(i, symbol)),
                None => {
                    let default = r.default.as_deref().ok_or_else(|| {
                        MappingError::serialization(format!("symbol '{symbol}' unknown to {read}"))
                    })?;
                    let i = r.ordinal(default).ok_or_else(|| unresolvable(written, read))?;
                    Ok(Value::Enum(i, default.to_string()))
                }
            }
        }
        (Schema::Array(w), Schema::Array(r)) => match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|v| resolve(v, w, r))
                    .collect::<MappingResult<_>>()?,
            )),
            _ => Err(unresolvable(written, read)),
        },
        (Schema::Map(w), Schema::Map(r)) => match value {
            Value::Map(entries) => Ok(Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, resolve(v, w, r)?)))
                    .collect::<MappingResult<_>>()?,
            )),
            _ => Err(unresolvable(written, read)),
        },
        (Schema::Record(w), Schema::Record(r)) => match value {
            Value::Record(record) => Ok(Value::Record(resolve_record(&record, w, r)?)),
            _ => Err(unresolvable(written, read)),
        },
        _ => Err(unresolvable(written, read)),
    }
}

fn resolve_record(
    record: &GenericRecord,
    written: &RecordSchema,
    read: &Arc<RecordSchema>,
) -> MappingResult<GenericRecord> {
    let mut out = GenericRecord::new(read.clone());
    for field in read.fields() {
        let value = match written.field(field.name()) {
            Some(w) => {
                let v = record.get_by_name(field.name()).cloned().unwrap_or_default();
                resolve(v, w.schema(), field.schema())?
            }
            None => match field.default() {
                Some(json) => json_to_value(json, field.schema())?,
                None => {
                    return Err(MappingError::serialization(format!(
                        "field '{}' of {} is missing from the written data and has no default",
                        field.name(),
                        read.full_name()
                    )));
                }
            },
        };
        out.put(field.position(), value)?;
    }
    Ok(out)
}

fn promote(value: Value, read: &Schema) -> MappingResult<Value> {
    Ok(match (value, read) {
        (Value::Int(v), Schema::Long) => Value::Long(i64::from(v)),
        (Value::Int(v), Schema::Float) => Value::Float(v as f32),
        (Value::Int(v), Schema::Double) => Value::Double(f64::from(v)),
        (Value::Long(v), Schema::Float) => Value::Float(v as f32),
        (Value::Long(v), Schema::Double) => Value::Double(v as f64),
        (Value::Float(v), Schema::Double) => Value::Double(f64::from(v)),
        (Value::String(s), Schema::Bytes) => Value::Bytes(s.into_bytes()),
        (Value::Bytes(b), Schema::String) => Value::String(
            String::from_utf8(b).map_err(|e| MappingError::serialization(format!("invalid utf-8: {e}")))?,
        ),
        (value, _) => {
            return Err(MappingError::serialization(format!(
                "cannot promote {} to {read}",
                value.type_label()
            )));
        }
    })
}

// ===== JSON defaults =====

fn bad_default(json: &JsonValue, schema: &Schema) -> MappingError {
    MappingError::schema(format!("default {json} is not valid for {schema}"))
}

/// Convert a JSON default into a value of `schema`.
///
/// Bytes and fixed defaults are strings whose code points are the byte
/// values. Union defaults normally belong to the first branch; later
/// branches are tried if the first one rejects the JSON.
pub fn json_to_value(json: &JsonValue, schema: &Schema) -> MappingResult<Value> {
    let err = || bad_default(json, schema);
    Ok(match schema {
        Schema::Null => match json {
            JsonValue::Null => Value::Null,
            _ => return Err(err()),
        },
        Schema::Boolean => Value::Boolean(json.as_bool().ok_or_else(err)?),
        Schema::Int => {
            let n = json.as_i64().ok_or_else(err)?;
            Value::Int(i32::try_from(n).map_err(|_| err())?)
        }
        Schema::Long => Value::Long(json.as_i64().ok_or_else(err)?),
        Schema::Float => Value::Float(json.as_f64().ok_or_else(err)? as f32),
        Schema::Double => Value::Double(json.as_f64().ok_or_else(err)?),
        Schema::String => Value::String(json.as_str().ok_or_else(err)?.to_string()),
        Schema::Bytes => Value::Bytes(latin1_bytes(json).ok_or_else(err)?),
        Schema::Fixed(fixed) => {
            let bytes = latin1_bytes(json).ok_or_else(err)?;
            if bytes.len() != fixed.size {
                return Err(err());
            }
            Value::Fixed(bytes)
        }
        Schema::Enum(e) => {
            let symbol = json.as_str().ok_or_else(err)?;
            let ordinal = e.ordinal(symbol).ok_or_else(err)?;
            Value::Enum(ordinal, symbol.to_string())
        }
        Schema::Array(items) => Value::Array(
            json.as_array()
                .ok_or_else(err)?
                .iter()
                .map(|item| json_to_value(item, items))
                .collect::<MappingResult<_>>()?,
        ),
        Schema::Map(values) => Value::Map(
            json.as_object()
                .ok_or_else(err)?
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_value(v, values)?)))
                .collect::<MappingResult<_>>()?,
        ),
        Schema::Record(record_schema) => {
            let object = json.as_object().ok_or_else(err)?;
            let mut record = GenericRecord::new(record_schema.clone());
            for field in record_schema.fields() {
                let v = match (object.get(field.name()), field.default()) {
                    (Some(v), _) | (None, Some(v)) => json_to_value(v, field.schema())?,
                    (None, None) => return Err(err()),
                };
                record.put(field.position(), v)?;
            }
            Value::Record(record)
        }
        Schema::Union(branches) => branches
            .iter()
            .find_map(|b| json_to_value(json, b).ok())
            .ok_or_else(err)?,
    })
}

fn latin1_bytes(json: &JsonValue) -> Option<Vec<u8>> {
    json.as_str()?
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}
