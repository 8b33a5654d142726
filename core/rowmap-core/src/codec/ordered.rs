//! Order-preserving key codec.
//!
//! For two values of the same schema, comparing their encodings as unsigned
//! bytes gives the same answer as comparing the values. Encodings are
//! self-delimiting, so composite keys are plain concatenations and a key
//! prefix sorts before every key that extends it.
//!
//! | type            | encoding                                              |
//! |-----------------|-------------------------------------------------------|
//! | int / long      | big-endian, sign bit flipped                          |
//! | float / double  | big-endian bits; negatives inverted, else sign set    |
//! | boolean         | `0x00` / `0x01`                                       |
//! | string / bytes  | `0x00` escaped as `0x00 0x01`, then `0x00 0x00`       |
//! | null            | nothing                                               |
//! | enum            | ordinal as int                                        |
//! | union           | branch index as int, then the branch value            |
//! | fixed           | raw bytes                                             |
//! | record          | fields in declaration order                           |
//! | array           | `0x01` before each element, then `0x00`               |
//!
//! Maps have no natural order and are rejected.

use super::ByteReader;
use crate::error::{MappingError, MappingResult};
use crate::record::{GenericRecord, Record};
use crate::schema::Schema;
use crate::value::Value;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0x01;
const TERMINATOR: u8 = 0x00;
const ARRAY_ITEM: u8 = 0x01;
const ARRAY_END: u8 = 0x00;

/// Fail if `schema` contains a type that cannot be order-encoded.
pub fn validate(schema: &Schema) -> MappingResult<()> {
    match schema {
        Schema::Map(_) => Err(MappingError::schema(format!(
            "{schema} cannot be part of a row key"
        ))),
        Schema::Array(items) => validate(items),
        Schema::Union(branches) => branches.iter().try_for_each(validate),
        Schema::Record(record) => record.fields().iter().try_for_each(|f| validate(f.schema())),
        _ => Ok(()),
    }
}

/// Encode a single value.
pub fn encode(value: &Value, schema: &Schema) -> MappingResult<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(&mut out, value, schema)?;
    Ok(out)
}

/// Decode a single value; every byte must be consumed.
pub fn decode(bytes: &[u8], schema: &Schema) -> MappingResult<Value> {
    let mut reader = ByteReader::new(bytes);
    let value = decode_from(&mut reader, schema)?;
    reader.finish()?;
    Ok(value)
}

/// Append the encoding of `value` to `out`.
pub fn encode_into(out: &mut Vec<u8>, value: &Value, schema: &Schema) -> MappingResult<()> {
    match (schema, value) {
        (Schema::Union(branches), _) => {
            let idx = value.union_branch(branches).ok_or_else(|| mismatch(value, schema))?;
            out.extend_from_slice(&ordered_i32_bytes(idx as i32));
            encode_into(out, value, &branches[idx])
        }
        (_, Value::Null) if !schema.is_nullable() => Err(MappingError::Precondition(format!(
            "null value for non-nullable key component of type {schema}"
        ))),
        (Schema::Null, Value::Null) => Ok(()),
        (Schema::Boolean, Value::Boolean(b)) => {
            out.push(u8::from(*b));
            Ok(())
        }
        (Schema::Int, Value::Int(v)) => {
            out.extend_from_slice(&ordered_i32_bytes(*v));
            Ok(())
        }
        (Schema::Long, Value::Long(v)) => {
            out.extend_from_slice(&ordered_i64_bytes(*v));
            Ok(())
        }
        (Schema::Long, Value::Int(v)) => {
            out.extend_from_slice(&ordered_i64_bytes(i64::from(*v)));
            Ok(())
        }
        (Schema::Float, Value::Float(v)) => {
            out.extend_from_slice(&ordered_f32_bytes(*v));
            Ok(())
        }
        (Schema::Double, Value::Double(v)) => {
            out.extend_from_slice(&ordered_f64_bytes(*v));
            Ok(())
        }
        (Schema::String, Value::String(s)) => {
            push_terminated_bytes(out, s.as_bytes());
            Ok(())
        }
        (Schema::Bytes, Value::Bytes(b)) => {
            push_terminated_bytes(out, b);
            Ok(())
        }
        (Schema::Fixed(fixed), Value::Fixed(b)) if b.len() == fixed.size => {
            out.extend_from_slice(b);
            Ok(())
        }
        (Schema::Enum(e), Value::Enum(_, symbol)) => {
            let ordinal = e.ordinal(symbol).ok_or_else(|| mismatch(value, schema))?;
            out.extend_from_slice(&ordered_i32_bytes(ordinal as i32));
            Ok(())
        }
        (Schema::Array(items), Value::Array(values)) => {
            for v in values {
                out.push(ARRAY_ITEM);
                encode_into(out, v, items)?;
            }
            out.push(ARRAY_END);
            Ok(())
        }
        (Schema::Record(record_schema), Value::Record(record)) => {
            for field in record_schema.fields() {
                let v = record.get_by_name(field.name()).unwrap_or(&Value::Null);
                encode_into(out, v, field.schema())?;
            }
            Ok(())
        }
        (Schema::Map(_), _) => Err(MappingError::schema(format!(
            "{schema} cannot be part of a row key"
        ))),
        _ => Err(mismatch(value, schema)),
    }
}

/// Read one value of `schema` from `reader`.
pub fn decode_from(reader: &mut ByteReader<'_>, schema: &Schema) -> MappingResult<Value> {
    Ok(match schema {
        Schema::Null => Value::Null,
        Schema::Boolean => match reader.read_u8()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            b => return Err(MappingError::serialization(format!("invalid boolean byte {b:#04x}"))),
        },
        Schema::Int => Value::Int(read_i32(reader)?),
        Schema::Long => Value::Long(i64::from_be_bytes(reader.read_array()?) ^ i64::MIN),
        Schema::Float => Value::Float(f32_from_ordered(u32::from_be_bytes(reader.read_array()?))),
        Schema::Double => Value::Double(f64_from_ordered(u64::from_be_bytes(reader.read_array()?))),
        Schema::String => {
            let raw = read_terminated_bytes(reader)?;
            Value::String(
                String::from_utf8(raw)
                    .map_err(|e| MappingError::serialization(format!("invalid utf-8 in key: {e}")))?,
            )
        }
        Schema::Bytes => Value::Bytes(read_terminated_bytes(reader)?),
        Schema::Fixed(fixed) => Value::Fixed(reader.read_exact(fixed.size)?.to_vec()),
        Schema::Enum(e) => {
            let ordinal = read_index(reader)?;
            let symbol = e.symbols.get(ordinal).ok_or_else(|| {
                MappingError::serialization(format!("enum ordinal {ordinal} out of range for {schema}"))
            })?;
            Value::Enum(ordinal, symbol.clone())
        }
        Schema::Union(branches) => {
            let idx = read_index(reader)?;
            let branch = branches.get(idx).ok_or_else(|| {
                MappingError::serialization(format!("union branch {idx} out of range for {schema}"))
            })?;
            decode_from(reader, branch)?
        }
        Schema::Array(items) => {
            let mut values = Vec::new();
            loop {
                match reader.read_u8()? {
                    ARRAY_END => break,
                    ARRAY_ITEM => values.push(decode_from(reader, items)?),
                    b => {
                        return Err(MappingError::serialization(format!(
                            "invalid array marker {b:#04x}"
                        )));
                    }
                }
            }
            Value::Array(values)
        }
        Schema::Record(record_schema) => {
            let mut record = GenericRecord::new(record_schema.clone());
            for field in record_schema.fields() {
                let v = decode_from(reader, field.schema())?;
                record.put(field.position(), v)?;
            }
            Value::Record(record)
        }
        Schema::Map(_) => {
            return Err(MappingError::schema(format!("{schema} cannot be part of a row key")));
        }
    })
}

fn mismatch(value: &Value, schema: &Schema) -> MappingError {
    MappingError::serialization(format!(
        "cannot key-encode {} as {schema}",
        value.type_label()
    ))
}

fn read_i32(reader: &mut ByteReader<'_>) -> MappingResult<i32> {
    Ok(i32::from_be_bytes(reader.read_array()?) ^ i32::MIN)
}

fn read_index(reader: &mut ByteReader<'_>) -> MappingResult<usize> {
    let n = read_i32(reader)?;
    usize::try_from(n).map_err(|_| MappingError::serialization(format!("negative index {n} in key")))
}

fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]);
        } else {
            out.push(byte);
        }
    }
    out.extend_from_slice(&[ESCAPE, TERMINATOR]);
}

fn read_terminated_bytes(reader: &mut ByteReader<'_>) -> MappingResult<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        match reader.read_u8()? {
            ESCAPE => match reader.read_u8()? {
                TERMINATOR => return Ok(out),
                ESCAPED_ZERO => out.push(0),
                b => {
                    return Err(MappingError::serialization(format!(
                        "invalid escape sequence 0x00 {b:#04x} in key"
                    )));
                }
            },
            b => out.push(b),
        }
    }
}

const fn ordered_i32_bytes(value: i32) -> [u8; 4] {
    (value ^ i32::MIN).to_be_bytes()
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    (value ^ i64::MIN).to_be_bytes()
}

const fn ordered_f32_bytes(value: f32) -> [u8; 4] {
    let bits = value.to_bits();
    let ordered = if bits & 0x8000_0000 == 0 {
        bits ^ 0x8000_0000
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & 0x8000_0000_0000_0000 == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

fn f32_from_ordered(ordered: u32) -> f32 {
    let bits = if ordered & 0x8000_0000 != 0 {
        ordered ^ 0x8000_0000
    } else {
        !ordered
    };
    f32::from_bits(bits)
}

fn f64_from_ordered(ordered: u64) -> f64 {
    let bits = if ordered & 0x8000_0000_0000_0000 != 0 {
        ordered ^ 0x8000_0000_0000_0000
    } else {
        !ordered
    };
    f64::from_bits(bits)
}
