//! API 트레이트 정의
//!
//! Rust 타입 ↔ [`Value`] / [`Schema`] 변환. `#[derive(Record)]`가 생성하는
//! 코드는 이 트레이트들만 사용한다.

use crate::error::{MappingError, MappingResult};
use crate::schema::Schema;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Rust 타입을 스키마 타입으로 변환하는 트레이트
pub trait SchemaType {
    fn schema_type() -> Schema;
}

/// Rust 값을 [`Value`]로 변환하는 트레이트
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// [`Value`]에서 Rust 값으로 변환하는 트레이트
///
/// `Value::Null`은 타입의 기본값이 된다 (대입되지 않은 구조체 필드와 동일).
pub trait FromValue: Sized {
    fn from_value(value: Value) -> MappingResult<Self>;
}

fn mismatch(expected: &str, actual: &Value) -> MappingError {
    MappingError::Serialization(format!(
        "type mismatch: expected {expected}, got {}",
        actual.type_label()
    ))
}

// 기본 타입 구현
impl SchemaType for bool {
    fn schema_type() -> Schema {
        Schema::Boolean
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Null => Ok(false),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl SchemaType for i32 {
    fn schema_type() -> Schema {
        Schema::Int
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Null => Ok(0),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl SchemaType for i64 {
    fn schema_type() -> Schema {
        Schema::Long
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Long(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            Value::Null => Ok(0),
            other => Err(mismatch("long", &other)),
        }
    }
}

impl SchemaType for f32 {
    fn schema_type() -> Schema {
        Schema::Float
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Null => Ok(0.0),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl SchemaType for f64 {
    fn schema_type() -> Schema {
        Schema::Double
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            Value::Null => Ok(0.0),
            other => Err(mismatch("double", &other)),
        }
    }
}

impl SchemaType for String {
    fn schema_type() -> Schema {
        Schema::String
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::String(v) => Ok(v),
            Value::Null => Ok(String::new()),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl SchemaType for Vec<u8> {
    fn schema_type() -> Schema {
        Schema::Bytes
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Bytes(v) | Value::Fixed(v) => Ok(v),
            Value::Null => Ok(Vec::new()),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> MappingResult<Self> {
        Ok(value)
    }
}

// Option<T> 구현: ["null", T] 유니온
impl<T: SchemaType> SchemaType for Option<T> {
    fn schema_type() -> Schema {
        Schema::Union(vec![Schema::Null, T::schema_type()])
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}

// 맵 타입 구현: 키는 항상 문자열
impl<T: SchemaType> SchemaType for BTreeMap<String, T> {
    fn schema_type() -> Schema {
        Schema::Map(Box::new(T::schema_type()))
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k, v.into_value())).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            Value::Null => Ok(BTreeMap::new()),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl<T: SchemaType> SchemaType for HashMap<String, T> {
    fn schema_type() -> Schema {
        Schema::Map(Box::new(T::schema_type()))
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k, v.into_value())).collect())
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            Value::Null => Ok(HashMap::new()),
            other => Err(mismatch("map", &other)),
        }
    }
}
