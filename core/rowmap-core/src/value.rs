//! Dynamically-typed field values.

use crate::record::{GenericRecord, Record};
use crate::schema::Schema;
use std::collections::BTreeMap;

/// A value conforming to some [`Schema`].
///
/// `Null` doubles as "no value" for absent fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    /// Ordinal and symbol.
    Enum(usize, String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(GenericRecord),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Label used in error messages.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_) => "fixed",
            Value::Enum(..) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Whether this value can be written as `schema`.
    ///
    /// `Int` is accepted where `long` is expected. Unions accept any value
    /// one of their branches accepts.
    pub fn conforms_to(&self, schema: &Schema) -> bool {
        self.conforms(schema, true)
    }

    fn conforms(&self, schema: &Schema, widen: bool) -> bool {
        match (self, schema) {
            (_, Schema::Union(branches)) => branches.iter().any(|b| self.conforms(b, widen)),
            (Value::Int(_), Schema::Long) => widen,
            (Value::Null, Schema::Null)
            | (Value::Boolean(_), Schema::Boolean)
            | (Value::Int(_), Schema::Int)
            | (Value::Long(_), Schema::Long)
            | (Value::Float(_), Schema::Float)
            | (Value::Double(_), Schema::Double)
            | (Value::Bytes(_), Schema::Bytes)
            | (Value::String(_), Schema::String) => true,
            (Value::Fixed(bytes), Schema::Fixed(f)) => bytes.len() == f.size,
            (Value::Enum(_, symbol), Schema::Enum(e)) => e.ordinal(symbol).is_some(),
            (Value::Array(items), Schema::Array(item_schema)) => {
                items.iter().all(|v| v.conforms(item_schema, widen))
            }
            (Value::Map(entries), Schema::Map(value_schema)) => {
                entries.values().all(|v| v.conforms(value_schema, widen))
            }
            (Value::Record(record), Schema::Record(expected)) => {
                record.schema().full_name() == expected.full_name()
            }
            _ => false,
        }
    }

    /// Index of the union branch for this value: the first exact match,
    /// else the first branch it widens into.
    pub fn union_branch(&self, branches: &[Schema]) -> Option<usize> {
        branches
            .iter()
            .position(|b| self.conforms(b, false))
            .or_else(|| branches.iter().position(|b| self.conforms(b, true)))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of `Int`/`Long`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&GenericRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<GenericRecord> for Value {
    fn from(v: GenericRecord) -> Self {
        Value::Record(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, RecordSchema};
    use std::sync::Arc;

    #[test]
    fn test_union_branch_selection() {
        let branches = vec![Schema::Null, Schema::String];
        assert_eq!(Value::Null.union_branch(&branches), Some(0));
        assert_eq!(Value::from("x").union_branch(&branches), Some(1));
        assert_eq!(Value::Int(1).union_branch(&branches), None);
    }

    #[test]
    fn test_int_selects_long_branch() {
        let branches = vec![Schema::Null, Schema::Long];
        assert_eq!(Value::Int(1).union_branch(&branches), Some(1));
        let both = vec![Schema::Long, Schema::Int];
        assert_eq!(Value::Int(1).union_branch(&both), Some(1));
        assert_eq!(Value::Long(1).union_branch(&[Schema::Null, Schema::Int]), None);
    }

    #[test]
    fn test_conforms_nested() {
        let map = Schema::Map(Box::new(Schema::Union(vec![Schema::Null, Schema::Long])));
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::Long(1));
        entries.insert("b".to_string(), Value::Null);
        assert!(Value::Map(entries.clone()).conforms_to(&map));
        entries.insert("c".to_string(), Value::Int(3));
        assert!(Value::Map(entries.clone()).conforms_to(&map));
        entries.insert("d".to_string(), Value::from("x"));
        assert!(!Value::Map(entries).conforms_to(&map));
    }

    #[test]
    fn test_record_conformance_by_name() {
        let schema = Arc::new(RecordSchema::new("point", None, vec![Field::new("x", Schema::Int)], Default::default()).unwrap());
        let record = GenericRecord::new(schema.clone());
        assert!(Value::Record(record).conforms_to(&Schema::Record(schema)));
    }

    #[test]
    fn test_integer_view() {
        assert_eq!(Value::Int(-3).as_i64(), Some(-3));
        assert_eq!(Value::Long(7).as_i64(), Some(7));
        assert_eq!(Value::from("7").as_i64(), None);
    }
}
