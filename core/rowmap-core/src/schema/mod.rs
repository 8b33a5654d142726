//! Record schema model.
//!
//! Schemas are written in the JSON record-schema dialect (`record`, `enum`,
//! `array`, `map`, `fixed`, unions and the eight primitives). Fields keep
//! their extra JSON attributes ("props") so the mapping layer can read the
//! `mapping` annotation without re-parsing the text.

mod parse;

pub use parse::SchemaParser;

use crate::error::{MappingError, MappingResult};
use crate::value::Value;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A parsed schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(Arc<RecordSchema>),
    Enum(Arc<EnumSchema>),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(Vec<Schema>),
    Fixed(Arc<FixedSchema>),
}

impl Schema {
    /// Parse schema text.
    pub fn parse(text: &str) -> MappingResult<Schema> {
        SchemaParser::new().parse_str(text)
    }

    /// Parse an already-decoded JSON document.
    pub fn from_json(json: &JsonValue) -> MappingResult<Schema> {
        SchemaParser::new().parse_json(json)
    }

    /// Parse schema text that must describe a record.
    pub fn parse_record(text: &str) -> MappingResult<Arc<RecordSchema>> {
        match Self::parse(text)? {
            Schema::Record(record) => Ok(record),
            other => Err(MappingError::schema(format!(
                "expected a record schema, found {}",
                other.type_name()
            ))),
        }
    }

    /// Short type label (`"int"`, `"record"`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Union(_) => "union",
            Schema::Fixed(_) => "fixed",
        }
    }

    /// Full name of a named type (`record`, `enum`, `fixed`).
    pub fn full_name(&self) -> Option<String> {
        match self {
            Schema::Record(r) => Some(r.full_name()),
            Schema::Enum(e) => Some(qualify(&e.name, e.namespace.as_deref())),
            Schema::Fixed(f) => Some(qualify(&f.name, f.namespace.as_deref())),
            _ => None,
        }
    }

    /// True for `null` and for unions that include `null`.
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Null => true,
            Schema::Union(branches) => branches.iter().any(|b| matches!(b, Schema::Null)),
            _ => false,
        }
    }

    /// The zero a statically-typed field of this type would hold.
    ///
    /// Only numeric and boolean primitives have one.
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            Schema::Int => Some(Value::Int(0)),
            Schema::Long => Some(Value::Long(0)),
            Schema::Boolean => Some(Value::Boolean(false)),
            Schema::Float => Some(Value::Float(0.0)),
            Schema::Double => Some(Value::Double(0.0)),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            Schema::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Array(items) => write!(f, "array<{items}>"),
            Schema::Map(values) => write!(f, "map<{values}>"),
            Schema::Union(branches) => {
                write!(f, "union[")?;
                for (i, b) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{b}")?;
                }
                write!(f, "]")
            }
            other => match other.full_name() {
                Some(name) => write!(f, "{}:{}", other.type_name(), name),
                None => write!(f, "{}", other.type_name()),
            },
        }
    }
}

/// A record type: named, ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    namespace: Option<String>,
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
    props: Map<String, JsonValue>,
}

impl RecordSchema {
    /// Build a record from fields; positions are reassigned in list order.
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
        fields: Vec<Field>,
        props: Map<String, JsonValue>,
    ) -> MappingResult<Self> {
        let name = name.into();
        let mut positions = HashMap::with_capacity(fields.len());
        let mut ordered = Vec::with_capacity(fields.len());
        for (pos, mut field) in fields.into_iter().enumerate() {
            if positions.insert(field.name.clone(), pos).is_some() {
                return Err(MappingError::schema(format!(
                    "duplicate field '{}' in record '{}'",
                    field.name, name
                )));
            }
            field.position = pos;
            ordered.push(field);
        }
        Ok(Self {
            name,
            namespace,
            fields: ordered,
            positions,
            props,
        })
    }

    /// Record for a `#[derive(Record)]` type. The macro rejects duplicate
    /// names at compile time, so no validation happens here.
    pub fn derived(name: &str, namespace: Option<&str>, fields: Vec<Field>) -> Self {
        let fields: Vec<Field> = fields
            .into_iter()
            .enumerate()
            .map(|(pos, mut f)| {
                f.position = pos;
                f
            })
            .collect();
        let positions = fields.iter().map(|f| (f.name.clone(), f.position)).collect();
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            fields,
            positions,
            props: Map::new(),
        }
    }

    /// Unnamed record, used for synthetic sub-schemas.
    pub fn anonymous(fields: Vec<Field>) -> MappingResult<Self> {
        Self::new("", None, fields, Map::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn full_name(&self) -> String {
        qualify(&self.name, self.namespace.as_deref())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.positions.get(name).map(|&pos| &self.fields[pos])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Record-level attribute not interpreted by the schema model.
    pub fn prop(&self, name: &str) -> Option<&JsonValue> {
        self.props.get(name)
    }

    /// Sub-schema holding just `names`, in the given order, each field keeping
    /// its original declaration. The projection keeps this record's name.
    pub fn project(&self, names: &[&str]) -> MappingResult<RecordSchema> {
        let fields = names
            .iter()
            .map(|n| {
                self.field(n).cloned().ok_or_else(|| MappingError::UnknownField {
                    field: (*n).to_string(),
                    schema: self.full_name(),
                })
            })
            .collect::<MappingResult<Vec<_>>>()?;
        Self::new(self.name.clone(), self.namespace.clone(), fields, Map::new())
    }
}

/// One record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    schema: Schema,
    default: Option<JsonValue>,
    position: usize,
    props: Map<String, JsonValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            position: 0,
            props: Map::new(),
        }
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Declared JSON default, if any.
    pub fn default(&self) -> Option<&JsonValue> {
        self.default.as_ref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn prop(&self, name: &str) -> Option<&JsonValue> {
        self.props.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
    pub default: Option<String>,
}

impl EnumSchema {
    pub fn ordinal(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub size: usize,
}

pub(crate) fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> Arc<RecordSchema> {
        Schema::parse_record(
            r#"{
                "type": "record", "name": "User", "namespace": "app",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "email", "type": ["null", "string"], "default": null},
                    {"name": "tags", "type": {"type": "map", "values": "string"}}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"type": "array", "items": "int"});
        assert_eq!(Schema::from_json(&json).unwrap(), Schema::Array(Box::new(Schema::Int)));
        assert!(Schema::from_json(&serde_json::json!({"type": "nope"})).is_err());
    }

    #[test]
    fn test_record_lookup() {
        let schema = user_schema();
        assert_eq!(schema.full_name(), "app.User");
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.position("email"), Some(1));
        assert!(schema.field("missing").is_none());
        assert_eq!(schema.field("tags").unwrap().schema().type_name(), "map");
    }

    #[test]
    fn test_nullable_and_zero() {
        let schema = user_schema();
        assert!(schema.field("email").unwrap().schema().is_nullable());
        assert!(!schema.field("id").unwrap().schema().is_nullable());
        assert_eq!(Schema::Long.zero_value(), Some(Value::Long(0)));
        assert_eq!(Schema::String.zero_value(), None);
    }

    #[test]
    fn test_project_preserves_declarations() {
        let schema = user_schema();
        let projected = schema.project(&["tags", "id"]).unwrap();
        assert_eq!(projected.fields()[0].name(), "tags");
        assert_eq!(projected.fields()[0].position(), 0);
        assert_eq!(projected.fields()[1].schema(), &Schema::Long);
        assert_eq!(projected.full_name(), "app.User");
    }

    #[test]
    fn test_project_unknown_field() {
        let err = user_schema().project(&["nope"]).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let err = RecordSchema::anonymous(vec![
            Field::new("a", Schema::Int),
            Field::new("a", Schema::Long),
        ])
        .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn test_display() {
        let schema = Schema::Union(vec![Schema::Null, Schema::Array(Box::new(Schema::Int))]);
        assert_eq!(schema.to_string(), "union[null, array<int>]");
    }
}
