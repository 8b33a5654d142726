//! JSON schema text → [`Schema`].

use super::{EnumSchema, Field, FixedSchema, RecordSchema, Schema, qualify};
use crate::error::{MappingError, MappingResult};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Attributes the schema model consumes itself; everything else on a field
/// or record is kept as a prop.
const FIELD_KEYWORDS: &[&str] = &["name", "type", "default", "doc", "order", "aliases"];
const RECORD_KEYWORDS: &[&str] = &["name", "type", "namespace", "fields", "doc", "aliases"];

/// Parser holding the named types seen so far.
///
/// Named types may be referenced (by short or full name) once defined.
#[derive(Debug, Default)]
pub struct SchemaParser {
    named: HashMap<String, Schema>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_str(&mut self, text: &str) -> MappingResult<Schema> {
        let json: JsonValue = serde_json::from_str(text)
            .map_err(|e| MappingError::schema(format!("malformed schema text: {e}")))?;
        self.parse_json(&json)
    }

    pub fn parse_json(&mut self, json: &JsonValue) -> MappingResult<Schema> {
        self.parse_node(json, None)
    }

    fn parse_node(&mut self, json: &JsonValue, namespace: Option<&str>) -> MappingResult<Schema> {
        match json {
            JsonValue::String(name) => self.resolve_name(name, namespace),
            JsonValue::Array(branches) => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in branches {
                    let schema = self.parse_node(branch, namespace)?;
                    if matches!(schema, Schema::Union(_)) {
                        return Err(MappingError::schema("unions may not immediately contain unions"));
                    }
                    parsed.push(schema);
                }
                Ok(Schema::Union(parsed))
            }
            JsonValue::Object(obj) => self.parse_object(obj, namespace),
            other => Err(MappingError::schema(format!("invalid schema node: {other}"))),
        }
    }

    fn parse_object(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> MappingResult<Schema> {
        let type_node = obj
            .get("type")
            .ok_or_else(|| MappingError::schema("schema object must contain 'type'"))?;

        let type_name = match type_node {
            JsonValue::String(s) => s.as_str(),
            nested => return self.parse_node(nested, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace),
            "enum" => self.parse_enum(obj, namespace),
            "fixed" => self.parse_fixed(obj, namespace),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| MappingError::schema("array schema must contain 'items'"))?;
                Ok(Schema::Array(Box::new(self.parse_node(items, namespace)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| MappingError::schema("map schema must contain 'values'"))?;
                Ok(Schema::Map(Box::new(self.parse_node(values, namespace)?)))
            }
            other => self.resolve_name(other, namespace),
        }
    }

    fn parse_record(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> MappingResult<Schema> {
        let (name, namespace) = named(obj, namespace)?;
        let fields_json = obj
            .get("fields")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| MappingError::schema(format!("record '{name}' must contain fields")))?;

        let mut fields = Vec::with_capacity(fields_json.len());
        for field_json in fields_json {
            let field_obj = field_json
                .as_object()
                .ok_or_else(|| MappingError::schema(format!("field of '{name}' must be an object")))?;
            let field_name = field_obj
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| MappingError::schema(format!("field of '{name}' is missing a name")))?;
            let field_type = field_obj.get("type").ok_or_else(|| {
                MappingError::schema(format!("field '{name}.{field_name}' is missing a type"))
            })?;

            let mut field = Field::new(field_name, self.parse_node(field_type, namespace.as_deref())?);
            if let Some(default) = field_obj.get("default") {
                field = field.with_default(default.clone());
            }
            for (key, value) in field_obj {
                if !FIELD_KEYWORDS.contains(&key.as_str()) {
                    field = field.with_prop(key.clone(), value.clone());
                }
            }
            fields.push(field);
        }

        let props = obj
            .iter()
            .filter(|(k, _)| !RECORD_KEYWORDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let record = Schema::Record(Arc::new(RecordSchema::new(name, namespace, fields, props)?));
        self.define(&record)?;
        Ok(record)
    }

    fn parse_enum(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> MappingResult<Schema> {
        let (name, namespace) = named(obj, namespace)?;
        let symbols = obj
            .get("symbols")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| MappingError::schema(format!("enum '{name}' must contain symbols")))?
            .iter()
            .map(|s| {
                s.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| MappingError::schema(format!("enum '{name}' has a non-string symbol")))
            })
            .collect::<MappingResult<Vec<_>>>()?;
        let default = obj.get("default").and_then(JsonValue::as_str).map(str::to_string);

        let schema = Schema::Enum(Arc::new(EnumSchema {
            name,
            namespace,
            symbols,
            default,
        }));
        self.define(&schema)?;
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> MappingResult<Schema> {
        let (name, namespace) = named(obj, namespace)?;
        let size = obj
            .get("size")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| MappingError::schema(format!("fixed '{name}' must contain a size")))?;

        let schema = Schema::Fixed(Arc::new(FixedSchema {
            name,
            namespace,
            size: size as usize,
        }));
        self.define(&schema)?;
        Ok(schema)
    }

    fn resolve_name(&self, name: &str, namespace: Option<&str>) -> MappingResult<Schema> {
        let primitive = match name {
            "null" => Some(Schema::Null),
            "boolean" => Some(Schema::Boolean),
            "int" => Some(Schema::Int),
            "long" => Some(Schema::Long),
            "float" => Some(Schema::Float),
            "double" => Some(Schema::Double),
            "bytes" => Some(Schema::Bytes),
            "string" => Some(Schema::String),
            _ => None,
        };
        if let Some(schema) = primitive {
            return Ok(schema);
        }

        self.named
            .get(&qualify(name, namespace))
            .or_else(|| self.named.get(name))
            .cloned()
            .ok_or_else(|| MappingError::schema(format!("unknown schema type '{name}'")))
    }

    fn define(&mut self, schema: &Schema) -> MappingResult<()> {
        if let Some(full_name) = schema.full_name() {
            if self.named.contains_key(&full_name) {
                return Err(MappingError::schema(format!("type '{full_name}' defined twice")));
            }
            self.named.insert(full_name, schema.clone());
        }
        Ok(())
    }
}

/// Name and effective namespace of a named type declaration.
fn named(
    obj: &Map<String, JsonValue>,
    enclosing: Option<&str>,
) -> MappingResult<(String, Option<String>)> {
    let name = obj
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| MappingError::schema("named type must contain a name"))?;

    if let Some((ns, short)) = name.rsplit_once('.') {
        return Ok((short.to_string(), Some(ns.to_string())));
    }

    let namespace = obj
        .get("namespace")
        .and_then(JsonValue::as_str)
        .or(enclosing)
        .map(str::to_string);
    Ok((name.to_string(), namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(Schema::parse(r#""int""#).unwrap(), Schema::Int);
        assert_eq!(Schema::parse(r#"{"type": "string"}"#).unwrap(), Schema::String);
        assert_eq!(
            Schema::parse(r#"["null", "long"]"#).unwrap(),
            Schema::Union(vec![Schema::Null, Schema::Long])
        );
    }

    #[test]
    fn test_parse_record_with_props() {
        let record = Schema::parse_record(
            r#"{
                "type": "record", "name": "test", "tables": ["t1"],
                "fields": [
                    {"name": "f", "type": "int", "mapping": {"type": "column", "value": "a:b"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.prop("tables").unwrap()[0], "t1");
        let field = record.field("f").unwrap();
        assert_eq!(field.prop("mapping").unwrap()["value"], "a:b");
        assert!(field.prop("name").is_none());
    }

    #[test]
    fn test_named_type_reference() {
        let record = Schema::parse_record(
            r#"{
                "type": "record", "name": "outer", "namespace": "ns",
                "fields": [
                    {"name": "a", "type": {"type": "fixed", "name": "md5", "size": 16}},
                    {"name": "b", "type": "md5"},
                    {"name": "c", "type": "ns.md5"},
                    {"name": "d", "type": {"type": "enum", "name": "Suit", "symbols": ["CLUBS", "HEARTS"]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.field("b").unwrap().schema(), record.field("a").unwrap().schema());
        assert_eq!(record.field("c").unwrap().schema().full_name().unwrap(), "ns.md5");
        match record.field("d").unwrap().schema() {
            Schema::Enum(e) => assert_eq!(e.ordinal("HEARTS"), Some(1)),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_malformed_text() {
        let err = Schema::parse("{ not json").unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn test_record_without_fields() {
        let err = Schema::parse(r#"{"type": "record", "name": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("must contain fields"));
    }

    #[test]
    fn test_unknown_type() {
        let err = Schema::parse(r#"{"type": "record", "name": "x", "fields": [{"name": "a", "type": "widget"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown schema type 'widget'"));
    }

    #[test]
    fn test_nested_union_rejected() {
        assert!(Schema::parse(r#"["null", ["int", "long"]]"#).is_err());
    }
}
