//! derive(Record) 매크로 테스트

use rowmap_core::{FromValue, IntoValue, Record, Schema, SchemaType, SpecificRecord, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[rowmap(name = "point", namespace = "geo")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Place {
    pub id: i64,
    #[rowmap(rename = "displayName")]
    pub display_name: String,
    pub note: Option<String>,
    pub tags: BTreeMap<String, i32>,
    pub at: Point,
}

#[test]
fn test_schema_name() {
    assert_eq!(Point::SCHEMA_NAME, "geo.point");
    assert_eq!(Place::SCHEMA_NAME, "Place");
}

#[test]
fn test_schema() {
    let schema = Place::record_schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["id", "displayName", "note", "tags", "at"]);
    assert_eq!(schema.fields()[0].schema(), &Schema::Long);
    assert!(schema.fields()[2].schema().is_nullable());
    assert_eq!(schema.field("at").unwrap().schema(), &Point::schema_type());
    assert!(std::sync::Arc::ptr_eq(&schema, &Place::record_schema()));
}

#[test]
fn test_positional_access() {
    let mut place = Place::default();
    place.put(0, Value::Long(9)).unwrap();
    place.put(1, Value::from("home")).unwrap();
    place.put(2, Value::Null).unwrap();
    assert_eq!(place.id, 9);
    assert_eq!(place.display_name, "home");
    assert_eq!(place.note, None);
    assert_eq!(place.get(1), Value::from("home"));
    assert_eq!(place.get(17), Value::Null);
    assert_eq!(place.field_count(), 5);
    assert!(place.put(5, Value::Null).is_err());
    assert!(place.put(0, Value::from("nope")).is_err());
}

#[test]
fn test_nested_record_values() {
    let point = Point { x: 1, y: -2 };
    let value = point.clone().into_value();
    let record = value.as_record().unwrap();
    assert_eq!(record.schema().full_name(), "geo.point");
    assert_eq!(record.values(), [Value::Int(1), Value::Int(-2)]);
    assert_eq!(Point::from_value(value).unwrap(), point);
    assert_eq!(Point::from_value(Value::Null).unwrap(), Point::default());
    assert!(Point::from_value(Value::Int(1)).is_err());
}

#[test]
fn test_map_field() {
    let mut place = Place::default();
    let mut tags = BTreeMap::new();
    tags.insert("a".to_string(), Value::Int(1));
    place.put(3, Value::Map(tags.clone())).unwrap();
    assert_eq!(place.tags.get("a"), Some(&1));
    assert_eq!(place.get(3), Value::Map(tags));
}

#[test]
fn test_into_value_fills_every_field() {
    let place = Place {
        id: 4,
        display_name: "cabin".to_string(),
        note: Some("n".to_string()),
        tags: BTreeMap::new(),
        at: Point { x: 3, y: 5 },
    };
    let value = place.clone().into_value();
    let record = value.as_record().unwrap();
    assert_eq!(record.values().len(), 5);
    assert_eq!(record.get_by_name("displayName"), Some(&Value::from("cabin")));
    assert_eq!(record.get(2), Value::from("n"));
    assert_eq!(Place::from_value(value).unwrap(), place);
}
