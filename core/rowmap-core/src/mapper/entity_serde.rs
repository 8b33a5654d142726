use crate::codec::ColumnCodec;
use crate::composer::EntityComposer;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{EntitySchema, FieldMapping, MappingKind};
use crate::record::Record;
use crate::schema::{RecordSchema, Schema};
use crate::storage::{Cell, Row};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read/written schema pair for one stored value.
#[derive(Debug, Clone)]
struct ValueCodec {
    read: Schema,
    written: Option<Schema>,
}

#[derive(Debug, Clone)]
enum FieldCodec {
    Column(ValueCodec),
    /// Always an 8-byte cell, so store increments and entity writes agree.
    Counter(ValueCodec),
    /// Map-typed key-as-column field: one codec for every entry.
    KeyAsColumnMap(ValueCodec),
    /// Record-typed key-as-column field: one codec per sub-field.
    KeyAsColumnRecord(HashMap<String, ValueCodec>),
}

/// Converts single fields to and from cells.
///
/// Values are always written with the read schema. Decoding reads each
/// cell as the written schema's type and resolves it to the read schema;
/// fields (and record sub-fields) the written schema lacks decode as no
/// value.
pub struct EntitySerDe<E> {
    composer: Arc<EntityComposer<E>>,
    column_codec: ColumnCodec,
    fields: HashMap<String, FieldCodec>,
}

impl<E: Record> EntitySerDe<E> {
    pub fn new(
        composer: Arc<EntityComposer<E>>,
        written: &RecordSchema,
        column_codec: ColumnCodec,
    ) -> MappingResult<Self> {
        let entity_schema = composer.entity_schema().clone();
        let record = entity_schema.record_schema();
        let mut fields = HashMap::new();

        for mapping in entity_schema.field_mappings() {
            let name = mapping.field_name();
            let read = record
                .field(name)
                .map(|f| f.schema().clone())
                .ok_or_else(|| MappingError::UnknownField {
                    field: name.to_string(),
                    schema: record.full_name(),
                })?;
            let written = written.field(name).map(|f| f.schema().clone());
            if written.is_none() {
                tracing::debug!(field = name, "field absent from written schema; it will read as no value");
            }

            let codec = match mapping.kind() {
                MappingKind::Key => continue,
                MappingKind::Column => FieldCodec::Column(ValueCodec { read, written }),
                MappingKind::Counter => FieldCodec::Counter(ValueCodec { read, written }),
                MappingKind::KeyAsColumn => match read {
                    Schema::Map(values) => FieldCodec::KeyAsColumnMap(ValueCodec {
                        read: *values,
                        written: match written {
                            Some(Schema::Map(w)) => Some(*w),
                            Some(other) => return Err(written_mismatch(name, &other)),
                            None => None,
                        },
                    }),
                    Schema::Record(sub) => {
                        let written_sub = match written {
                            Some(Schema::Record(w)) => Some(w),
                            Some(other) => return Err(written_mismatch(name, &other)),
                            None => None,
                        };
                        let sub_codecs = sub
                            .fields()
                            .iter()
                            .map(|f| {
                                let w = written_sub
                                    .as_ref()
                                    .and_then(|w| w.field(f.name()))
                                    .map(|wf| wf.schema().clone());
                                (
                                    f.name().to_string(),
                                    ValueCodec {
                                        read: f.schema().clone(),
                                        written: w,
                                    },
                                )
                            })
                            .collect();
                        FieldCodec::KeyAsColumnRecord(sub_codecs)
                    }
                    other => {
                        return Err(MappingError::schema(format!(
                            "unsupported type for keyAsColumn field '{name}': {other}"
                        )));
                    }
                },
            };
            fields.insert(name.to_string(), codec);
        }

        Ok(Self {
            composer,
            column_codec,
            fields,
        })
    }

    pub fn entity_schema(&self) -> &Arc<EntitySchema> {
        self.composer.entity_schema()
    }

    pub fn composer(&self) -> &Arc<EntityComposer<E>> {
        &self.composer
    }

    /// Cells for one field value.
    pub fn serialize(&self, mapping: &FieldMapping, value: &Value) -> MappingResult<Vec<Cell>> {
        let (family, qualifier) = coordinates(mapping)?;
        match self.field_codec(mapping)? {
            FieldCodec::Column(codec) => {
                let bytes = self.column_codec.encode(value, &codec.read)?;
                Ok(vec![Cell::new(family, qualifier, bytes)])
            }
            FieldCodec::Counter(_) => {
                let bytes = self.column_codec.encode_counter(value)?;
                Ok(vec![Cell::new(family, qualifier, bytes)])
            }
            FieldCodec::KeyAsColumnMap(codec) => self
                .composer
                .extract_key_as_column_values(mapping.field_name(), value)?
                .into_iter()
                .map(|(key, v)| {
                    let bytes = self.column_codec.delegate().encode(&v, &codec.read)?;
                    Ok(Cell::new(family, key.into_bytes(), bytes))
                })
                .collect(),
            FieldCodec::KeyAsColumnRecord(codecs) => self
                .composer
                .extract_key_as_column_values(mapping.field_name(), value)?
                .into_iter()
                .map(|(key, v)| {
                    let codec = codecs.get(&key).ok_or_else(|| MappingError::UnknownField {
                        field: format!("{}.{key}", mapping.field_name()),
                        schema: self.entity_schema().record_schema().full_name(),
                    })?;
                    let bytes = self.column_codec.delegate().encode(&v, &codec.read)?;
                    Ok(Cell::new(family, key.into_bytes(), bytes))
                })
                .collect(),
        }
    }

    /// One field's value from `row`; `None` when nothing is stored for it.
    pub fn deserialize(&self, mapping: &FieldMapping, row: &Row) -> MappingResult<Option<Value>> {
        let (family, qualifier) = coordinates(mapping)?;
        match self.field_codec(mapping)? {
            FieldCodec::Column(codec) => {
                let (Some(written), Some(bytes)) = (&codec.written, row.value(family, qualifier)) else {
                    return Ok(None);
                };
                self.column_codec.decode(bytes, written, &codec.read).map(Some)
            }
            FieldCodec::Counter(codec) => {
                let (Some(_), Some(bytes)) = (&codec.written, row.value(family, qualifier)) else {
                    return Ok(None);
                };
                self.column_codec.decode_counter(bytes, &codec.read).map(Some)
            }
            FieldCodec::KeyAsColumnMap(codec) => {
                let Some(written) = &codec.written else {
                    return Ok(None);
                };
                let Some(cells) = row.family(family).filter(|c| !c.is_empty()) else {
                    return Ok(None);
                };
                let delegate = self.column_codec.delegate();
                let mut entries = BTreeMap::new();
                for (q, bytes) in cells {
                    entries.insert(qualifier_key(q)?, delegate.decode(bytes, written, &codec.read)?);
                }
                self.composer
                    .build_key_as_column_field(mapping.field_name(), entries)
                    .map(Some)
            }
            FieldCodec::KeyAsColumnRecord(codecs) => {
                let Some(cells) = row.family(family).filter(|c| !c.is_empty()) else {
                    return Ok(None);
                };
                let delegate = self.column_codec.delegate();
                let mut entries = BTreeMap::new();
                for (q, bytes) in cells {
                    let key = qualifier_key(q)?;
                    let Some(ValueCodec { read, written: Some(written) }) = codecs.get(&key) else {
                        tracing::debug!(field = mapping.field_name(), sub_field = %key, "skipping unmapped sub-field cell");
                        continue;
                    };
                    let value = delegate.decode(bytes, written, read)?;
                    entries.insert(key, value);
                }
                if entries.is_empty() {
                    return Ok(None);
                }
                self.composer
                    .build_key_as_column_field(mapping.field_name(), entries)
                    .map(Some)
            }
        }
    }

    fn field_codec(&self, mapping: &FieldMapping) -> MappingResult<&FieldCodec> {
        self.fields.get(mapping.field_name()).ok_or_else(|| {
            MappingError::schema(format!(
                "no column codec for field '{}' with {} mapping",
                mapping.field_name(),
                mapping.kind()
            ))
        })
    }
}

/// Family and qualifier of a non-key mapping.
fn coordinates(mapping: &FieldMapping) -> MappingResult<(&[u8], &[u8])> {
    match (mapping.family(), mapping.qualifier()) {
        (Some(f), Some(q)) => Ok((f, q)),
        _ => Err(MappingError::schema(format!(
            "invalid field mapping for field '{}': {} fields have no column",
            mapping.field_name(),
            mapping.kind()
        ))),
    }
}

fn qualifier_key(qualifier: &[u8]) -> MappingResult<String> {
    String::from_utf8(qualifier.to_vec())
        .map_err(|e| MappingError::serialization(format!("qualifier is not utf-8: {e}")))
}

fn written_mismatch(field: &str, written: &Schema) -> MappingError {
    MappingError::schema(format!(
        "keyAsColumn field '{field}' was written as {written}, which cannot be read as a key-as-column value"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryCodec;
    use crate::mapping::KeyEntitySchemaParser;
    use crate::record::{GenericRecord, GenericRecordFactory};

    const READ: &str = r#"{"name":"r","type":"record","fields":[
        {"name":"id","type":"int","mapping":{"type":"key","value":"0"}},
        {"name":"n","type":"long","mapping":{"type":"column","value":"c:n"}},
        {"name":"hits","type":"int","mapping":{"type":"counter","value":"c:hits"}},
        {"name":"added","type":"string","mapping":{"type":"column","value":"c:added"}},
        {"name":"m","type":{"type":"map","values":"long"},"mapping":{"type":"keyAsColumn","value":"m"}},
        {"name":"s","type":{"type":"record","name":"s","fields":[
            {"name":"a","type":"int"},{"name":"b","type":"string","default":"-"}
        ]},"mapping":{"type":"keyAsColumn","value":"s:"}}
    ]}"#;

    const WRITTEN: &str = r#"{"name":"r","type":"record","fields":[
        {"name":"id","type":"int"},
        {"name":"n","type":"int"},
        {"name":"m","type":{"type":"map","values":"int"}},
        {"name":"s","type":{"type":"record","name":"s","fields":[{"name":"a","type":"int"}]}}
    ]}"#;

    fn serde(written: &str) -> EntitySerDe<GenericRecord> {
        let parser = KeyEntitySchemaParser::default();
        let (entity, key) = parser.parse(READ).unwrap();
        let factory = Arc::new(GenericRecordFactory::new(entity.record_schema().clone()));
        let composer = EntityComposer::new(Arc::new(entity), &key, factory, &BinaryCodec).unwrap();
        let written = Schema::parse_record(written).unwrap();
        EntitySerDe::new(Arc::new(composer), &written, ColumnCodec::new(BinaryCodec::shared())).unwrap()
    }

    fn mapping<'a>(s: &'a EntitySerDe<GenericRecord>, name: &str) -> &'a FieldMapping {
        s.entity_schema().field_mapping(name).unwrap()
    }

    #[test]
    fn test_column_uses_packed_form() {
        let s = serde(READ);
        let cells = s.serialize(mapping(&s, "n"), &Value::Long(2)).unwrap();
        assert_eq!(cells, vec![Cell::new("c", "n", vec![0, 0, 0, 0, 0, 0, 0, 2])]);
    }

    #[test]
    fn test_map_entries_become_cells() {
        let s = serde(READ);
        let mut entries = BTreeMap::new();
        entries.insert("x".to_string(), Value::Long(1));
        entries.insert("y".to_string(), Value::Long(-1));
        let cells = s.serialize(mapping(&s, "m"), &Value::Map(entries.clone())).unwrap();
        assert_eq!(cells, vec![Cell::new("m", "x", vec![2]), Cell::new("m", "y", vec![1])]);

        let row = Row::from_cells(b"k".to_vec(), cells);
        assert_eq!(s.deserialize(mapping(&s, "m"), &row).unwrap(), Some(Value::Map(entries)));
    }

    #[test]
    fn test_key_mapping_rejected() {
        let s = serde(READ);
        let err = s.serialize(mapping(&s, "id"), &Value::Int(1)).unwrap_err();
        assert!(err.is_schema_validation());
        assert!(s.deserialize(mapping(&s, "id"), &Row::new(b"k".to_vec())).unwrap_err().is_schema_validation());
    }

    #[test]
    fn test_absent_and_empty_cells() {
        let s = serde(READ);
        let empty = Row::new(b"k".to_vec());
        assert_eq!(s.deserialize(mapping(&s, "added"), &empty).unwrap(), None);
        assert_eq!(s.deserialize(mapping(&s, "m"), &empty).unwrap(), None);
        let row = Row::from_cells(b"k".to_vec(), vec![Cell::new("c", "added", vec![])]);
        assert_eq!(s.deserialize(mapping(&s, "added"), &row).unwrap(), Some(Value::from("")));
    }

    #[test]
    fn test_evolution_from_written_schema() {
        let s = serde(WRITTEN);
        let row = Row::from_cells(
            b"k".to_vec(),
            vec![
                Cell::new("c", "n", vec![0, 0, 0, 9]),
                Cell::new("c", "added", b"ignored".to_vec()),
                Cell::new("m", "x", vec![4]),
                Cell::new("s", "a", vec![6]),
                Cell::new("s", "b", vec![2, b'z']),
            ],
        );
        assert_eq!(s.deserialize(mapping(&s, "n"), &row).unwrap(), Some(Value::Long(9)));
        assert_eq!(s.deserialize(mapping(&s, "added"), &row).unwrap(), None);
        let Some(Value::Map(m)) = s.deserialize(mapping(&s, "m"), &row).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(m.get("x"), Some(&Value::Long(2)));
        let Some(Value::Record(sub)) = s.deserialize(mapping(&s, "s"), &row).unwrap() else {
            panic!("expected record");
        };
        assert_eq!(sub.values(), [Value::Int(3), Value::from("-")]);
    }

    #[test]
    fn test_int_counter_uses_wide_cell() {
        let s = serde(READ);
        let cells = s.serialize(mapping(&s, "hits"), &Value::Int(4)).unwrap();
        assert_eq!(cells, vec![Cell::new("c", "hits", vec![0, 0, 0, 0, 0, 0, 0, 4])]);
        let row = Row::from_cells(b"k".to_vec(), cells);
        assert_eq!(s.deserialize(mapping(&s, "hits"), &row).unwrap(), Some(Value::Int(4)));
    }

    #[test]
    fn test_record_family_with_only_unknown_qualifiers() {
        let s = serde(READ);
        let row = Row::from_cells(b"k".to_vec(), vec![Cell::new("s", "zzz", vec![2])]);
        assert_eq!(s.deserialize(mapping(&s, "s"), &row).unwrap(), None);
    }

    #[test]
    fn test_unknown_record_sub_field_on_write() {
        let s = serde(READ);
        let other = Schema::parse_record(
            r#"{"name":"s","type":"record","fields":[{"name":"zzz","type":"int"}]}"#,
        )
        .unwrap();
        let value = Value::Record(GenericRecord::new(other).set("zzz", 1).unwrap());
        assert!(s.serialize(mapping(&s, "s"), &value).unwrap_err().is_precondition());
    }
}
