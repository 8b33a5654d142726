//! Field mapping model.
//!
//! A [`FieldMapping`] says where one entity field lives in a row: part of
//! the row key, one column, one counter column, or one column per entry of a
//! map/record ("key as column").

mod parser;
mod schema;

pub use parser::KeyEntitySchemaParser;
pub use schema::{EntitySchema, KeySchema};

use crate::error::{MappingError, MappingResult};
use crate::value::Value;
use std::fmt;

/// How a field maps onto the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Key,
    Column,
    Counter,
    KeyAsColumn,
}

impl MappingKind {
    /// Annotation spelling → kind. Unknown spellings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "key" => Some(MappingKind::Key),
            "column" => Some(MappingKind::Column),
            "counter" => Some(MappingKind::Counter),
            "keyAsColumn" => Some(MappingKind::KeyAsColumn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Key => "key",
            MappingKind::Column => "column",
            MappingKind::Counter => "counter",
            MappingKind::KeyAsColumn => "keyAsColumn",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity field's physical mapping. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    field_name: String,
    kind: MappingKind,
    location: String,
    default_value: Option<Value>,
    key_position: Option<usize>,
    family: Vec<u8>,
    qualifier: Vec<u8>,
}

impl FieldMapping {
    /// Validate `location` for `kind` and derive the physical coordinates.
    ///
    /// - `Key`: a non-negative integer key position.
    /// - `Column` / `Counter`: `"family:qualifier"`.
    /// - `KeyAsColumn`: `"family"` or `"family:"`.
    pub fn new(
        field_name: impl Into<String>,
        kind: MappingKind,
        location: impl Into<String>,
        default_value: Option<Value>,
    ) -> MappingResult<Self> {
        let field_name = field_name.into();
        let location = location.into();
        if location.is_empty() {
            return Err(MappingError::schema(format!(
                "{kind} mapping of field '{field_name}' must carry a value"
            )));
        }

        let (key_position, family, qualifier) = match kind {
            MappingKind::Key => {
                let pos = location.trim().parse::<usize>().map_err(|_| {
                    MappingError::schema(format!(
                        "key mapping of field '{field_name}' must be a non-negative integer key order, got '{location}'"
                    ))
                })?;
                (Some(pos), Vec::new(), Vec::new())
            }
            _ => {
                let (family, qualifier) = match location.split_once(':') {
                    Some((f, q)) => (f, q),
                    None => (location.as_str(), ""),
                };
                if family.is_empty() {
                    return Err(MappingError::schema(format!(
                        "{kind} mapping of field '{field_name}' has an empty column family"
                    )));
                }
                (None, family.as_bytes().to_vec(), qualifier.as_bytes().to_vec())
            }
        };

        Ok(Self {
            field_name,
            kind,
            location,
            default_value,
            key_position,
            family,
            qualifier,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    /// Raw annotation value.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Default derived from the schema, if the field declares one.
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Position within the row key; `Some` only for `Key` mappings.
    pub fn key_position(&self) -> Option<usize> {
        self.key_position
    }

    pub fn is_key(&self) -> bool {
        self.kind == MappingKind::Key
    }

    /// Column family bytes; `None` for `Key` mappings.
    pub fn family(&self) -> Option<&[u8]> {
        (!self.is_key()).then_some(self.family.as_slice())
    }

    /// Qualifier bytes (empty for `"family"` locations); `None` for keys.
    pub fn qualifier(&self) -> Option<&[u8]> {
        (!self.is_key()).then_some(self.qualifier.as_slice())
    }

    /// Column this mapping requires: `family:qualifier` for columns and
    /// counters, `family:` for key-as-column. `None` for keys.
    pub fn column_name(&self) -> Option<String> {
        match self.kind {
            MappingKind::Key => None,
            MappingKind::Column | MappingKind::Counter => Some(format!(
                "{}:{}",
                String::from_utf8_lossy(&self.family),
                String::from_utf8_lossy(&self.qualifier)
            )),
            MappingKind::KeyAsColumn => Some(format!("{}:", String::from_utf8_lossy(&self.family))),
        }
    }
}
