//! Entity representations.
//!
//! Both the dynamic [`GenericRecord`] and statically-typed structs (via
//! `#[derive(Record)]`) implement [`Record`]. The rest of the pipeline only
//! ever talks to that trait.

use crate::error::{MappingError, MappingResult};
use crate::schema::RecordSchema;
use crate::value::Value;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Positional field access plus schema introspection.
pub trait Record: Send + Sync + fmt::Debug {
    /// Schema describing this record's shape.
    fn schema(&self) -> Arc<RecordSchema>;

    /// Value at `pos`; `Value::Null` when unset.
    fn get(&self, pos: usize) -> Value;

    /// Replace the value at `pos`.
    fn put(&mut self, pos: usize, value: Value) -> MappingResult<()>;

    fn field_count(&self) -> usize {
        self.schema().fields().len()
    }
}

/// Statically-typed record with a canonical per-type shape.
///
/// Implemented by `#[derive(Record)]`.
pub trait SpecificRecord: Record + Default + Clone + 'static {
    /// Schema type name the type was generated for.
    const SCHEMA_NAME: &'static str;

    fn record_schema() -> Arc<RecordSchema>;
}

/// Dynamically-typed record: a schema plus one value per field.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Arc<RecordSchema>,
    values: Vec<Value>,
}

impl GenericRecord {
    /// Record with every field unset.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let values = vec![Value::Null; schema.fields().len()];
        Self { schema, values }
    }

    /// Record holding `values` in field order; missing trailing values are
    /// unset and extra ones are dropped.
    pub fn from_values(schema: Arc<RecordSchema>, mut values: Vec<Value>) -> Self {
        values.resize(schema.fields().len(), Value::Null);
        Self { schema, values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).map(|pos| &self.values[pos])
    }

    pub fn put_by_name(&mut self, name: &str, value: Value) -> MappingResult<()> {
        let pos = self
            .schema
            .position(name)
            .ok_or_else(|| MappingError::UnknownField {
                field: name.to_string(),
                schema: self.schema.full_name(),
            })?;
        self.values[pos] = value;
        Ok(())
    }

    /// Chaining form of [`put_by_name`](Self::put_by_name).
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> MappingResult<Self> {
        self.put_by_name(name, value.into())?;
        Ok(self)
    }
}

impl Record for GenericRecord {
    fn schema(&self) -> Arc<RecordSchema> {
        self.schema.clone()
    }

    fn get(&self, pos: usize) -> Value {
        self.values.get(pos).cloned().unwrap_or_default()
    }

    fn put(&mut self, pos: usize, value: Value) -> MappingResult<()> {
        let len = self.values.len();
        let slot = self.values.get_mut(pos).ok_or_else(|| {
            MappingError::Precondition(format!(
                "position {pos} out of range for record '{}' with {len} fields",
                self.schema.full_name()
            ))
        })?;
        *slot = value;
        Ok(())
    }

    fn field_count(&self) -> usize {
        self.values.len()
    }
}

/// Creates blank entities of one representation.
pub trait RecordFactory<E>: Send + Sync {
    fn create(&self) -> E;
}

/// Factory for [`GenericRecord`]s of a fixed schema.
#[derive(Debug, Clone)]
pub struct GenericRecordFactory {
    schema: Arc<RecordSchema>,
}

impl GenericRecordFactory {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }
}

impl RecordFactory<GenericRecord> for GenericRecordFactory {
    fn create(&self) -> GenericRecord {
        GenericRecord::new(self.schema.clone())
    }
}

/// Factory backed by a registered constructor function.
pub struct SpecificRecordFactory<E> {
    ctor: fn() -> E,
}

impl<E: SpecificRecord> SpecificRecordFactory<E> {
    pub fn new() -> Self {
        Self { ctor: E::default }
    }

    pub fn with_constructor(ctor: fn() -> E) -> Self {
        Self { ctor }
    }
}

impl<E: SpecificRecord> Default for SpecificRecordFactory<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SpecificRecordFactory<E> {
    fn clone(&self) -> Self {
        Self { ctor: self.ctor }
    }
}

impl<E: SpecificRecord> RecordFactory<E> for SpecificRecordFactory<E> {
    fn create(&self) -> E {
        (self.ctor)()
    }
}

/// Schema type name → constructor, filled by explicit registration.
///
/// Resolved once while a mapper is built, never per entity.
#[derive(Default)]
pub struct RecordRegistry {
    constructors: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` under its schema name with `Default` as constructor.
    pub fn register<E: SpecificRecord>(&self) {
        self.register_with::<E>(E::default);
    }

    pub fn register_with<E: SpecificRecord>(&self, ctor: fn() -> E) {
        tracing::debug!(type_name = E::SCHEMA_NAME, "registering record constructor");
        self.constructors.insert(
            E::SCHEMA_NAME.to_string(),
            Arc::new(SpecificRecordFactory::with_constructor(ctor)),
        );
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Constructor registered for `type_name`, typed as `E`.
    pub fn factory<E: SpecificRecord>(&self, type_name: &str) -> MappingResult<SpecificRecordFactory<E>> {
        let entry = self.constructors.get(type_name).ok_or_else(|| {
            MappingError::schema(format!("no record constructor registered for '{type_name}'"))
        })?;
        entry
            .value()
            .downcast_ref::<SpecificRecordFactory<E>>()
            .cloned()
            .ok_or_else(|| {
                MappingError::schema(format!(
                    "constructor registered for '{type_name}' does not build {}",
                    std::any::type_name::<E>()
                ))
            })
    }
}

impl fmt::Debug for RecordRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("RecordRegistry").field("types", &names).finish()
    }
}
