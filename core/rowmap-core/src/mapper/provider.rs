use super::{EntityMapper, EntitySerDe, KeySerDe};
use crate::codec::{BinaryCodec, ColumnCodec, RecordCodec};
use crate::composer::EntityComposer;
use crate::config::MapperConfig;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{EntitySchema, KeyEntitySchemaParser, KeySchema};
use crate::record::{GenericRecord, GenericRecordFactory, Record, RecordFactory, RecordRegistry, SpecificRecord, SpecificRecordFactory};
use crate::schema::{RecordSchema, Schema};
use std::sync::Arc;

/// Assembles an [`EntityMapper`] from schema text.
///
/// # Example
///
/// ```rust
/// use rowmap_core::EntityMapperBuilder;
///
/// let mapper = EntityMapperBuilder::new(
///     r#"{"name": "user", "type": "record", "fields": [
///         {"name": "id", "type": "long", "mapping": {"type": "key", "value": "0"}},
///         {"name": "name", "type": "string", "mapping": {"type": "column", "value": "d:name"}}
///     ]}"#,
/// )
/// .build_generic()?;
/// assert_eq!(mapper.key_schema().len(), 1);
/// # Ok::<(), rowmap_core::MappingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EntityMapperBuilder {
    read_schema: String,
    written_schema: Option<String>,
    codec: Arc<dyn RecordCodec>,
    registry: Option<Arc<RecordRegistry>>,
}

impl EntityMapperBuilder {
    /// `read_schema` is the annotated schema entities are produced in.
    pub fn new(read_schema: impl Into<String>) -> Self {
        Self {
            read_schema: read_schema.into(),
            written_schema: None,
            codec: BinaryCodec::shared(),
            registry: None,
        }
    }

    pub fn from_config(config: &MapperConfig) -> MappingResult<Self> {
        let (read, written) = config.resolve()?;
        let builder = Self::new(read);
        Ok(match written {
            Some(written) => builder.written_schema(written),
            None => builder,
        })
    }

    /// Schema the stored cells were written with. Defaults to the read schema.
    pub fn written_schema(mut self, written_schema: impl Into<String>) -> Self {
        self.written_schema = Some(written_schema.into());
        self
    }

    /// Structured-record codec for non-packed columns and defaults.
    pub fn codec(mut self, codec: Arc<dyn RecordCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Constructor registry consulted by [`build_specific`](Self::build_specific).
    pub fn registry(mut self, registry: Arc<RecordRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Mapper over [`GenericRecord`] entities.
    pub fn build_generic(&self) -> MappingResult<EntityMapper<GenericRecord>> {
        let (entity, key) = self.parse()?;
        let factory = Arc::new(GenericRecordFactory::new(entity.record_schema().clone()));
        self.assemble(entity, key, factory)
    }

    /// Mapper over a derived record type.
    ///
    /// `E`'s fields must carry the schema's field names in the same order.
    pub fn build_specific<E: SpecificRecord>(&self) -> MappingResult<EntityMapper<E>> {
        let (entity, key) = self.parse()?;
        check_shape(&E::record_schema(), entity.record_schema())?;

        let factory: Arc<dyn RecordFactory<E>> = match &self.registry {
            Some(registry) => Arc::new(registry.factory::<E>(&entity.record_schema().full_name())?),
            None => Arc::new(SpecificRecordFactory::<E>::new()),
        };
        self.assemble(entity, key, factory)
    }

    fn parse(&self) -> MappingResult<(EntitySchema, KeySchema)> {
        KeyEntitySchemaParser::new(self.codec.clone()).parse(&self.read_schema)
    }

    fn written(&self, entity: &EntitySchema) -> MappingResult<Arc<RecordSchema>> {
        match &self.written_schema {
            Some(text) => Schema::parse_record(text),
            None => Ok(entity.record_schema().clone()),
        }
    }

    fn assemble<E: Record>(
        &self,
        entity: EntitySchema,
        key: KeySchema,
        factory: Arc<dyn RecordFactory<E>>,
    ) -> MappingResult<EntityMapper<E>> {
        let written = self.written(&entity)?;
        let entity = Arc::new(entity);
        let key = Arc::new(key);

        let composer = EntityComposer::new(entity, &key, factory, self.codec.as_ref())?;
        let entity_serde = EntitySerDe::new(Arc::new(composer), &written, ColumnCodec::new(self.codec.clone()))?;
        let key_serde = KeySerDe::new(key)?;
        Ok(EntityMapper::new(key_serde, entity_serde))
    }
}

fn check_shape(derived: &RecordSchema, parsed: &RecordSchema) -> MappingResult<()> {
    let derived_names = derived.fields().iter().map(|f| f.name());
    let parsed_names = parsed.fields().iter().map(|f| f.name());
    if derived_names.ne(parsed_names) {
        return Err(MappingError::schema(format!(
            "record type '{}' does not match the fields of schema '{}'",
            derived.full_name(),
            parsed.full_name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"name":"evt","namespace":"app","type":"record","fields":[
        {"name":"id","type":"long","mapping":{"type":"key","value":"0"}},
        {"name":"kind","type":"string","mapping":{"type":"column","value":"e:kind"}}
    ]}"#;

    #[test]
    fn test_build_generic() {
        let mapper = EntityMapperBuilder::new(SCHEMA).build_generic().unwrap();
        assert_eq!(mapper.entity_schema().name(), "evt");
        assert_eq!(mapper.key_schema().len(), 1);
    }

    #[test]
    fn test_bad_written_schema() {
        let err = EntityMapperBuilder::new(SCHEMA)
            .written_schema("not json")
            .build_generic()
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn test_written_kac_type_mismatch() {
        let read = r#"{"name":"r","type":"record","fields":[
            {"name":"id","type":"int","mapping":{"type":"key","value":"0"}},
            {"name":"m","type":{"type":"map","values":"int"},"mapping":{"type":"keyAsColumn","value":"m"}}
        ]}"#;
        let written = r#"{"name":"r","type":"record","fields":[
            {"name":"id","type":"int"},{"name":"m","type":"string"}
        ]}"#;
        let err = EntityMapperBuilder::new(read)
            .written_schema(written)
            .build_generic()
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn test_shape_check() {
        let a = Schema::parse_record(SCHEMA).unwrap();
        let b = Schema::parse_record(
            r#"{"name":"evt","type":"record","fields":[{"name":"kind","type":"string"},{"name":"id","type":"long"}]}"#,
        )
        .unwrap();
        assert!(check_shape(&a, &a).is_ok());
        assert!(check_shape(&a, &b).unwrap_err().is_schema_validation());
    }
}
