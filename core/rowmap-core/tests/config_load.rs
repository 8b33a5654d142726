// MapperConfig 파일 로딩 테스트

use rowmap_core::{EntityMapperBuilder, MapperConfig, MappingResult, SchemaSource};
use std::fs;
use tempfile::TempDir;

const READ: &str = r#"{"name": "item", "type": "record", "fields": [
    {"name": "sku", "type": "string", "mapping": {"type": "key", "value": "0"}},
    {"name": "qty", "type": "long", "mapping": {"type": "column", "value": "i:qty"}}
]}"#;

const WRITTEN: &str = r#"{"name": "item", "type": "record", "fields": [
    {"name": "sku", "type": "string"},
    {"name": "qty", "type": "int"}
]}"#;

#[test]
fn test_load_relative_paths() -> MappingResult<()> {
    let dir = TempDir::new()?;
    fs::create_dir(dir.path().join("schemas"))?;
    fs::write(dir.path().join("schemas/item.json"), READ)?;
    fs::write(dir.path().join("schemas/item_v0.json"), WRITTEN)?;
    let config_path = dir.path().join("mapper.json");
    fs::write(
        &config_path,
        r#"{"read_schema": {"path": "schemas/item.json"},
            "written_schema": {"path": "schemas/item_v0.json"}}"#,
    )?;

    let config = MapperConfig::load(&config_path)?;
    let (read, written) = config.resolve()?;
    assert_eq!(read, READ);
    assert_eq!(written.as_deref(), Some(WRITTEN));

    let mapper = EntityMapperBuilder::from_config(&config)?.build_generic()?;
    assert_eq!(mapper.entity_schema().name(), "item");
    Ok(())
}

#[test]
fn test_inline_config_builds_mapper() -> MappingResult<()> {
    let config = MapperConfig::new(SchemaSource::Inline(serde_json::from_str(READ)?));
    let text = serde_json::to_string(&config)?;
    let reparsed = MapperConfig::from_json_str(&text)?;
    assert_eq!(reparsed, config);

    let mapper = EntityMapperBuilder::from_config(&reparsed)?.build_generic()?;
    assert_eq!(mapper.key_schema().len(), 1);
    Ok(())
}

#[test]
fn test_missing_schema_file() -> MappingResult<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("mapper.json");
    fs::write(&config_path, r#"{"read_schema": {"path": "nope.json"}}"#)?;
    let config = MapperConfig::load(&config_path)?;
    assert!(EntityMapperBuilder::from_config(&config).is_err());
    Ok(())
}
