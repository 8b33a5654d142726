//! Mapper configuration files.
//!
//! ```json
//! {
//!   "read_schema": {"path": "schemas/user.json"},
//!   "written_schema": {"inline": {"name": "user", "type": "record", "fields": []}}
//! }
//! ```
//!
//! Relative paths resolve against the directory of the configuration file.

use crate::error::{MappingError, MappingResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a schema's text comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// Schema given in place, either as a JSON document or as its text.
    Inline(JsonValue),
    /// Schema file.
    Path(PathBuf),
}

/// Serializable description of one mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    pub read_schema: SchemaSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_schema: Option<SchemaSource>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl MapperConfig {
    pub fn new(read_schema: SchemaSource) -> Self {
        Self {
            read_schema,
            written_schema: None,
            base_dir: None,
        }
    }

    pub fn with_written_schema(mut self, written_schema: SchemaSource) -> Self {
        self.written_schema = Some(written_schema);
        self
    }

    pub fn from_json_str(json: &str) -> MappingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> MappingResult<Self> {
        let path = path.as_ref();
        let mut config = Self::from_json_str(&fs::read_to_string(path)?)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "loaded mapper config");
        Ok(config)
    }

    /// Read and written schema texts.
    pub fn resolve(&self) -> MappingResult<(String, Option<String>)> {
        let read = self.schema_text(&self.read_schema)?;
        let written = self
            .written_schema
            .as_ref()
            .map(|s| self.schema_text(s))
            .transpose()?;
        Ok((read, written))
    }

    fn schema_text(&self, source: &SchemaSource) -> MappingResult<String> {
        match source {
            SchemaSource::Inline(JsonValue::String(text)) => Ok(text.clone()),
            SchemaSource::Inline(json @ JsonValue::Object(_)) => Ok(serde_json::to_string(json)?),
            SchemaSource::Inline(other) => Err(MappingError::schema(format!(
                "inline schema must be an object or a string, found {other}"
            ))),
            SchemaSource::Path(path) => {
                let path = match &self.base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                Ok(fs::read_to_string(path)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_object_and_text() {
        let config = MapperConfig::from_json_str(
            r#"{"read_schema": {"inline": {"name": "a", "type": "record", "fields": []}},
                "written_schema": {"inline": "{\"name\":\"a\",\"type\":\"record\",\"fields\":[]}"}}"#,
        )
        .unwrap();
        let (read, written) = config.resolve().unwrap();
        assert_eq!(
            serde_json::from_str::<JsonValue>(&read).unwrap(),
            json!({"name": "a", "type": "record", "fields": []})
        );
        assert!(written.unwrap().starts_with("{\"name\":\"a\""));
    }

    #[test]
    fn test_written_schema_optional() {
        let config = MapperConfig::new(SchemaSource::Inline(json!("{}")));
        assert_eq!(config.resolve().unwrap(), ("{}".to_string(), None));
    }

    #[test]
    fn test_inline_number_rejected() {
        let config = MapperConfig::new(SchemaSource::Inline(json!(3)));
        assert!(config.resolve().unwrap_err().is_schema_validation());
    }

    #[test]
    fn test_malformed_config() {
        assert!(MapperConfig::from_json_str(r#"{"read_schema": {"url": "x"}}"#)
            .unwrap_err()
            .is_schema_validation());
    }

    #[test]
    fn test_missing_file() {
        let config = MapperConfig::new(SchemaSource::Path(PathBuf::from("/nonexistent/rowmap/schema.json")));
        assert!(matches!(config.resolve(), Err(MappingError::Io { .. })));
    }
}
