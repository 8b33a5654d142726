//! # rowmap: Entity ↔ Column-Family Row Mapping
//!
//! rowmap은 스키마로 기술된 엔티티를 Bigtable/HBase 형태의 정렬된 컬럼 패밀리 행으로
//! 변환하고, 저장된 행에서 다시 엔티티를 복원합니다.
//!
//! ## 주요 특징
//!
//! - **선언적 매핑**: 필드마다 `key`, `column`, `counter`, `keyAsColumn` 중 하나로 배치
//! - **순서 보존 키**: 인코딩된 행 키의 바이트 순서가 키 값의 순서와 일치
//! - **부분 키**: 앞쪽 키 필드만으로 만든 키가 전체 키의 접두사가 되어 범위 스캔에 사용
//! - **스키마 진화**: 기록 당시 스키마와 현재 스키마가 달라도 필드 단위로 해석
//!
//! ## 빠른 시작
//!
//! ```rust
//! use rowmap_core::{EntityMapperBuilder, Row, Value};
//!
//! # fn main() -> rowmap_core::MappingResult<()> {
//! let mapper = EntityMapperBuilder::new(
//!     r#"{"name": "user", "type": "record", "fields": [
//!         {"name": "id", "type": "long", "mapping": {"type": "key", "value": "0"}},
//!         {"name": "name", "type": "string", "mapping": {"type": "column", "value": "d:name"}}
//!     ]}"#,
//! )
//! .build_generic()?;
//!
//! let mut builder = mapper.composer().builder();
//! builder.put("id", Value::Long(1))?.put("name", Value::from("ann"))?;
//! let mutation = mapper.map_from_entity(&builder.build())?;
//!
//! let row = Row::from_cells(mutation.key(), mutation.cells().to_vec());
//! let user = mapper.map_to_entity(&row)?.expect("row holds the entity");
//! assert_eq!(user.get_by_name("name"), Some(&Value::from("ann")));
//! # Ok(())
//! # }
//! ```
//!
//! ## 모듈 구조
//!
//! - [`schema`]: 레코드 스키마 모델과 파서
//! - [`mapping`]: 필드 매핑, EntitySchema / KeySchema
//! - [`codec`]: 구조 코덱, 컬럼 코덱, 순서 보존 코덱
//! - [`mapper`]: [`EntityMapper`] 와 빌더
//! - [`storage`]: 행 모델과 [`RowStore`] 경계
//! - [`config`]: 매퍼 설정 파일

pub mod api;
pub mod codec;
pub mod composer;
pub mod config;
pub mod error;
pub mod mapper;
pub mod mapping;
pub mod record;
pub mod schema;
pub mod storage;
pub mod value;

// Logging utilities
pub mod logging;

// Lets the derive's generated `::rowmap_core::...` paths resolve inside this crate's own tests.
extern crate self as rowmap_core;

// Re-export commonly used types
pub use api::{FromValue, IntoValue, SchemaType};
pub use codec::{BinaryCodec, ColumnCodec, RecordCodec};
pub use composer::{EntityBuilder, EntityComposer, KeyParts};
pub use config::{MapperConfig, SchemaSource};
pub use error::{MappingError, MappingResult};
pub use mapper::{EntityMapper, EntityMapperBuilder, EntitySerDe, KeySerDe};
pub use mapping::{EntitySchema, FieldMapping, KeyEntitySchemaParser, KeySchema, MappingKind};
pub use record::{
    GenericRecord, GenericRecordFactory, Record, RecordFactory, RecordRegistry, SpecificRecord,
    SpecificRecordFactory,
};
pub use schema::{Field, RecordSchema, Schema};
pub use storage::{Cell, EntityDao, Increment, MemoryRowStore, Row, RowMutation, RowStore};
pub use value::Value;

// Re-export derive macros
pub use rowmap_derive::Record;
