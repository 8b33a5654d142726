//! API 모듈: 정적 엔티티 표현용 변환 트레이트
//!
//! SchemaType, IntoValue, FromValue 트레이트 제공

pub mod traits;

pub use traits::{FromValue, IntoValue, SchemaType};
