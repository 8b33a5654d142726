//! Storage collaborator boundary.
//!
//! The mapper only prepares and interprets payloads; reads, writes and
//! increments are carried out by a [`RowStore`].

pub mod dao;
pub mod memory;
mod row;

pub use dao::EntityDao;
pub use memory::MemoryRowStore;
pub use row::{Cell, FamilyMap, Increment, Row, RowMutation};

use crate::error::MappingResult;

/// Sorted, sparse column-family store.
///
/// # Contract
///
/// - `get`: `None` for a key with no cells.
/// - `put`: upserts every cell of the mutation; other cells are untouched.
/// - `increment`: adds to an 8-byte big-endian counter (absent counts as 0)
///   and returns a row holding the new cell.
/// - `scan_prefix`: rows whose key starts with `prefix`, in key order.
pub trait RowStore: Send + Sync {
    fn get(&self, table: &str, key: &[u8]) -> MappingResult<Option<Row>>;

    fn put(&self, table: &str, mutation: &RowMutation) -> MappingResult<()>;

    fn increment(&self, table: &str, increment: &Increment) -> MappingResult<Row>;

    fn scan_prefix(&self, table: &str, prefix: &[u8]) -> MappingResult<Vec<Row>>;
}
