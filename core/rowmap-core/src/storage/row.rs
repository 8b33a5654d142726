//! Physical row shapes exchanged with the store.

use std::collections::BTreeMap;

/// Qualifier → cell bytes within one family.
pub type FamilyMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// One physical column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }
}

/// A stored row: key plus cells grouped by family, both ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    key: Vec<u8>,
    families: BTreeMap<Vec<u8>, FamilyMap>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    pub fn from_cells(key: impl Into<Vec<u8>>, cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut row = Self::new(key);
        for cell in cells {
            row.insert(cell);
        }
        row
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Add or overwrite one cell.
    pub fn insert(&mut self, cell: Cell) {
        self.families
            .entry(cell.family)
            .or_default()
            .insert(cell.qualifier, cell.value);
    }

    /// Cell value; `None` when absent (distinct from a present empty cell).
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&[u8]> {
        self.families.get(family)?.get(qualifier).map(Vec::as_slice)
    }

    pub fn family(&self, family: &[u8]) -> Option<&FamilyMap> {
        self.families.get(family)
    }

    pub fn families(&self) -> impl Iterator<Item = (&[u8], &FamilyMap)> {
        self.families.iter().map(|(f, m)| (f.as_slice(), m))
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.families.iter().flat_map(|(family, cells)| {
            cells
                .iter()
                .map(move |(q, v)| Cell::new(family.clone(), q.clone(), v.clone()))
        })
    }

    pub fn len(&self) -> usize {
        self.families.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cells to write under one row key. Absent fields contribute no cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMutation {
    key: Vec<u8>,
    cells: Vec<Cell>,
}

impl RowMutation {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            cells: Vec::new(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn extend(&mut self, cells: impl IntoIterator<Item = Cell>) {
        self.cells.extend(cells);
    }

    /// Every cell written under `family` and `qualifier`.
    pub fn get(&self, family: &[u8], qualifier: &[u8]) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter(|c| c.family == family && c.qualifier == qualifier)
            .collect()
    }

    /// Cells of one family, in insertion order.
    pub fn family(&self, family: &[u8]) -> Vec<&Cell> {
        self.cells.iter().filter(|c| c.family == family).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Atomic counter delta against one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    pub key: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::from_cells(
            b"k".to_vec(),
            vec![
                Cell::new("a", "1", vec![1]),
                Cell::new("a", "2", vec![]),
                Cell::new("b", "1", vec![3]),
            ],
        );
        assert_eq!(row.value(b"a", b"1"), Some(&[1u8][..]));
        assert_eq!(row.value(b"a", b"2"), Some(&[][..]));
        assert_eq!(row.value(b"a", b"3"), None);
        assert_eq!(row.family(b"a").map(BTreeMap::len), Some(2));
        assert_eq!(row.len(), 3);
        assert_eq!(row.cells().count(), 3);
    }

    #[test]
    fn test_mutation_filters() {
        let mut m = RowMutation::new(b"k".to_vec());
        m.push(Cell::new("a", "1", vec![1]));
        m.extend([Cell::new("b", "x", vec![2]), Cell::new("b", "y", vec![3])]);
        assert_eq!(m.get(b"a", b"1").len(), 1);
        assert_eq!(m.family(b"b").len(), 2);
        assert!(m.get(b"c", b"1").is_empty());
    }
}
