use std::collections::VecDeque;

use crate::value::Row;

pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// Most recent rows of the active table, oldest evicted first.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    rows: VecDeque<Row>,
    capacity: usize,
}

impl Default for RowBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ROW_LIMIT)
    }
}

impl RowBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends `row`, returning how many rows were evicted to make room.
    pub fn push(&mut self, row: Row) -> usize {
        self.rows.push_back(row);
        self.trim()
    }

    /// Replaces the contents with `rows`, keeping only the newest.
    pub fn replace<I: IntoIterator<Item = Row>>(&mut self, rows: I) -> usize {
        self.rows.clear();
        self.rows.extend(rows);
        self.trim()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&mut self) -> &[Row] {
        self.rows.make_contiguous()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Row> + ExactSizeIterator {
        self.rows.iter()
    }

    /// The newest `count` rows, oldest first.
    pub fn latest(&self, count: usize) -> Vec<Row> {
        let skip = self.rows.len().saturating_sub(count);
        self.rows.iter().skip(skip).cloned().collect()
    }

    fn trim(&mut self) -> usize {
        let overflow = self.rows.len().saturating_sub(self.capacity);
        self.rows.drain(..overflow);
        overflow
    }
}
