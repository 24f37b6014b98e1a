// src/waveform/range_cache.rs

use serde::Serialize;

use crate::error::{Result, invalid};

/// Half-open column interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(invalid(format!("range start {} is after end {}", start, end)));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Tracks which column ranges have already been computed for one column
/// count, so a scroll or zoom only asks for the columns it has not seen.
///
/// State is a flat, sorted list of boundaries: even positions open a range,
/// odd positions close it. Touching ranges are always fused, so no two
/// neighbouring boundaries are equal.
#[derive(Debug, Default)]
pub struct RangeCache {
    boundaries: Vec<usize>,
    total_columns: Option<usize>,
}

impl RangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.boundaries.clear();
        self.total_columns = None;
    }

    /// Column count the cached ranges belong to.
    pub fn total_columns(&self) -> Option<usize> {
        self.total_columns
    }

    /// Record `[start, end)` as computed and return the parts of it that were
    /// not cached before. The caller must fill exactly those.
    pub fn add_range(&mut self, total_columns: usize, start: usize, end: usize) -> Result<Vec<ColumnRange>> {
        if start > end {
            return Err(invalid(format!("range start {} is after end {}", start, end)));
        }
        if self.total_columns != Some(total_columns) {
            if self.total_columns.is_some() {
                log::debug!(
                    "range cache reset: {:?} -> {} columns",
                    self.total_columns,
                    total_columns
                );
            }
            self.reset();
            self.total_columns = Some(total_columns);
        }

        let b = &self.boundaries;
        let mut uncached = Vec::new();

        // Skip boundaries before the request.
        let mut i = b.partition_point(|&x| x < start);
        // Even index: `start` sits in a gap, so the uncached region opens there.
        // Odd index: `start` is inside a cached range; the gap opens at b[i].
        if i % 2 == 0 {
            uncached.push(start);
        }
        while i < b.len() && b[i] <= end {
            uncached.push(b[i]);
            i += 1;
        }
        // Even index: `end` is past every range we walked over.
        if i % 2 == 0 {
            uncached.push(end);
        }

        let uncached = drop_touching(uncached);

        let mut merged = Vec::with_capacity(self.boundaries.len() + uncached.len());
        merged.extend_from_slice(&self.boundaries);
        merged.extend_from_slice(&uncached);
        merged.sort_unstable();
        self.boundaries = drop_touching(merged);

        Ok(uncached
            .chunks_exact(2)
            .map(|pair| ColumnRange { start: pair[0], end: pair[1] })
            .collect())
    }

    /// Cached ranges, ascending and coalesced.
    pub fn current_ranges(&self) -> Vec<ColumnRange> {
        self.boundaries
            .chunks_exact(2)
            .map(|pair| ColumnRange { start: pair[0], end: pair[1] })
            .collect()
    }

    pub fn is_cached(&self, column: usize) -> bool {
        let i = self.boundaries.partition_point(|&x| x <= column);
        i % 2 == 1
    }
}

/// Remove every boundary equal to one of its neighbours. A repeated value is
/// either a zero-length range or the seam between two touching ranges; in
/// both cases the pair disappears.
fn drop_touching(sorted: Vec<usize>) -> Vec<usize> {
    let n = sorted.len();
    (0..n)
        .filter(|&pos| {
            let prev_eq = pos > 0 && sorted[pos - 1] == sorted[pos];
            let next_eq = pos + 1 < n && sorted[pos + 1] == sorted[pos];
            !prev_eq && !next_eq
        })
        .map(|pos| sorted[pos])
        .collect()
}
