//! Piecewise-constant calibration table keyed by range.
//!
//! A lookup returns the value of the greatest key not above the query
//! (floor lookup) and clamps to the first/last value outside the table.
//! There is no interpolation between entries.

use crate::error::TableError;

#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    keys: Vec<f64>,
    values: Vec<f64>,
}

impl RangeTable {
    /// Build a table from `(range_m, value)` pairs.
    ///
    /// Entries must be non-empty, finite and strictly increasing by range.
    /// They are not sorted for the caller: out-of-order input is rejected.
    pub fn new<I>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (index, (k, v)) in entries.into_iter().enumerate() {
            if !k.is_finite() || !v.is_finite() {
                return Err(TableError::NonFinite { index });
            }
            if keys.last().is_some_and(|&prev| k <= prev) {
                return Err(TableError::NotIncreasing { index });
            }
            keys.push(k);
            values.push(v);
        }
        if keys.is_empty() {
            return Err(TableError::Empty);
        }
        Ok(Self { keys, values })
    }

    /// Floor lookup with clamping at both ends.
    ///
    /// A NaN query yields the first value.
    pub fn lookup(&self, range_m: f64) -> f64 {
        if range_m.is_nan() {
            tracing::warn!("NaN range passed to table lookup; using first entry");
            return self.values[0];
        }
        // Number of keys <= range_m; zero means below the first key.
        let idx = self.keys.partition_point(|&k| k <= range_m);
        self.values[idx.saturating_sub(1)]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; construction rejects empty tables.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first_key(&self) -> f64 {
        self.keys[0]
    }

    pub fn last_key(&self) -> f64 {
        self.keys[self.keys.len() - 1]
    }

    pub fn entries(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.keys.iter().copied().zip(self.values.iter().copied())
    }
}

impl TryFrom<Vec<(f64, f64)>> for RangeTable {
    type Error = TableError;

    fn try_from(v: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl TryFrom<&[shooter_config::TableRow]> for RangeTable {
    type Error = TableError;

    fn try_from(rows: &[shooter_config::TableRow]) -> Result<Self, Self::Error> {
        Self::new(rows.iter().map(|r| (r.range_m, r.value)))
    }
}
