// src/waveform/mod.rs
pub mod extractor;
pub mod range_cache;
pub mod terminal;
pub mod viewport;

use serde::{Deserialize, Serialize};

pub use extractor::PeakExtractor;
pub use range_cache::{ColumnRange, RangeCache};
pub use viewport::ViewportRange;

/// (max, min) amplitude summary of one visual column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakPair {
    pub max: f32,
    pub min: f32,
}

/// Peaks for a run of columns, stored flat as `max, min, max, min, ...`.
///
/// `Merged` folds every channel into one series (max of maxes, min of mins);
/// `Split` keeps one series per channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeakSeries {
    Merged(Vec<f32>),
    Split(Vec<Vec<f32>>),
}

impl PeakSeries {
    /// Number of columns per channel.
    pub fn columns(&self) -> usize {
        match self {
            PeakSeries::Merged(p) => p.len() / 2,
            PeakSeries::Split(ch) => ch.first().map_or(0, |p| p.len() / 2),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            PeakSeries::Merged(_) => 1,
            PeakSeries::Split(ch) => ch.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns() == 0
    }

    /// Flat interleaved values of one channel (`Merged` has only channel 0).
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        match self {
            PeakSeries::Merged(p) if channel == 0 => Some(p),
            PeakSeries::Merged(_) => None,
            PeakSeries::Split(ch) => ch.get(channel).map(|p| p.as_slice()),
        }
    }

    pub fn pair(&self, channel: usize, column: usize) -> Option<PeakPair> {
        let p = self.channel(channel)?;
        let max = *p.get(2 * column)?;
        let min = *p.get(2 * column + 1)?;
        Some(PeakPair { max, min })
    }

    /// Largest absolute value across all channels; used for normalized drawing.
    pub fn abs_max(&self) -> f32 {
        let fold = |p: &[f32]| p.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        match self {
            PeakSeries::Merged(p) => fold(p),
            PeakSeries::Split(ch) => ch.iter().map(|p| fold(p)).fold(0.0, f32::max),
        }
    }

    /// Stretch or squeeze to `columns` columns. Each output column takes the
    /// max/min of the input columns it covers, so no peak is lost when
    /// shrinking.
    pub fn resample(&self, columns: usize) -> PeakSeries {
        match self {
            PeakSeries::Merged(p) => PeakSeries::Merged(resample_flat(p, columns)),
            PeakSeries::Split(ch) => {
                PeakSeries::Split(ch.iter().map(|p| resample_flat(p, columns)).collect())
            }
        }
    }
}

fn resample_flat(peaks: &[f32], columns: usize) -> Vec<f32> {
    let n = peaks.len() / 2;
    let mut out = vec![0.0; 2 * columns];
    if n == 0 {
        return out;
    }
    for t in 0..columns {
        let from = t * n / columns;
        let to = ((t + 1) * n / columns).max(from + 1).min(n);
        let mut max = 0.0f32;
        let mut min = 0.0f32;
        for c in from..to {
            max = max.max(peaks[2 * c]);
            min = min.min(peaks[2 * c + 1]);
        }
        out[2 * t] = max;
        out[2 * t + 1] = min;
    }
    out
}
