// src/waveform/extractor.rs

use crate::error::{Result, invalid};
use crate::source::SampleSource;
use crate::waveform::PeakSeries;

/// Only every n-th sample of a column window is inspected, with
/// n = samples per column / `STRIDE_DIVISOR`.
pub const STRIDE_DIVISOR: f64 = 10.0;

/// Min/max downsampler that keeps the columns it has computed for the
/// current column count.
///
/// The arrays are indexed by column, so they only make sense for one
/// `total_columns`; asking for a different total discards them.
pub struct PeakExtractor {
    split_channels: bool,
    total_columns: usize,
    split_peaks: Vec<Vec<f32>>,
    merged_peaks: Vec<f32>,
}

impl PeakExtractor {
    pub fn new(split_channels: bool) -> Self {
        Self {
            split_channels,
            total_columns: 0,
            split_peaks: Vec::new(),
            merged_peaks: Vec::new(),
        }
    }

    pub fn split_channels(&self) -> bool {
        self.split_channels
    }

    pub fn set_split_channels(&mut self, split: bool) {
        self.split_channels = split;
    }

    /// Column count the cached arrays belong to (0 when empty).
    pub fn total_columns(&self) -> usize {
        self.total_columns
    }

    pub fn reset(&mut self) {
        self.total_columns = 0;
        self.split_peaks.clear();
        self.merged_peaks.clear();
    }

    /// Size the column arrays for `total_columns`. Returns true when the
    /// previous arrays were thrown away.
    fn resize(&mut self, total_columns: usize, channels: usize) -> bool {
        if self.total_columns == total_columns && self.split_peaks.len() == channels {
            return false;
        }
        log::debug!(
            "peak arrays resized: {} -> {} columns, {} channel(s)",
            self.total_columns,
            total_columns,
            channels
        );
        self.total_columns = total_columns;
        self.split_peaks = vec![vec![0.0; 2 * total_columns]; channels];
        self.merged_peaks = vec![0.0; 2 * total_columns];
        true
    }

    /// Peaks for columns `first_column..=last_column` out of `total_columns`
    /// spanning the whole track.
    ///
    /// Returns `2 * (last - first + 1)` values per channel, or the source's
    /// pre-decoded peaks untouched when it carries them.
    pub fn compute_peaks(
        &mut self,
        source: &dyn SampleSource,
        total_columns: usize,
        first_column: usize,
        last_column: usize,
    ) -> Result<PeakSeries> {
        if total_columns < 1 {
            return Err(invalid("total_columns must be at least 1"));
        }
        if first_column > last_column || last_column >= total_columns {
            return Err(invalid(format!(
                "column range {}..={} outside 0..{}",
                first_column, last_column, total_columns
            )));
        }

        if let Some(peaks) = source.precomputed_peaks() {
            return Ok(peaks.clone());
        }

        let channels = source.channel_count();
        self.resize(total_columns, channels);

        let n = source.sample_count();
        let sample_size = n as f64 / total_columns as f64;
        let step = ((sample_size / STRIDE_DIVISOR).floor() as usize).max(1);

        for i in first_column..=last_column {
            let start = (i as f64 * sample_size).floor() as usize;
            let end = (((i + 1) as f64 * sample_size).floor() as usize).min(n);

            let mut merged_max = 0.0f32;
            let mut merged_min = 0.0f32;
            for c in 0..channels {
                let data = source.channel_data(c);
                let (max, min) = scan_window(data, start, end.min(data.len()), step);
                self.split_peaks[c][2 * i] = max;
                self.split_peaks[c][2 * i + 1] = min;
                if max > merged_max {
                    merged_max = max;
                }
                if min < merged_min {
                    merged_min = min;
                }
            }
            self.merged_peaks[2 * i] = merged_max;
            self.merged_peaks[2 * i + 1] = merged_min;
        }

        let span = 2 * first_column..2 * (last_column + 1);
        Ok(if self.split_channels {
            PeakSeries::Split(self.split_peaks.iter().map(|p| p[span.clone()].to_vec()).collect())
        } else {
            PeakSeries::Merged(self.merged_peaks[span].to_vec())
        })
    }

    /// Whole-track arrays for the current column count, including columns
    /// not computed yet (left at zero).
    pub fn cached_series(&self) -> PeakSeries {
        if self.split_channels {
            PeakSeries::Split(self.split_peaks.clone())
        } else {
            PeakSeries::Merged(self.merged_peaks.clone())
        }
    }
}

// Running max/min both start at 0, so an empty window is (0, 0) and the
// result always straddles zero.
fn scan_window(data: &[f32], start: usize, end: usize, step: usize) -> (f32, f32) {
    let mut max = 0.0f32;
    let mut min = 0.0f32;
    if start < end {
        for &value in data[start..end].iter().step_by(step) {
            if value > max {
                max = value;
            }
            if value < min {
                min = value;
            }
        }
    }
    (max, min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveError;
    use crate::source::DecodedBuffer;
    use crate::waveform::PeakPair;

    fn mono(samples: Vec<f32>) -> DecodedBuffer {
        DecodedBuffer::new(100, vec![samples]).unwrap()
    }

    fn sine(len: usize, period: usize, gain: f32) -> Vec<f32> {
        (0..len)
            .map(|i| gain * (i as f32 * std::f32::consts::TAU / period as f32).sin())
            .collect()
    }

    #[test]
    fn test_exact_pairs_small_window() {
        let src = mono(vec![0.5, -0.25, 1.0, -1.0]);
        let mut ex = PeakExtractor::new(false);
        let peaks = ex.compute_peaks(&src, 2, 0, 1).unwrap();
        assert_eq!(peaks, PeakSeries::Merged(vec![0.5, -0.25, 1.0, -1.0]));
    }

    #[test]
    fn test_all_zero_buffer_gives_zero_pairs() {
        let src = DecodedBuffer::new(100, vec![vec![0.0; 1000], vec![0.0; 1000]]).unwrap();
        let mut ex = PeakExtractor::new(true);
        let peaks = ex.compute_peaks(&src, 50, 0, 49).unwrap();
        for c in 0..2 {
            for col in 0..50 {
                assert_eq!(peaks.pair(c, col), Some(PeakPair { max: 0.0, min: 0.0 }));
            }
        }
    }

    #[test]
    fn test_output_length_matches_requested_span() {
        let src = DecodedBuffer::new(100, vec![sine(1000, 37, 0.8), sine(1000, 11, 0.4)]).unwrap();
        let mut ex = PeakExtractor::new(true);
        let peaks = ex.compute_peaks(&src, 100, 10, 19).unwrap();
        match peaks {
            PeakSeries::Split(ch) => {
                assert_eq!(ch.len(), 2);
                assert!(ch.iter().all(|p| p.len() == 20));
            }
            PeakSeries::Merged(_) => panic!("expected split series"),
        }

        ex.set_split_channels(false);
        let merged = ex.compute_peaks(&src, 100, 0, 0).unwrap();
        assert_eq!(merged.channel(0).map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_peaks_straddle_zero_and_are_deterministic() {
        let samples: Vec<f32> = (0..5000).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();
        let offset: Vec<f32> = samples.iter().map(|s| (s + 1.0) / 2.0).collect();
        let src = DecodedBuffer::new(1000, vec![samples, offset]).unwrap();

        let mut a = PeakExtractor::new(true);
        let mut b = PeakExtractor::new(true);
        let pa = a.compute_peaks(&src, 333, 0, 332).unwrap();
        let pb = b.compute_peaks(&src, 333, 0, 332).unwrap();
        assert_eq!(pa, pb);

        for c in 0..2 {
            for col in 0..333 {
                let p = pa.pair(c, col).unwrap();
                assert!(p.min <= 0.0 && 0.0 <= p.max, "column {col}: {p:?}");
            }
        }
    }

    #[test]
    fn test_merged_is_max_of_maxes_min_of_mins() {
        let src = DecodedBuffer::new(100, vec![vec![0.2, -0.9, 0.1, 0.0], vec![0.7, -0.1, 0.0, -0.3]]).unwrap();
        let mut ex = PeakExtractor::new(false);
        let merged = ex.compute_peaks(&src, 2, 0, 1).unwrap();
        assert_eq!(merged.pair(0, 0), Some(PeakPair { max: 0.7, min: -0.9 }));
        assert_eq!(merged.pair(0, 1), Some(PeakPair { max: 0.1, min: -0.3 }));
    }

    #[test]
    fn test_stride_skips_samples_between_steps() {
        // 100 samples in one column -> stride 10, so only indices 0, 10, 20... are read.
        let mut samples = vec![0.0; 100];
        samples[5] = 0.9;
        samples[20] = 0.4;
        samples[33] = -0.8;
        samples[70] = -0.2;
        let src = mono(samples);
        let mut ex = PeakExtractor::new(false);
        let peaks = ex.compute_peaks(&src, 1, 0, 0).unwrap();
        assert_eq!(peaks.pair(0, 0), Some(PeakPair { max: 0.4, min: -0.2 }));
    }

    #[test]
    fn test_columns_past_track_end_are_neutral() {
        // 3 samples over 10 columns: several columns have empty windows.
        let src = mono(vec![0.6, -0.6, 0.3]);
        let mut ex = PeakExtractor::new(false);
        let peaks = ex.compute_peaks(&src, 10, 0, 9).unwrap();
        assert_eq!(peaks.pair(0, 0), Some(PeakPair { max: 0.0, min: 0.0 }));
        assert_eq!(peaks.pair(0, 3), Some(PeakPair { max: 0.6, min: 0.0 }));
        assert_eq!(peaks.columns(), 10);
    }

    #[test]
    fn test_values_are_not_clamped() {
        let src = mono(vec![3.0, -2.5]);
        let mut ex = PeakExtractor::new(false);
        let peaks = ex.compute_peaks(&src, 1, 0, 0).unwrap();
        assert_eq!(peaks.pair(0, 0), Some(PeakPair { max: 3.0, min: -2.5 }));
    }

    #[test]
    fn test_passthrough_returns_supplied_peaks() {
        let supplied = PeakSeries::Merged(vec![0.9, -0.9, 0.1, -0.1, 0.5, -0.5]);
        let src = DecodedBuffer::from_peaks(supplied.clone(), 3.0);
        let mut ex = PeakExtractor::new(false);
        assert_eq!(ex.compute_peaks(&src, 3, 0, 2).unwrap(), supplied);
        assert_eq!(ex.total_columns(), 0);
    }

    #[test]
    fn test_invalid_arguments_fail_fast() {
        let src = mono(vec![0.1; 10]);
        let mut ex = PeakExtractor::new(false);
        assert!(matches!(ex.compute_peaks(&src, 0, 0, 0), Err(WaveError::InvalidArgument(_))));
        assert!(matches!(ex.compute_peaks(&src, 5, 3, 2), Err(WaveError::InvalidArgument(_))));
        assert!(matches!(ex.compute_peaks(&src, 5, 0, 5), Err(WaveError::InvalidArgument(_))));
    }

    #[test]
    fn test_changing_total_discards_cached_columns() {
        let src = mono(sine(1000, 50, 0.5));
        let mut ex = PeakExtractor::new(false);
        ex.compute_peaks(&src, 10, 0, 9).unwrap();
        assert!(ex.cached_series().abs_max() > 0.0);

        ex.compute_peaks(&src, 20, 0, 0).unwrap();
        assert_eq!(ex.total_columns(), 20);
        let cached = ex.cached_series();
        assert_eq!(cached.columns(), 20);
        // Only column 0 was computed under the new total.
        assert!((1..20).all(|c| cached.pair(0, c) == Some(PeakPair::default())));
    }

    #[test]
    fn test_same_total_keeps_earlier_columns() {
        let src = mono(sine(1000, 50, 0.5));
        let mut ex = PeakExtractor::new(false);
        ex.compute_peaks(&src, 10, 0, 4).unwrap();
        let first_half = ex.cached_series().pair(0, 2);
        ex.compute_peaks(&src, 10, 5, 9).unwrap();
        assert_eq!(ex.cached_series().pair(0, 2), first_half);
        assert_ne!(first_half, Some(PeakPair::default()));
    }
}
