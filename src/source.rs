// src/source.rs

use crate::error::{Result, invalid};
use crate::waveform::PeakSeries;

/// Read-only view of decoded audio handed to the core by the host.
///
/// A source may carry pre-decoded peaks instead of (or in addition to) raw
/// samples; when it does, extraction is bypassed.
pub trait SampleSource {
    fn channel_count(&self) -> usize;

    /// Samples per channel.
    fn sample_count(&self) -> usize;

    fn channel_data(&self, index: usize) -> &[f32];

    fn duration_secs(&self) -> f64;

    fn precomputed_peaks(&self) -> Option<&PeakSeries> {
        None
    }
}

/// Planar in-memory buffer, the usual result of the host's decoder.
pub struct DecodedBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    peaks: Option<PeakSeries>,
    duration_override: Option<f64>,
}

impl DecodedBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(invalid("sample rate must be at least 1"));
        }
        if channels.is_empty() {
            return Err(invalid("a buffer needs at least one channel"));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(invalid("all channels must hold the same number of samples"));
        }
        Ok(Self {
            sample_rate,
            channels,
            peaks: None,
            duration_override: None,
        })
    }

    /// Split interleaved frames into planar channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(invalid("channel count must be at least 1"));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (c, &s) in frame.iter().enumerate() {
                channels[c].push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Source that only carries pre-decoded peaks (no samples), e.g. while
    /// the real audio is still downloading.
    pub fn from_peaks(peaks: PeakSeries, duration_secs: f64) -> Self {
        let channel_count = peaks.channel_count().max(1);
        Self {
            sample_rate: 1,
            channels: vec![Vec::new(); channel_count],
            peaks: Some(peaks),
            duration_override: Some(duration_secs),
        }
    }

    /// Attach (or with `None`, drop) pre-decoded peaks.
    pub fn set_peaks(&mut self, peaks: Option<PeakSeries>) {
        self.peaks = peaks;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SampleSource for DecodedBuffer {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sample_count(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    fn channel_data(&self, index: usize) -> &[f32] {
        self.channels.get(index).map(|c| c.as_slice()).unwrap_or(&[])
    }

    fn duration_secs(&self) -> f64 {
        self.duration_override
            .unwrap_or(self.sample_count() as f64 / self.sample_rate as f64)
    }

    fn precomputed_peaks(&self) -> Option<&PeakSeries> {
        self.peaks.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_deinterleaves() {
        let buf = DecodedBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2, 3).unwrap();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.sample_count(), 3);
        assert_eq!(buf.channel_data(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buf.channel_data(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buf.duration_secs(), 1.0);
        assert!(buf.channel_data(2).is_empty());
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let res = DecodedBuffer::new(44_100, vec![vec![0.0; 4], vec![0.0; 3]]);
        assert!(res.is_err());
        assert!(DecodedBuffer::new(0, vec![vec![0.0]]).is_err());
        assert!(DecodedBuffer::from_interleaved(&[0.0], 0, 44_100).is_err());
    }

    #[test]
    fn test_peaks_only_source() {
        let src = DecodedBuffer::from_peaks(PeakSeries::Merged(vec![0.5, -0.5]), 12.5);
        assert_eq!(src.duration_secs(), 12.5);
        assert_eq!(src.sample_count(), 0);
        assert!(src.precomputed_peaks().is_some());
    }

    #[test]
    fn test_attached_peaks_keep_sample_duration() {
        let mut buf = DecodedBuffer::new(4, vec![vec![0.0; 8]]).unwrap();
        buf.set_peaks(Some(PeakSeries::Merged(vec![0.5, -0.5])));
        assert_eq!(buf.duration_secs(), 2.0);
        assert_eq!(buf.precomputed_peaks().map(|p| p.columns()), Some(1));
        buf.set_peaks(None);
        assert!(buf.precomputed_peaks().is_none());
    }
}
