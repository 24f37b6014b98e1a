// src/export.rs

use crate::error::{Result, invalid};
use crate::waveform::PeakSeries;

pub const DEFAULT_ACCURACY: f64 = 10_000.0;

fn round_to(value: f32, accuracy: f64) -> f64 {
    (value as f64 * accuracy).round() / accuracy
}

/// Serialize peaks as JSON, each value rounded to `1 / accuracy`.
///
/// Merged peaks become a flat array, split peaks an array per channel. The
/// output loads back through [`import_peaks_json`].
pub fn export_peaks_json(series: &PeakSeries, accuracy: f64) -> Result<String> {
    if !(accuracy > 0.0) || !accuracy.is_finite() {
        return Err(invalid(format!("accuracy must be positive, got {}", accuracy)));
    }
    let round = |p: &[f32]| -> Vec<f64> { p.iter().map(|&v| round_to(v, accuracy)).collect() };
    let json = match series {
        PeakSeries::Merged(p) => serde_json::to_string(&round(p))?,
        PeakSeries::Split(ch) => {
            let rounded: Vec<Vec<f64>> = ch.iter().map(|p| round(p)).collect();
            serde_json::to_string(&rounded)?
        }
    };
    log::debug!(
        "exported {} column(s) x {} channel(s)",
        series.columns(),
        series.channel_count()
    );
    Ok(json)
}

/// Parse peaks written by [`export_peaks_json`] (or any flat / nested JSON
/// number array). Odd-length series and ragged channels are rejected.
pub fn import_peaks_json(json: &str) -> Result<PeakSeries> {
    let series: PeakSeries = serde_json::from_str(json)?;
    match &series {
        PeakSeries::Merged(p) if p.len() % 2 != 0 => {
            return Err(invalid(format!("peak array has odd length {}", p.len())));
        }
        PeakSeries::Split(ch) => {
            let len = ch.first().map_or(0, Vec::len);
            if len % 2 != 0 || ch.iter().any(|p| p.len() != len) {
                return Err(invalid("channel peak arrays must share one even length"));
            }
        }
        _ => {}
    }
    Ok(series)
}
