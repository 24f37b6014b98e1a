// src/config.rs

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Result, WaveError};

/// Options consumed by the waveform core.
///
/// Every field has a default, so a partial JSON file (or `{}`) is valid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WaveConfig {
    pub pixel_ratio: f64,     // device pixels per CSS pixel
    pub min_px_per_sec: f64,  // zoom level
    pub fill_parent: bool,    // stretch short tracks over the whole container
    pub scroll_parent: bool,  // allow horizontal scrolling when zoomed in
    pub split_channels: bool, // one peak series per channel instead of merged
    pub partial_render: bool, // recompute only newly visible ranges
    pub auto_center: bool,    // keep the cursor centred while playing
    pub normalize: bool,      // scale peaks by the loudest column drawn so far
    pub bar_height: f32,
    pub skip_length: f64,   // seconds, for skip forward/backward
    pub recenter_rate: f64, // max scroll step (px) while the cursor is visible
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            min_px_per_sec: 20.0,
            fill_parent: true,
            scroll_parent: false,
            split_channels: false,
            partial_render: false,
            auto_center: true,
            normalize: false,
            bar_height: 1.0,
            skip_length: 2.0,
            recenter_rate: 5.0,
        }
    }
}

impl WaveConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pixel_ratio > 0.0) {
            return Err(WaveError::InvalidConfig(format!(
                "pixel_ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        if !(self.min_px_per_sec > 0.0) {
            return Err(WaveError::InvalidConfig(format!(
                "min_px_per_sec must be positive, got {}",
                self.min_px_per_sec
            )));
        }
        if !(self.bar_height > 0.0) {
            return Err(WaveError::InvalidConfig(format!(
                "bar_height must be positive, got {}",
                self.bar_height
            )));
        }
        if !(self.skip_length >= 0.0) {
            return Err(WaveError::InvalidConfig(format!(
                "skip_length must not be negative, got {}",
                self.skip_length
            )));
        }
        if !(self.recenter_rate > 0.0) {
            return Err(WaveError::InvalidConfig(format!(
                "recenter_rate must be positive, got {}",
                self.recenter_rate
            )));
        }
        Ok(())
    }

    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_from_disk(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
