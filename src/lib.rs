// src/lib.rs

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod playback;
pub mod renderer;
pub mod source;
pub mod view;
pub mod waveform;

pub use config::WaveConfig;
pub use error::{Result, WaveError};
pub use playback::{ClockTransport, PlaybackPositionModel, Transport};
pub use renderer::Renderer;
pub use source::{DecodedBuffer, SampleSource};
pub use view::{LoadToken, WaveformView};
pub use waveform::{ColumnRange, PeakExtractor, PeakPair, PeakSeries, RangeCache, ViewportRange};
