// src/playback.rs

use std::time::Duration;

/// Playback side of the view: whatever actually plays the audio.
pub trait Transport {
    fn duration_secs(&self) -> f64;

    fn current_time_secs(&self) -> f64;

    /// Position as a 0..1 ratio of the duration.
    fn played_percents(&self) -> f64 {
        let duration = self.duration_secs();
        if duration > 0.0 {
            (self.current_time_secs() / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn is_paused(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Absolute seek in seconds.
    fn seek_to(&mut self, secs: f64);

    /// Prepare for a newly loaded track: stopped, at the start.
    fn load(&mut self, duration_secs: f64);
}

/// Transport driven by an external clock: time only moves when `advance` is
/// called. Used by the terminal viewer and in tests.
pub struct ClockTransport {
    total_duration: Duration,
    position: Duration,
    is_playing: bool,
    finished: bool,
}

impl ClockTransport {
    pub fn new(total_duration: Duration) -> Self {
        Self {
            total_duration,
            position: Duration::ZERO,
            is_playing: false,
            finished: false,
        }
    }

    pub fn set_total_duration(&mut self, total: Duration) {
        self.total_duration = total;
        self.position = self.position.min(total);
        self.finished = false;
    }

    pub fn get_total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn get_current_time(&self) -> Duration {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move the clock forward by `elapsed` wall time. Stops at the end.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.is_playing {
            return;
        }
        let next = self.position + elapsed;
        if next >= self.total_duration {
            self.position = self.total_duration;
            self.is_playing = false;
            self.finished = true;
            log::debug!("playback finished at {:?}", self.total_duration);
        } else {
            self.position = next;
        }
    }
}

impl Transport for ClockTransport {
    fn duration_secs(&self) -> f64 {
        self.total_duration.as_secs_f64()
    }

    fn current_time_secs(&self) -> f64 {
        self.position.as_secs_f64()
    }

    fn played_percents(&self) -> f64 {
        if self.finished {
            return 1.0;
        }
        let duration = self.duration_secs();
        if duration > 0.0 { self.current_time_secs() / duration } else { 0.0 }
    }

    fn is_paused(&self) -> bool {
        !self.is_playing
    }

    fn play(&mut self) {
        if self.finished || self.position >= self.total_duration {
            self.position = Duration::ZERO;
            self.finished = false;
        }
        self.is_playing = !self.total_duration.is_zero();
    }

    fn pause(&mut self) {
        self.is_playing = false;
    }

    fn seek_to(&mut self, secs: f64) {
        if secs.is_nan() {
            return;
        }
        let secs = secs.clamp(0.0, self.duration_secs());
        self.position = Duration::from_secs_f64(secs);
        self.finished = false;
    }

    fn load(&mut self, duration_secs: f64) {
        let secs = if duration_secs.is_finite() { duration_secs.max(0.0) } else { 0.0 };
        self.set_total_duration(Duration::from_secs_f64(secs));
        self.position = Duration::ZERO;
        self.is_playing = false;
    }
}

/// Maps playback progress to cursor pixels and remembers a seek requested
/// before the audio was ready.
#[derive(Debug)]
pub struct PlaybackPositionModel {
    pixel_ratio: f64,
    last_pos: f64,
    pending: Option<f64>,
}

impl PlaybackPositionModel {
    pub fn new(pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio,
            last_pos: 0.0,
            pending: None,
        }
    }

    /// Cursor position in CSS pixels for `progress` over `total_width`
    /// device-pixel columns, snapped up to whole device pixels.
    pub fn progress_to_pixel(&self, progress: f64, total_width: usize) -> f64 {
        (progress * total_width as f64).ceil() / self.pixel_ratio
    }

    /// New cursor position if it is worth redrawing: moved forward by at
    /// least one device pixel, or moved backward at all.
    pub fn update(&mut self, progress: f64, total_width: usize) -> Option<f64> {
        let min_px_delta = 1.0 / self.pixel_ratio;
        let pos = self.progress_to_pixel(progress, total_width);
        if pos < self.last_pos || pos - self.last_pos >= min_px_delta {
            self.last_pos = pos;
            Some(pos)
        } else {
            None
        }
    }

    /// Forget the last propagated position so the next update always lands.
    pub fn invalidate(&mut self) {
        self.last_pos = f64::NEG_INFINITY;
    }

    pub fn last_position(&self) -> f64 {
        self.last_pos
    }

    /// Store a seek to perform once playback is ready. Later calls overwrite.
    pub fn seek(&mut self, progress: f64) {
        self.pending = Some(progress.clamp(0.0, 1.0));
    }

    pub fn pending_progress(&self) -> f64 {
        self.pending.unwrap_or(0.0)
    }

    /// Consume the pending seek. Returns `None` on every call after the first.
    pub fn take_pending(&mut self) -> Option<f64> {
        self.pending.take()
    }

    /// Progress to display: before playback has moved, a pending seek wins.
    pub fn effective_progress(&self, played: f64) -> f64 {
        match self.pending {
            Some(p) if played == 0.0 && p != 0.0 => p,
            _ => played,
        }
    }

    pub fn reset(&mut self) {
        self.last_pos = 0.0;
        self.pending = None;
    }
}
