// src/renderer.rs

use crate::waveform::PeakSeries;

/// Drawing surface the view paints through. The core never touches pixels
/// itself; everything visual goes through these calls.
///
/// Widths and scroll offsets are CSS pixels unless stated otherwise; peak
/// columns are device pixels.
pub trait Renderer {
    /// Total waveform width in columns. Called on every draw, before any
    /// `draw_peaks`, even when there is nothing new to paint.
    fn set_width(&mut self, total_width: usize);

    /// `peaks` holds columns `start..end` of a waveform `total_width`
    /// columns wide.
    fn draw_peaks(&mut self, peaks: &PeakSeries, total_width: usize, start: usize, end: usize);

    fn clear_wave(&mut self);

    /// Move the progress cursor to `position` CSS pixels.
    fn update_progress(&mut self, position: f64);

    /// Visible width of the container.
    fn client_width(&self) -> f64;

    fn scroll_left(&self) -> f64;

    fn set_scroll_left(&mut self, scroll_left: f64);

    /// Full scrollable width (at least `client_width`).
    fn scroll_width(&self) -> f64;
}
