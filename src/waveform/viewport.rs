// src/waveform/viewport.rs

use serde::Serialize;

/// Total column count at the current zoom plus the visible window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ViewportRange {
    pub width: usize,
    pub start: usize,
    pub end: usize,
}

/// Container width in device pixels.
pub fn device_width(client_width: f64, pixel_ratio: f64) -> usize {
    (client_width * pixel_ratio).round().max(0.0) as usize
}

/// Derive the column count and the visible `[start, end)` from the current
/// zoom and scroll state. Pure; call it on every draw.
///
/// `container_width` is in device pixels, `scroll_offset` in CSS pixels.
pub fn compute_width_and_range(
    duration_secs: f64,
    px_per_sec: f64,
    pixel_ratio: f64,
    container_width: usize,
    scroll_offset: f64,
    fill_parent: bool,
    scroll_parent: bool,
) -> ViewportRange {
    let nominal = (duration_secs * px_per_sec * pixel_ratio).round().max(0.0) as usize;

    if fill_parent && (!scroll_parent || nominal < container_width) {
        return ViewportRange {
            width: container_width,
            start: 0,
            end: container_width,
        };
    }

    // Never scroll past the last full window.
    let max_start = nominal.saturating_sub(container_width);
    let start = ((scroll_offset * pixel_ratio).round().max(0.0) as usize).min(max_start);
    let end = (start + container_width).min(nominal);
    ViewportRange { width: nominal, start, end }
}

/// Effective zoom of a computed viewport, in CSS pixels per second.
pub fn px_per_sec(viewport: &ViewportRange, duration_secs: f64, pixel_ratio: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    viewport.width as f64 / (duration_secs * pixel_ratio)
}

/// Geometry of the scrollable wrapper, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollGeometry {
    pub scroll_left: f64,
    pub client_width: f64,
    pub scroll_width: f64,
}

/// Convert a pointer x-coordinate (relative to the wrapper's left edge) into
/// playback progress in `0..=1`.
///
/// `drawn_width` is the painted width in device pixels. A 100 px element is
/// clickable at 0..=99, so both widths lose one pixel before dividing.
pub fn pointer_progress(
    x: f64,
    geometry: &ScrollGeometry,
    drawn_width: usize,
    container_width: usize,
    pixel_ratio: f64,
    fill_parent: bool,
) -> f64 {
    let visible_width = drawn_width as f64 - 1.0;
    let scroll_container_width = container_width as f64 - 1.0;

    let (numerator, denominator) = if !fill_parent && visible_width < scroll_container_width {
        (x, visible_width / pixel_ratio)
    } else {
        (x + geometry.scroll_left, geometry.scroll_width)
    };

    if numerator > denominator {
        return 1.0;
    }
    let progress = numerator / denominator;
    if progress.is_finite() { progress.max(0.0) } else { 0.0 }
}

/// New scroll offset that brings `position` (CSS px) towards the middle of
/// the wrapper, or `None` when nothing should move.
///
/// Unless `immediate`, a cursor that is already visible only drifts by at
/// most `rate` pixels per call.
pub fn recenter_target(position: f64, geometry: &ScrollGeometry, immediate: bool, rate: f64) -> Option<f64> {
    let scroll_left = geometry.scroll_left;
    let half = (geometry.client_width / 2.0).trunc();
    let max_scroll = geometry.scroll_width - geometry.client_width;
    if max_scroll <= 0.0 {
        return None;
    }

    let mut target = position - half;
    let offset = target - scroll_left;
    if !immediate && -half <= offset && offset < half {
        target = scroll_left + offset.clamp(-rate, rate);
    }

    let target = target.clamp(0.0, max_scroll);
    if target != scroll_left { Some(target) } else { None }
}
