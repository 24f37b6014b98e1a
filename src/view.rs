// src/view.rs

use crate::config::WaveConfig;
use crate::error::{Result, WaveError, invalid};
use crate::export::export_peaks_json;
use crate::playback::{PlaybackPositionModel, Transport};
use crate::renderer::Renderer;
use crate::source::SampleSource;
use crate::waveform::viewport::{
    self, ScrollGeometry, ViewportRange, compute_width_and_range, device_width,
};
use crate::waveform::{PeakExtractor, RangeCache};

/// Identifies one `begin_load` call. Results carrying an older token are
/// dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadToken(u64);

/// Ties a sample source, a renderer and a transport together: works out
/// which columns are needed, extracts only those, and keeps the cursor and
/// scroll position in step with playback.
///
/// Every entry point takes `&mut self`, so draws are serialized by
/// construction.
pub struct WaveformView<R: Renderer, T: Transport> {
    config: WaveConfig,
    renderer: R,
    transport: T,
    source: Option<Box<dyn SampleSource>>,
    extractor: PeakExtractor,
    peak_cache: Option<RangeCache>,
    position: PlaybackPositionModel,
    drawn_width: usize,
    ready: bool,
    play_on_ready: bool,
    load_generation: u64,
}

impl<R: Renderer, T: Transport> WaveformView<R, T> {
    pub fn new(config: WaveConfig, renderer: R, transport: T) -> Result<Self> {
        config.validate()?;
        let peak_cache = config.partial_render.then(RangeCache::new);
        Ok(Self {
            extractor: PeakExtractor::new(config.split_channels),
            position: PlaybackPositionModel::new(config.pixel_ratio),
            config,
            renderer,
            transport,
            source: None,
            peak_cache,
            drawn_width: 0,
            ready: false,
            play_on_ready: false,
            load_generation: 0,
        })
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn peak_cache(&self) -> Option<&RangeCache> {
        self.peak_cache.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Width in columns of the last draw.
    pub fn drawn_width(&self) -> usize {
        self.drawn_width
    }

    pub fn duration_secs(&self) -> f64 {
        match &self.source {
            Some(source) => source.duration_secs(),
            None => self.transport.duration_secs(),
        }
    }

    // --- Loading ---

    /// Start a new load: clears the view and invalidates any load still in
    /// flight.
    pub fn begin_load(&mut self) -> LoadToken {
        self.empty();
        self.position.reset();
        self.play_on_ready = false;
        self.load_generation += 1;
        LoadToken(self.load_generation)
    }

    /// Install a decoded source. Returns `Ok(false)` without touching
    /// anything when `token` was superseded by a newer `begin_load`.
    pub fn finish_load(&mut self, token: LoadToken, source: Box<dyn SampleSource>) -> Result<bool> {
        if token.0 != self.load_generation {
            log::debug!(
                "ignoring stale load #{} (current #{})",
                token.0,
                self.load_generation
            );
            return Ok(false);
        }

        log::info!(
            "loaded {} channel(s), {} samples, {:.2}s",
            source.channel_count(),
            source.sample_count(),
            source.duration_secs()
        );
        self.transport.load(source.duration_secs());
        self.source = Some(source);
        self.extractor.reset();
        if let Some(cache) = self.peak_cache.as_mut() {
            cache.reset();
        }
        self.renderer.update_progress(0.0);
        self.draw_buffer()?;
        self.fire_ready()?;
        Ok(true)
    }

    pub fn load(&mut self, source: Box<dyn SampleSource>) -> Result<bool> {
        let token = self.begin_load();
        self.finish_load(token, source)
    }

    fn fire_ready(&mut self) -> Result<()> {
        self.ready = true;
        if let Some(progress) = self.position.take_pending() {
            log::debug!("applying deferred seek to {:.3}", progress);
            self.seek_to(progress)?;
        }
        if std::mem::take(&mut self.play_on_ready) {
            self.transport.play();
        }
        Ok(())
    }

    /// Clear the waveform and stop playback. The next draw starts from
    /// scratch.
    pub fn empty(&mut self) {
        if !self.transport.is_paused() {
            self.transport.pause();
        }
        self.source = None;
        self.ready = false;
        self.extractor.reset();
        if let Some(cache) = self.peak_cache.as_mut() {
            cache.reset();
        }
        self.drawn_width = 0;
        self.position.invalidate();
        if let Some(pos) = self.position.update(0.0, 0) {
            self.renderer.update_progress(pos);
        }
        self.renderer.clear_wave();
    }

    // --- Drawing ---

    pub fn compute_viewport(&self) -> ViewportRange {
        let container = device_width(self.renderer.client_width(), self.config.pixel_ratio);
        compute_width_and_range(
            self.duration_secs(),
            self.config.min_px_per_sec,
            self.config.pixel_ratio,
            container,
            self.renderer.scroll_left(),
            self.config.fill_parent,
            self.config.scroll_parent,
        )
    }

    /// Extract and paint whatever the current viewport needs. With
    /// `partial_render` only columns never painted at this width are
    /// extracted; otherwise the whole track is redone.
    pub fn draw_buffer(&mut self) -> Result<()> {
        let vp = self.compute_viewport();
        let source = self.source.as_deref().ok_or(WaveError::NoSource)?;
        // The renderer must follow width changes even when no range is new.
        self.renderer.set_width(vp.width);
        self.drawn_width = vp.width;
        if vp.width == 0 {
            log::warn!("nothing to draw: computed width is 0");
            self.renderer.clear_wave();
            return Ok(());
        }

        let supplied_columns = source.precomputed_peaks().map(|p| p.columns());
        match (self.peak_cache.as_mut(), supplied_columns) {
            // Supplied peaks are complete already; there is nothing to save by
            // going range by range.
            (Some(cache), None) => {
                let new_ranges = cache.add_range(vp.width, vp.start, vp.end)?;
                log::debug!(
                    "partial draw {}..{} of {}: {} new range(s)",
                    vp.start,
                    vp.end,
                    vp.width,
                    new_ranges.len()
                );
                for range in new_ranges {
                    debug_assert!(!range.is_empty(), "range cache returned {:?}", range);
                    let peaks = self
                        .extractor
                        .compute_peaks(source, vp.width, range.start, range.end - 1)?;
                    self.renderer.draw_peaks(&peaks, vp.width, range.start, range.end);
                }
            }
            (_, supplied) => {
                let columns = supplied.unwrap_or(vp.width);
                if columns == 0 {
                    self.renderer.clear_wave();
                    return Ok(());
                }
                let mut peaks = self.extractor.compute_peaks(source, columns, 0, columns - 1)?;
                if columns != vp.width {
                    peaks = peaks.resample(vp.width);
                }
                self.renderer.draw_peaks(&peaks, vp.width, 0, vp.width);
            }
        }
        Ok(())
    }

    /// Redraw after the container changed size, then put the cursor back.
    pub fn redraw(&mut self) -> Result<()> {
        self.draw_buffer()?;
        self.position.invalidate();
        let played = self.transport.played_percents();
        self.progress(played)
    }

    pub fn on_scroll(&mut self) -> Result<()> {
        if self.config.partial_render {
            self.draw_buffer()?;
        }
        Ok(())
    }

    pub fn zoom(&mut self, px_per_sec: f64) -> Result<()> {
        if !(px_per_sec > 0.0) {
            return Err(invalid(format!("zoom must be positive, got {}", px_per_sec)));
        }
        log::debug!("zoom {} -> {} px/s", self.config.min_px_per_sec, px_per_sec);
        self.config.min_px_per_sec = px_per_sec;
        self.config.scroll_parent = true;
        self.draw_buffer()?;

        let progress = self.position.effective_progress(self.transport.played_percents());
        self.position.invalidate();
        if let Some(pos) = self.position.update(progress, self.drawn_width) {
            self.renderer.update_progress(pos);
        }
        self.recenter(progress)
    }

    pub fn toggle_scroll(&mut self) -> Result<()> {
        self.config.scroll_parent = !self.config.scroll_parent;
        self.draw_buffer()
    }

    // --- Cursor and scrolling ---

    fn geometry(&self) -> ScrollGeometry {
        ScrollGeometry {
            scroll_left: self.renderer.scroll_left(),
            client_width: self.renderer.client_width(),
            scroll_width: self.renderer.scroll_width(),
        }
    }

    /// Push playback progress to the cursor, skipping sub-pixel moves.
    pub fn progress(&mut self, progress: f64) -> Result<()> {
        if let Some(pos) = self.position.update(progress, self.drawn_width) {
            if self.config.scroll_parent && self.config.auto_center {
                let target = (self.renderer.scroll_width() * progress).trunc();
                self.recenter_on_position(target, false)?;
            }
            self.renderer.update_progress(pos);
        }
        Ok(())
    }

    /// Transport tick while playing.
    pub fn on_audio_process(&mut self) -> Result<()> {
        let played = self.transport.played_percents();
        self.progress(played)
    }

    pub fn recenter(&mut self, progress: f64) -> Result<()> {
        let position = self.renderer.scroll_width() * progress;
        self.recenter_on_position(position, true)
    }

    fn recenter_on_position(&mut self, position: f64, immediate: bool) -> Result<()> {
        let geometry = self.geometry();
        if let Some(target) =
            viewport::recenter_target(position, &geometry, immediate, self.config.recenter_rate)
        {
            self.renderer.set_scroll_left(target);
            self.on_scroll()?;
        }
        Ok(())
    }

    /// Scroll the container to `scroll_left` CSS pixels, as a user would.
    pub fn scroll_to(&mut self, scroll_left: f64) -> Result<()> {
        self.renderer.set_scroll_left(scroll_left);
        self.on_scroll()
    }

    // --- Playback ---

    pub fn seek_to(&mut self, progress: f64) -> Result<()> {
        let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        if !self.ready {
            self.position.seek(progress);
            return self.progress(progress);
        }

        let paused = self.transport.is_paused();
        if !paused {
            self.transport.pause();
        }
        // No auto-scroll while jumping.
        let old_scroll_parent = self.config.scroll_parent;
        self.config.scroll_parent = false;
        self.transport.seek_to(progress * self.duration_secs());
        let result = self.progress(progress);
        self.config.scroll_parent = old_scroll_parent;
        if !paused {
            self.transport.play();
        }
        result
    }

    pub fn seek_and_center(&mut self, progress: f64) -> Result<()> {
        self.seek_to(progress)?;
        self.recenter(progress)
    }

    /// Seek to a pointer x-coordinate relative to the wrapper.
    pub fn click(&mut self, x: f64) -> Result<()> {
        let container = device_width(self.renderer.client_width(), self.config.pixel_ratio);
        let progress = viewport::pointer_progress(
            x,
            &self.geometry(),
            self.drawn_width,
            container,
            self.config.pixel_ratio,
            self.config.fill_parent,
        );
        self.seek_to(progress)
    }

    /// Relative seek in seconds, clamped to the track.
    pub fn skip(&mut self, offset_secs: f64) -> Result<()> {
        let duration = match self.duration_secs() {
            d if d > 0.0 => d,
            _ => 1.0,
        };
        let position = (self.transport.current_time_secs() + offset_secs).clamp(0.0, duration);
        self.seek_and_center(position / duration)
    }

    pub fn skip_forward(&mut self, seconds: Option<f64>) -> Result<()> {
        self.skip(seconds.unwrap_or(self.config.skip_length))
    }

    pub fn skip_backward(&mut self, seconds: Option<f64>) -> Result<()> {
        self.skip(-seconds.unwrap_or(self.config.skip_length))
    }

    /// Start playback, or queue it for when the load finishes. Returns
    /// whether playback started now.
    pub fn play(&mut self) -> bool {
        if self.ready {
            self.transport.play();
            true
        } else {
            self.play_on_ready = true;
            false
        }
    }

    pub fn pause(&mut self) {
        if !self.transport.is_paused() {
            self.transport.pause();
        }
    }

    pub fn play_pause(&mut self) -> bool {
        if self.transport.is_paused() {
            self.play()
        } else {
            self.pause();
            false
        }
    }

    pub fn is_playing(&self) -> bool {
        !self.transport.is_paused()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.pause();
        self.seek_to(0.0)?;
        self.progress(0.0)
    }

    // --- Export ---

    /// Peaks of the whole track at `length` columns as JSON, rounded to
    /// `1 / accuracy`. Leaves the drawing caches alone.
    pub fn export_peaks(&self, length: usize, accuracy: f64) -> Result<String> {
        let source = self.source.as_deref().ok_or(WaveError::NoSource)?;
        let mut extractor = PeakExtractor::new(self.config.split_channels);
        let peaks = extractor.compute_peaks(source, length, 0, length.saturating_sub(1))?;
        export_peaks_json(&peaks, accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::ClockTransport;
    use crate::export::import_peaks_json;
    use crate::source::DecodedBuffer;
    use crate::waveform::terminal::AsciiRenderer;
    use crate::waveform::{ColumnRange, PeakSeries};
    use std::time::Duration;

    fn track(seconds: usize, rate: u32) -> Box<DecodedBuffer> {
        let n = seconds * rate as usize;
        let samples: Vec<f32> = (0..n).map(|i| ((i % 50) as f32 / 25.0) - 1.0).collect();
        Box::new(DecodedBuffer::new(rate, vec![samples]).unwrap())
    }

    fn scrolling_config(partial: bool) -> WaveConfig {
        WaveConfig {
            fill_parent: false,
            scroll_parent: true,
            partial_render: partial,
            auto_center: false,
            ..WaveConfig::default()
        }
    }

    fn view(config: WaveConfig) -> WaveformView<AsciiRenderer, ClockTransport> {
        WaveformView::new(config, AsciiRenderer::new(100, 8), ClockTransport::new(Duration::ZERO)).unwrap()
    }

    #[test]
    fn test_partial_render_scenario() {
        let mut v = view(scrolling_config(true));
        v.load(track(10, 1000)).unwrap();
        // 10 s * 20 px/s = 200 columns, first 100 visible.
        assert_eq!(v.drawn_width(), 200);
        assert_eq!(v.renderer().draw_stats(), (1, 100));

        v.scroll_to(50.0).unwrap();
        let vp = v.compute_viewport();
        assert_eq!(vp, ViewportRange { width: 200, start: 50, end: 150 });
        // Only 100..150 was new.
        assert_eq!(v.renderer().draw_stats(), (2, 150));
        assert_eq!(
            v.peak_cache().unwrap().current_ranges(),
            vec![ColumnRange { start: 0, end: 150 }]
        );

        // Scrolling back over painted columns extracts nothing.
        v.scroll_to(0.0).unwrap();
        assert_eq!(v.renderer().draw_stats(), (2, 150));
    }

    #[test]
    fn test_zoom_out_past_scroll_keeps_renderer_in_step() {
        let mut config = scrolling_config(true);
        config.min_px_per_sec = 40.0;
        let mut v = view(config);
        v.load(track(10, 1000)).unwrap();
        assert_eq!(v.drawn_width(), 400);

        v.scroll_to(300.0).unwrap();
        v.seek_to(1.0).unwrap();
        v.zoom(20.0).unwrap();

        assert_eq!(v.drawn_width(), 200);
        assert_eq!(v.renderer().total_width(), 200);
        assert_eq!(v.renderer().scroll_left(), 100.0);
        assert_eq!(v.compute_viewport(), ViewportRange { width: 200, start: 100, end: 200 });
        assert_eq!(
            v.peak_cache().unwrap().current_ranges(),
            vec![ColumnRange { start: 100, end: 200 }]
        );
        assert_eq!(v.renderer().progress(), 200.0);
    }

    #[test]
    fn test_full_render_repaints_everything() {
        let mut v = view(scrolling_config(false));
        v.load(track(10, 1000)).unwrap();
        assert_eq!(v.renderer().draw_stats(), (1, 200));
        v.scroll_to(50.0).unwrap();
        assert_eq!(v.renderer().draw_stats(), (1, 200));
        v.draw_buffer().unwrap();
        assert_eq!(v.renderer().draw_stats(), (2, 400));
    }

    #[test]
    fn test_zoom_invalidates_cache() {
        let mut v = view(scrolling_config(true));
        v.load(track(10, 1000)).unwrap();
        v.zoom(40.0).unwrap();
        assert_eq!(v.drawn_width(), 400);
        assert_eq!(v.peak_cache().unwrap().total_columns(), Some(400));
        assert_eq!(v.renderer().total_width(), 400);
        assert!(v.zoom(0.0).is_err());
    }

    #[test]
    fn test_fill_mode_short_track_uses_container() {
        let mut v = view(WaveConfig::default());
        v.load(track(2, 1000)).unwrap();
        assert_eq!(v.drawn_width(), 100);
        assert_eq!(v.compute_viewport(), ViewportRange { width: 100, start: 0, end: 100 });
    }

    #[test]
    fn test_supplied_peaks_are_resampled_to_width() {
        let mut v = view(WaveConfig::default());
        let peaks = PeakSeries::Merged(vec![0.5, -0.5, 0.25, -0.25]);
        v.load(Box::new(DecodedBuffer::from_peaks(peaks, 4.0))).unwrap();
        let r = v.renderer();
        assert_eq!(r.total_width(), 100);
        assert_eq!(r.column(0).unwrap().max, 0.5);
        assert_eq!(r.column(99).unwrap().min, -0.25);
    }

    #[test]
    fn test_imported_peaks_replace_extraction() {
        let mut v = view(WaveConfig::default());
        let mut buf = track(10, 100);
        buf.set_peaks(Some(import_peaks_json("[0.5,-0.5,0.25,-0.25]").unwrap()));
        v.load(buf).unwrap();
        let r = v.renderer();
        assert_eq!(r.total_width(), 100);
        assert_eq!(r.column(0), Some(crate::waveform::PeakPair { max: 0.5, min: -0.5 }));
        assert_eq!(r.column(99).unwrap().min, -0.25);
    }

    #[test]
    fn test_stale_load_is_ignored() {
        let mut v = view(scrolling_config(true));
        let old = v.begin_load();
        let new = v.begin_load();
        assert!(!v.finish_load(old, track(5, 100)).unwrap());
        assert!(!v.is_ready());
        assert!(v.finish_load(new, track(3, 100)).unwrap());
        assert!(v.is_ready());
        assert_eq!(v.duration_secs(), 3.0);
    }

    #[test]
    fn test_seek_before_ready_is_applied_once_on_load() {
        let mut v = view(scrolling_config(false));
        let token = v.begin_load();
        v.seek_to(0.25).unwrap();
        v.seek_to(0.5).unwrap();
        assert_eq!(v.transport().current_time_secs(), 0.0);
        v.finish_load(token, track(10, 100)).unwrap();
        assert_eq!(v.transport().current_time_secs(), 5.0);
        assert_eq!(v.renderer().progress(), 100.0);
    }

    #[test]
    fn test_play_before_ready_starts_on_load() {
        let mut v = view(WaveConfig::default());
        let token = v.begin_load();
        assert!(!v.play());
        v.finish_load(token, track(1, 100)).unwrap();
        assert!(v.is_playing());
    }

    #[test]
    fn test_audio_process_moves_cursor() {
        let mut v = view(scrolling_config(false));
        v.load(track(10, 100)).unwrap();
        v.play();
        v.transport_mut().advance(Duration::from_secs(5));
        v.on_audio_process().unwrap();
        assert_eq!(v.renderer().progress(), 100.0);
    }

    #[test]
    fn test_auto_center_follows_cursor() {
        let mut config = scrolling_config(true);
        config.auto_center = true;
        let mut v = view(config);
        v.load(track(10, 100)).unwrap();
        v.seek_and_center(0.75).unwrap();
        // 150 px into 200: centred means 100 scrolled, capped at 200-100.
        assert_eq!(v.renderer().scroll_left(), 100.0);
        assert_eq!(v.compute_viewport().start, 100);
    }

    #[test]
    fn test_skip_is_clamped_to_track() {
        let mut v = view(scrolling_config(false));
        v.load(track(10, 100)).unwrap();
        v.skip_forward(None).unwrap();
        assert_eq!(v.transport().current_time_secs(), 2.0);
        v.skip_backward(Some(30.0)).unwrap();
        assert_eq!(v.transport().current_time_secs(), 0.0);
        v.skip(100.0).unwrap();
        assert_eq!(v.transport().current_time_secs(), 10.0);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut v = view(scrolling_config(false));
        v.load(track(10, 100)).unwrap();
        v.play();
        v.transport_mut().advance(Duration::from_secs(3));
        v.stop().unwrap();
        assert!(!v.is_playing());
        assert_eq!(v.transport().current_time_secs(), 0.0);
        assert_eq!(v.renderer().progress(), 0.0);
    }

    #[test]
    fn test_click_seeks() {
        let mut v = view(scrolling_config(false));
        v.load(track(10, 100)).unwrap();
        // Scroll width is 200 px; x = 100 with no scroll is the middle.
        v.click(100.0).unwrap();
        assert_eq!(v.transport().current_time_secs(), 5.0);
    }

    #[test]
    fn test_draw_without_source_fails() {
        let mut v = view(WaveConfig::default());
        assert!(matches!(v.draw_buffer(), Err(WaveError::NoSource)));
        assert!(matches!(v.export_peaks(10, 100.0), Err(WaveError::NoSource)));
    }

    #[test]
    fn test_export_does_not_disturb_cache() {
        let mut v = view(scrolling_config(true));
        v.load(track(10, 100)).unwrap();
        let json = v.export_peaks(4, 100.0).unwrap();
        let parsed: Vec<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 8);
        assert_eq!(v.peak_cache().unwrap().total_columns(), Some(200));
    }
}
