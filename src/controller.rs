// src/controller.rs

use std::fmt::Write as FmtWrite;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate},
};

use crate::config::WaveConfig;
use crate::export::DEFAULT_ACCURACY;
use crate::playback::{ClockTransport, Transport};
use crate::renderer::Renderer;
use crate::source::SampleSource;
use crate::view::WaveformView;
use crate::waveform::terminal::AsciiRenderer;

pub type TerminalView = WaveformView<AsciiRenderer, ClockTransport>;

const ZOOM_STEP: f64 = 1.5;
const EXPORT_COLUMNS: usize = 1000;

/// Terminal front end: owns the view, advances the clock every tick and
/// repaints only when something visible changed.
pub struct ViewerController {
    view: TerminalView,
    title: String,
    export_path: PathBuf,
    last_tick: Instant,
    // Last painted (cursor, scroll, draw calls, playing); skip identical frames.
    cached_frame: Option<(u64, u64, usize, bool)>,
    force_redraw: bool,
    message: Option<String>,
    draw_buffer: String,
}

impl ViewerController {
    pub fn new(
        config: WaveConfig,
        width: usize,
        height: usize,
        source: Box<dyn SampleSource>,
        title: impl Into<String>,
        export_path: PathBuf,
    ) -> anyhow::Result<Self> {
        let mut renderer = AsciiRenderer::new(width, height);
        renderer.set_normalize(config.normalize, config.bar_height);
        let transport = ClockTransport::new(Duration::ZERO);

        let mut view = WaveformView::new(config, renderer, transport).context("Invalid viewer configuration")?;
        view.load(source).context("Failed to draw waveform")?;

        Ok(Self {
            view,
            title: title.into(),
            export_path,
            last_tick: Instant::now(),
            cached_frame: None,
            force_redraw: true,
            message: None,
            draw_buffer: String::with_capacity(4096),
        })
    }

    pub fn view(&self) -> &TerminalView {
        &self.view
    }

    pub fn run_tick(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        self.update(elapsed)?;

        if !self.frame_changed() {
            return Ok(());
        }
        self.compose_frame();

        let mut stdout = stdout();
        execute!(stdout, BeginSynchronizedUpdate)?;
        stdout.write_all(self.draw_buffer.as_bytes())?;
        execute!(stdout, EndSynchronizedUpdate)?;
        stdout.flush()?;
        Ok(())
    }

    /// Advance playback by `elapsed` and move the cursor.
    pub fn update(&mut self, elapsed: Duration) -> anyhow::Result<()> {
        if !self.view.is_playing() {
            return Ok(());
        }
        self.view.transport_mut().advance(elapsed);
        self.view.on_audio_process()?;
        if self.view.transport().is_finished() {
            self.message = Some("Track finished.".to_string());
            self.force_redraw = true;
        }
        Ok(())
    }

    fn frame_changed(&mut self) -> bool {
        let r = self.view.renderer();
        let frame = (
            r.progress().to_bits(),
            r.scroll_left().to_bits(),
            r.draw_stats().0,
            self.view.is_playing(),
        );
        let changed = self.force_redraw || self.cached_frame != Some(frame);
        self.cached_frame = Some(frame);
        self.force_redraw = false;
        changed
    }

    fn compose_frame(&mut self) {
        self.draw_buffer.clear();
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, 0));
        let lines = self.view.renderer().render_lines();
        for line in &lines {
            let _ = write!(self.draw_buffer, "{}\x1b[K\r\n", line);
        }
        let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        let status = self.status_line();
        let _ = write!(self.draw_buffer, "{}\r\n", status);
        let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        if let Some(msg) = &self.message {
            let _ = write!(self.draw_buffer, "{}", msg);
        }
    }

    pub fn status_line(&self) -> String {
        let t = self.view.transport();
        let cur = t.current_time_secs() as u64;
        let total = t.duration_secs() as u64;
        let config = self.view.config();
        let mut line = format!(
            "{} {} {:02}:{:02} / {:02}:{:02} | {:.0} px/s",
            if self.view.is_playing() { "▶" } else { "⏸" },
            self.title,
            cur / 60,
            cur % 60,
            total / 60,
            total % 60,
            config.min_px_per_sec,
        );
        if config.scroll_parent {
            line.push_str(" | scroll");
        }
        if let Some(cache) = self.view.peak_cache() {
            let _ = write!(line, " | {} cached range(s)", cache.current_ranges().len());
        }
        line
    }

    pub fn should_quit(&self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => true,
            KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> anyhow::Result<()> {
        self.message = None;
        match key {
            KeyCode::Char(' ') => {
                self.view.play_pause();
            }
            KeyCode::Home => self.view.stop()?,
            KeyCode::Char('[') => self.view.skip_backward(None)?,
            KeyCode::Char(']') => self.view.skip_forward(None)?,
            KeyCode::Left => self.scroll_by(-0.25)?,
            KeyCode::Right => self.scroll_by(0.25)?,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let pps = self.view.config().min_px_per_sec * ZOOM_STEP;
                self.view.zoom(pps)?;
            }
            KeyCode::Char('-') => {
                let pps = self.view.config().min_px_per_sec / ZOOM_STEP;
                self.view.zoom(pps)?;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => self.view.toggle_scroll()?,
            KeyCode::Char('e') | KeyCode::Char('E') => self.export_peaks()?,
            _ => return Ok(()),
        }
        self.force_redraw = true;
        Ok(())
    }

    /// Terminal resized to `width` columns: redraw at the new width and put
    /// the cursor back.
    pub fn resize(&mut self, width: usize) -> anyhow::Result<()> {
        log::debug!("resize to {} columns", width);
        self.view.renderer_mut().set_client_width(width);
        self.view.redraw()?;
        self.force_redraw = true;
        Ok(())
    }

    /// Scroll by a fraction of the visible width.
    fn scroll_by(&mut self, pages: f64) -> anyhow::Result<()> {
        let r = self.view.renderer();
        let target = r.scroll_left() + pages * r.client_width();
        self.view.scroll_to(target)?;
        Ok(())
    }

    fn export_peaks(&mut self) -> anyhow::Result<()> {
        let json = self.view.export_peaks(EXPORT_COLUMNS, DEFAULT_ACCURACY)?;
        std::fs::write(&self.export_path, json)
            .with_context(|| format!("Failed to write {}", self.export_path.display()))?;
        log::info!("peaks exported to {}", self.export_path.display());
        self.message = Some(format!("Peaks saved to {}", self.export_path.display()));
        Ok(())
    }
}
