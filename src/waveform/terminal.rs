// src/waveform/terminal.rs

use crate::renderer::Renderer;
use crate::waveform::{PeakPair, PeakSeries};

/// Paint one row per line, one character per column. Rows run from the top
/// (+1.0) to the bottom (-1.0); values outside that are clipped.
pub fn render_ascii(columns: &[PeakPair], height: usize, scale: f32) -> Vec<String> {
    let h = height.max(4);
    let mut lines = vec![vec![' '; columns.len()]; h];
    let to_row = |v: f32| -> usize {
        let clamped = (v * scale).clamp(-1.0, 1.0);
        let y = (0.5 - 0.5 * clamped) * (h as f32 - 1.0);
        y.round() as usize
    };
    for (x, pair) in columns.iter().enumerate() {
        let y1 = to_row(pair.max);
        let y0 = to_row(pair.min);
        let (a, b) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for line in lines.iter_mut().take(b + 1).skip(a) {
            line[x] = '█';
        }
    }
    lines.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// `Renderer` that keeps every painted column and prints the visible part
/// as block characters. Works at a pixel ratio of 1: one terminal cell is
/// one column.
pub struct AsciiRenderer {
    height: usize,
    client_width: usize,
    scroll_left: usize,
    columns: Vec<PeakPair>,
    progress: f64,
    normalize: bool,
    bar_height: f32,
    draw_calls: usize,
    painted_columns: usize,
}

impl AsciiRenderer {
    pub fn new(client_width: usize, height: usize) -> Self {
        Self {
            height,
            client_width,
            scroll_left: 0,
            columns: Vec::new(),
            progress: 0.0,
            normalize: false,
            bar_height: 1.0,
            draw_calls: 0,
            painted_columns: 0,
        }
    }

    pub fn set_normalize(&mut self, normalize: bool, bar_height: f32) {
        self.normalize = normalize;
        self.bar_height = bar_height;
    }

    /// Follow a terminal resize. The scroll offset is pulled back so the
    /// window stays inside the waveform.
    pub fn set_client_width(&mut self, width: usize) {
        self.client_width = width;
        self.scroll_left = self.scroll_left.min(self.columns.len().saturating_sub(width));
    }

    pub fn total_width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<PeakPair> {
        self.columns.get(index).copied()
    }

    /// Number of `draw_peaks` calls and columns written since creation.
    pub fn draw_stats(&self) -> (usize, usize) {
        (self.draw_calls, self.painted_columns)
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Visible window as text, with the progress cursor marked by `│` in
    /// empty cells.
    pub fn render_lines(&self) -> Vec<String> {
        let start = self.scroll_left.min(self.columns.len());
        let end = (start + self.client_width).min(self.columns.len());
        let visible = &self.columns[start..end];

        let scale = if self.normalize {
            let abs_max = self
                .columns
                .iter()
                .fold(0.0f32, |acc, p| acc.max(p.max.abs()).max(p.min.abs()));
            if abs_max > 0.0 { 1.0 / abs_max } else { 1.0 }
        } else {
            self.bar_height
        };

        let mut lines = render_ascii(visible, self.height, scale);
        let cursor = self.progress.round() as usize;
        if cursor >= start && cursor < end {
            let x = cursor - start;
            for line in &mut lines {
                let mut chars: Vec<char> = line.chars().collect();
                if chars[x] == ' ' {
                    chars[x] = '│';
                }
                *line = chars.into_iter().collect();
            }
        }
        lines
    }
}

impl Renderer for AsciiRenderer {
    fn set_width(&mut self, total_width: usize) {
        if self.columns.len() != total_width {
            self.columns = vec![PeakPair::default(); total_width];
            self.scroll_left = self.scroll_left.min(total_width.saturating_sub(self.client_width));
        }
    }

    fn draw_peaks(&mut self, peaks: &PeakSeries, total_width: usize, start: usize, end: usize) {
        self.set_width(total_width);
        self.draw_calls += 1;

        let end = end.min(total_width);
        for (k, col) in (start..end).enumerate() {
            // Split series are folded into one lane.
            let mut pair = PeakPair::default();
            for c in 0..peaks.channel_count() {
                if let Some(p) = peaks.pair(c, k) {
                    pair.max = pair.max.max(p.max);
                    pair.min = pair.min.min(p.min);
                }
            }
            self.columns[col] = pair;
            self.painted_columns += 1;
        }
    }

    fn clear_wave(&mut self) {
        self.columns.iter_mut().for_each(|p| *p = PeakPair::default());
    }

    fn update_progress(&mut self, position: f64) {
        self.progress = position;
    }

    fn client_width(&self) -> f64 {
        self.client_width as f64
    }

    fn scroll_left(&self) -> f64 {
        self.scroll_left as f64
    }

    fn set_scroll_left(&mut self, scroll_left: f64) {
        let max_scroll = self.columns.len().saturating_sub(self.client_width);
        self.scroll_left = (scroll_left.max(0.0).round() as usize).min(max_scroll);
    }

    fn scroll_width(&self) -> f64 {
        self.columns.len().max(self.client_width) as f64
    }
}
