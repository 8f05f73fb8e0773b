//! Progress bar rendering and observers.
//!
//! A line looks like
//! `Progress: [#########___________]  47%  |  meshing`
//! and is redrawn in place with a carriage return.

use std::io::Write;

use serde_json::Value;

/// Number of segments in the bar; each stands for 5 %.
pub const BAR_SEGMENTS: u8 = 20;

/// Width the step label is right-padded to.
pub const STEP_COLUMN_WIDTH: usize = 45;

/// `[` + 20 segments + `]`. Segment `i` is filled once `percent >= i * 5`.
pub fn render_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let mut bar = String::with_capacity(BAR_SEGMENTS as usize + 2);
    bar.push('[');
    for i in 1..=BAR_SEGMENTS {
        bar.push(if percent >= i * 5 { '#' } else { '_' });
    }
    bar.push(']');
    bar
}

/// One progress line, without the leading carriage return.
pub fn render_line(percent: u8, step: Option<&str>) -> String {
    let percent = percent.min(100);
    let pct = percent.to_string();
    let pad = " ".repeat(3usize.saturating_sub(pct.len()));
    let step_text = match step {
        Some(label) if !label.is_empty() => {
            format!("{:<width$}", format!("  |  {label}"), width = STEP_COLUMN_WIDTH)
        }
        _ => String::new(),
    };
    format!("Progress: {}{pad} {pct}%{step_text}", render_bar(percent))
}

/// Final line drawn after a successful poll.
pub fn render_finished() -> String {
    render_line(100, Some("Finished."))
}

/// Receives progress observations from the poller.
pub trait ProgressObserver {
    fn on_progress(&mut self, percent: u8, step: Option<&str>);

    /// Called once with the final payload when the job is done.
    fn on_complete(&mut self, _payload: &Value) {}
}

/// Draws the bar on a terminal-like writer.
///
/// Write errors are ignored; a broken stdout must not fail a poll.
pub struct TerminalProgress<W: Write> {
    out: W,
    drawn: bool,
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out, drawn: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// End a bar left half-drawn by a failed poll.
    pub fn abandon(&mut self) {
        if self.drawn {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.drawn = false;
        }
    }

    fn draw(&mut self, line: &str, finish: bool) {
        let _ = write!(self.out, "\r{line}");
        if finish {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
        self.drawn = !finish;
    }
}

impl TerminalProgress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ProgressObserver for TerminalProgress<W> {
    fn on_progress(&mut self, percent: u8, step: Option<&str>) {
        self.draw(&render_line(percent, step), false);
    }

    fn on_complete(&mut self, _payload: &Value) {
        self.draw(&render_finished(), true);
    }
}

/// Discards everything. Used for the upload phases.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _percent: u8, _step: Option<&str>) {}
}

/// Keeps every observation, for tests and summaries.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub updates: Vec<(u8, Option<String>)>,
    pub completed: Option<Value>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&mut self, percent: u8, step: Option<&str>) {
        self.updates.push((percent, step.map(str::to_string)));
    }

    fn on_complete(&mut self, payload: &Value) {
        self.completed = Some(payload.clone());
    }
}
