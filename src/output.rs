/// Output sink: the ordered, append-only log of rendered lines.
///
/// The interpreter and request client only ever talk to `dyn OutputSink`.
/// The TUI forwards lines over its event channel, single-shot mode prints
/// them, and tests collect them in an `OutputLog`.
use chrono::{DateTime, Local};
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::UiEvent;

// ── Line model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Echo of the raw input, drawn with the prompt
    Command,
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct OutputLine {
    pub kind: LineKind,
    pub text: String,
    pub at: DateTime<Local>,
}

impl OutputLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), at: Local::now() }
    }
}

// ── Sink trait ────────────────────────────────────────────────────────────────

pub trait OutputSink: Send {
    fn push(&mut self, line: OutputLine);

    /// Drop everything rendered so far.
    fn clear(&mut self);

    fn command(&mut self, raw: &str) {
        self.push(OutputLine::new(LineKind::Command, raw));
    }
    fn success(&mut self, text: &str) {
        self.push(OutputLine::new(LineKind::Success, text));
    }
    fn error(&mut self, text: &str) {
        self.push(OutputLine::new(LineKind::Error, text));
    }
    fn info(&mut self, text: &str) {
        self.push(OutputLine::new(LineKind::Info, text));
    }
}

// ── In-memory log ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct OutputLog {
    lines: Vec<OutputLine>,
    /// Lines scrolled up from the bottom; 0 = following new output
    pub scroll: usize,
}

impl OutputLog {
    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.lines.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    /// `(kind, text)` pairs, for assertions.
    #[cfg(test)]
    pub fn rendered(&self) -> Vec<(LineKind, &str)> {
        self.lines.iter().map(|l| (l.kind, l.text.as_str())).collect()
    }
}

impl OutputSink for OutputLog {
    fn push(&mut self, line: OutputLine) {
        self.lines.push(line);
        self.scroll = 0; // auto-scroll to bottom on new content
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.scroll = 0;
    }
}

// ── Channel sink (interpreter worker → TUI) ───────────────────────────────────

pub struct ChannelSink {
    tx: UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn push(&mut self, line: OutputLine) {
        // Receiver gone means the TUI is shutting down; nothing left to draw on.
        let _ = self.tx.send(UiEvent::Line(line));
    }

    fn clear(&mut self) {
        let _ = self.tx.send(UiEvent::ClearOutput);
    }
}

// ── Plain stdout sink (single-shot mode) ──────────────────────────────────────

#[derive(Default)]
pub struct StdoutSink {
    pub timestamps: bool,
}

impl OutputSink for StdoutSink {
    fn push(&mut self, line: OutputLine) {
        let ts = if self.timestamps {
            format!("{} ", line.at.format("%H:%M:%S"))
        } else {
            String::new()
        };
        match line.kind {
            LineKind::Command => println!("{ts}$ {}", line.text),
            LineKind::Success => println!("{ts}  ✓ {}", line.text),
            LineKind::Error => eprintln!("{ts}  ✗ {}", line.text),
            LineKind::Info => println!("{ts}  {}", line.text),
        }
    }

    fn clear(&mut self) {}
}
