/// Ratatui-based terminal for taskterm.
///
/// Architecture:
///   main task:    event loop, crossterm keyboard events + mpsc UiEvent drain
///   worker task:  tokio::spawn, executes queued command lines one at a time,
///                 sending UiEvents (output lines, form requests) back here
///
/// Layout:
///   ┌────────────────────────────────────────────────┐
///   │  output log (scrollable, Min(0))               │
///   ├────────────────────────────────────────────────┤
///   │  status bar (1 line)                           │
///   ├────────────────────────────────────────────────┤
///   │  input box (2 lines, fixed)                    │
///   └────────────────────────────────────────────────┘
///   The task form is drawn as a centred popup over all of it.
pub mod input;
pub mod overlays;
pub mod render;

use std::io;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

use crate::client::{HttpTransport, RequestClient};
use crate::config::ResolvedConfig;
use crate::form::{DialogPrompt, FormState};
use crate::history::{CommandHistory, Recall};
use crate::interpreter::{Interpreter, spawn_worker};
use crate::output::{OutputLine, OutputLog, OutputSink};
use input::InputLine;

// ── UiEvent: typed events from the command worker → TUI ───────────────────────

#[derive(Debug)]
pub enum UiEvent {
    /// Append a rendered line to the output log
    Line(OutputLine),
    /// Wipe the output log
    ClearOutput,
    /// Show the task form; the worker is suspended until it resolves
    OpenForm(FormState),
    /// The worker picked the next queued command
    CommandStarted,
    /// The current command ran to completion
    CommandFinished,
}

// ── AppState: one terminal session ─────────────────────────────────────────────

pub struct AppState {
    pub output: OutputLog,
    pub history: CommandHistory,
    pub input: InputLine,
    /// The open task form, if any. At most one exists at a time.
    pub form: Option<FormState>,
    /// A command is executing on the worker
    pub busy: bool,
    /// Submitted lines the worker hasn't started yet
    pub queued: usize,
    pub profile: String,
    pub base_url: String,
    pub show_timestamps: bool,
    /// Incremented every 120ms while busy, for the spinner
    pub spinner_tick: u32,
}

impl AppState {
    pub fn new(resolved: &ResolvedConfig, show_timestamps: bool) -> Self {
        Self {
            output: OutputLog::default(),
            history: CommandHistory::default(),
            input: InputLine::default(),
            form: None,
            busy: false,
            queued: 0,
            profile: resolved.profile_name.clone(),
            base_url: resolved.base_url.clone(),
            show_timestamps,
            spinner_tick: 0,
        }
    }

    fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::Line(line) => self.output.push(line),
            UiEvent::ClearOutput => self.output.clear(),
            UiEvent::OpenForm(form) => {
                if self.form.is_some() {
                    // Only one dialog slot; dropping the newcomer resolves it as cancelled.
                    warn!("task form requested while one is already open");
                } else {
                    self.form = Some(form);
                }
            }
            UiEvent::CommandStarted => {
                self.busy = true;
                self.queued = self.queued.saturating_sub(1);
            }
            UiEvent::CommandFinished => self.busy = false,
        }
    }
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Raw mode + alternate screen for as long as it lives. The terminal is
/// restored on drop, including when the event loop bails out with `?`.
struct TerminalGuard {
    terminal: Term,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;

        // Leave the alternate screen before a panic message prints.
        let orig_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            orig_hook(info);
        }));

        let terminal = Terminal::new(CrosstermBackend::new(io::stdout())).inspect_err(|_| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        })?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

// ── Main TUI run loop ─────────────────────────────────────────────────────────

pub async fn run(resolved: ResolvedConfig, show_timestamps: bool) -> Result<()> {
    let transport = HttpTransport::new(&resolved)?;
    let mut guard = TerminalGuard::enter()?;
    event_loop(&mut guard.terminal, transport, resolved, show_timestamps).await
}

async fn event_loop(
    terminal: &mut Term,
    transport: HttpTransport,
    resolved: ResolvedConfig,
    show_timestamps: bool,
) -> Result<()> {
    let mut state = AppState::new(&resolved, show_timestamps);
    state.output.info(&format!(
        "taskterm · {} · {} · type 'help' for available commands.",
        resolved.profile_name, resolved.base_url
    ));

    // Channel: worker → TUI
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let interpreter = Interpreter::new(RequestClient::new(transport), DialogPrompt::new(ui_tx.clone()));
    let (cmd_tx, worker) = spawn_worker(interpreter, ui_tx);
    info!(profile = %resolved.profile_name, base_url = %resolved.base_url, "terminal session started");

    let mut crossterm_events = EventStream::new();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(120));

    terminal.draw(|f| render::draw(f, &state))?;

    loop {
        tokio::select! {
            // ── Animation tick ────────────────────────────────────────────────
            _ = ticker.tick() => {
                if state.busy {
                    state.spinner_tick = state.spinner_tick.wrapping_add(1);
                    terminal.draw(|f| render::draw(f, &state))?;
                }
            }

            // ── Drain UI events from the worker ───────────────────────────────
            Some(ev) = ui_rx.recv() => {
                state.apply_event(ev);
                terminal.draw(|f| render::draw(f, &state))?;
            }

            // ── Keyboard/resize events ────────────────────────────────────────
            Some(Ok(ev)) = crossterm_events.next() => {
                match ev {
                    Event::Key(key) => {
                        if !handle_key(key, &mut state, &cmd_tx) { break; }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
                terminal.draw(|f| render::draw(f, &state))?;
            }
        }
    }

    // Dropping an open form resolves it as cancelled. Queued commands are
    // discarded: the worker is aborted, not drained.
    state.form = None;
    drop(cmd_tx);
    worker.abort();
    info!("terminal session ended");
    Ok(())
}

// ── Key handler ───────────────────────────────────────────────────────────────

/// Returns `false` when the user asked to quit.
fn handle_key(key: KeyEvent, state: &mut AppState, cmd_tx: &UnboundedSender<String>) -> bool {
    if key.kind == KeyEventKind::Release {
        return true;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d')) {
        return false;
    }

    // ── Task form captures every other key while open ─────────────────────────
    if state.form.is_some() {
        match key.code {
            KeyCode::Esc => {
                if let Some(form) = state.form.take() {
                    form.cancel();
                }
            }
            KeyCode::Enter => {
                if let Some(form) = state.form.take() {
                    form.submit();
                }
            }
            code => {
                if let Some(form) = state.form.as_mut() {
                    match code {
                        KeyCode::Tab | KeyCode::Down => form.next_field(),
                        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                        KeyCode::Backspace => form.backspace(),
                        KeyCode::Char(c) if !ctrl => form.insert_char(c),
                        _ => {}
                    }
                }
            }
        }
        return true;
    }

    match key.code {
        KeyCode::Enter => submit_input(state, cmd_tx),
        KeyCode::Up => {
            if let Recall::Show(entry) = state.history.recall_older() {
                let entry = entry.to_string();
                state.input.set(&entry);
            }
        }
        KeyCode::Down => {
            if let Recall::Show(entry) = state.history.recall_newer() {
                let entry = entry.to_string();
                state.input.set(&entry);
            }
        }
        KeyCode::PageUp => state.output.scroll_up(10),
        KeyCode::PageDown => state.output.scroll_down(10),
        KeyCode::Left if ctrl => state.input.move_word_left(),
        KeyCode::Right if ctrl => state.input.move_word_right(),
        KeyCode::Left => state.input.move_left(),
        KeyCode::Right => state.input.move_right(),
        KeyCode::Home => state.input.home(),
        KeyCode::End => state.input.end(),
        KeyCode::Backspace => state.input.backspace(),
        KeyCode::Delete => state.input.delete_forward(),
        KeyCode::Char('w') if ctrl => state.input.delete_word_back(),
        KeyCode::Char('u') if ctrl => state.input.set(""),
        KeyCode::Char(c) if !ctrl => state.input.insert(c),
        _ => {}
    }
    true
}

/// Enter on the command line: record, queue for the worker, clear the line.
fn submit_input(state: &mut AppState, cmd_tx: &UnboundedSender<String>) {
    if state.input.is_blank() {
        return;
    }
    let line = state.input.take();
    state.history.record(&line);
    match cmd_tx.send(line) {
        Ok(()) => state.queued += 1,
        Err(_) => state.output.error("command worker has stopped; restart taskterm"),
    }
}
