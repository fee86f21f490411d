/// Command interpreter: turns one raw input line into local effects or a
/// sequence of remote calls, and reports every outcome to the output sink.
///
/// Commands run one at a time. The TUI feeds raw lines into a queue drained
/// by a single worker task, so a command typed while another is suspended
/// (waiting on the network or on the task form) starts only after the
/// current one has finished.
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::{RequestClient, SendOptions, Transport};
use crate::command::{self, Command};
use crate::form::{FormError, FormPrompt, TaskFormValues};
use crate::output::{ChannelSink, OutputSink};
use crate::protocol::{ServerResponse, TaskId, TaskRequest, decode_task_record};
use crate::tui::UiEvent;

pub const CLEARED: &str = "Terminal cleared.";
pub const ADD_CANCELLED: &str = "Task creation cancelled.";
pub const EDIT_CANCELLED: &str = "Task edit cancelled.";

// ── Edit workflow ─────────────────────────────────────────────────────────────

/// Linear edit workflow. Each state either advances to the next one or
/// jumps straight to `Done`.
#[derive(Debug)]
enum EditState {
    FetchCurrent,
    Decode(ServerResponse),
    Collect(TaskFormValues),
    Submit(TaskFormValues),
    Confirm(ServerResponse),
    Done(EditOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    FetchFailed,
    DecodeFailed,
    Cancelled,
    FormUnavailable,
    SubmitFailed,
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter<T, F> {
    client: RequestClient<T>,
    forms: F,
}

impl<T: Transport, F: FormPrompt> Interpreter<T, F> {
    pub fn new(client: RequestClient<T>, forms: F) -> Self {
        Self { client, forms }
    }

    /// Run one raw input line to completion.
    pub async fn execute(&self, raw: &str, out: &mut dyn OutputSink) {
        out.command(raw);

        let parsed = command::tokenize(raw);
        let command = match Command::try_from(&parsed) {
            Ok(c) => c,
            Err(e) => {
                debug!(name = %parsed.name, error = %e, "rejected command");
                out.error(&e.to_string());
                return;
            }
        };
        info!(name = %parsed.name, "executing command");

        match command {
            Command::Clear => {
                out.clear();
                out.info(CLEARED);
            }
            Command::Help => {
                for line in command::help_lines() {
                    out.info(&line);
                }
            }
            Command::List { args } => {
                self.client.send(&TaskRequest::List { args }, SendOptions::RENDER, out).await;
            }
            Command::View(task_id) => {
                self.client.send(&TaskRequest::View { task_id }, SendOptions::RENDER, out).await;
            }
            Command::Delete(task_id) => {
                self.client.send(&TaskRequest::Delete { task_id }, SendOptions::RENDER, out).await;
            }
            Command::Add => self.add(out).await,
            Command::Edit(task_id) => {
                self.edit(&task_id, out).await;
            }
        }
    }

    async fn add(&self, out: &mut dyn OutputSink) {
        match self.forms.acquire(None).await {
            Ok(Some(values)) => {
                self.client.send(&TaskRequest::Add(values), SendOptions::RENDER, out).await;
            }
            Ok(None) => out.info(ADD_CANCELLED),
            Err(e) => out.error(&format!("Couldn't open task form: {e}")),
        }
    }

    /// Fetch → decode → form → submit → redisplay. Any failure ends the run.
    pub async fn edit(&self, task_id: &TaskId, out: &mut dyn OutputSink) -> EditOutcome {
        if !self.forms.is_interactive() {
            out.error(&format!("Couldn't open task form: {}", FormError::Unavailable));
            return EditOutcome::FormUnavailable;
        }
        let mut state = EditState::FetchCurrent;
        loop {
            state = match state {
                EditState::Done(outcome) => {
                    info!(%task_id, ?outcome, "edit finished");
                    return outcome;
                }
                current => {
                    debug!(%task_id, state = state_name(&current), "edit step");
                    self.edit_step(task_id, current, out).await
                }
            };
        }
    }

    async fn edit_step(
        &self,
        task_id: &TaskId,
        state: EditState,
        out: &mut dyn OutputSink,
    ) -> EditState {
        match state {
            EditState::FetchCurrent => {
                let request = TaskRequest::View { task_id: task_id.clone() };
                let response = self.client.inspect(&request, out).await;
                if response.is_success() {
                    EditState::Decode(response)
                } else {
                    out.error(&format!("Couldn't edit: {}", response.message_text()));
                    EditState::Done(EditOutcome::FetchFailed)
                }
            }
            EditState::Decode(response) => {
                let decoded = match response.result.as_deref() {
                    Some(raw) => decode_task_record(raw).map_err(|e| e.to_string()),
                    None => Err("response carried no result".to_string()),
                };
                match decoded {
                    Ok(current) => EditState::Collect(current),
                    Err(e) => {
                        out.error(&format!("Couldn't edit: invalid task record: {e}"));
                        EditState::Done(EditOutcome::DecodeFailed)
                    }
                }
            }
            EditState::Collect(current) => match self.forms.acquire(Some(current)).await {
                Ok(Some(values)) => EditState::Submit(values),
                Ok(None) => {
                    out.info(EDIT_CANCELLED);
                    EditState::Done(EditOutcome::Cancelled)
                }
                Err(e) => {
                    out.error(&format!("Couldn't open task form: {e}"));
                    EditState::Done(EditOutcome::FormUnavailable)
                }
            },
            EditState::Submit(values) => {
                let request = TaskRequest::Edit { task_id: task_id.clone(), values };
                let response = self.client.inspect(&request, out).await;
                if response.is_success() {
                    EditState::Confirm(response)
                } else {
                    out.error(response.message_text());
                    EditState::Done(EditOutcome::SubmitFailed)
                }
            }
            EditState::Confirm(response) => {
                out.success(response.result_text());
                let request = TaskRequest::View { task_id: task_id.clone() };
                self.client.send(&request, SendOptions::RENDER, out).await;
                EditState::Done(EditOutcome::Updated)
            }
            done @ EditState::Done(_) => done,
        }
    }
}

fn state_name(state: &EditState) -> &'static str {
    match state {
        EditState::FetchCurrent => "fetch_current",
        EditState::Decode(_) => "decode",
        EditState::Collect(_) => "collect",
        EditState::Submit(_) => "submit",
        EditState::Confirm(_) => "confirm",
        EditState::Done(_) => "done",
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Spawn the command worker. Lines sent on the returned channel execute
/// strictly in order; each is bracketed by `CommandStarted`/`CommandFinished`.
pub fn spawn_worker<T, F>(
    interpreter: Interpreter<T, F>,
    ui_tx: UnboundedSender<UiEvent>,
) -> (UnboundedSender<String>, JoinHandle<()>)
where
    T: Transport + 'static,
    F: FormPrompt + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();
    let handle = tokio::spawn(run_worker(interpreter, cmd_rx, ui_tx));
    (cmd_tx, handle)
}

async fn run_worker<T: Transport, F: FormPrompt>(
    interpreter: Interpreter<T, F>,
    mut commands: UnboundedReceiver<String>,
    ui_tx: UnboundedSender<UiEvent>,
) {
    let mut sink = ChannelSink::new(ui_tx.clone());
    while let Some(raw) = commands.recv().await {
        let _ = ui_tx.send(UiEvent::CommandStarted);
        interpreter.execute(&raw, &mut sink).await;
        let _ = ui_tx.send(UiEvent::CommandFinished);
    }
    debug!("command queue closed, worker exiting");
}
