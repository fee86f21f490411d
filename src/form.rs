/// Modal task form: asynchronous acquisition of task fields from the user.
///
/// The interpreter side calls `FormPrompt::acquire` and suspends. The
/// `DialogPrompt` implementation builds a `FormState` (the dialog surface)
/// and hands it to the TUI over the event channel; the TUI draws it, routes
/// keys into it and finally calls `submit` or `cancel`, which resolves the
/// waiting acquisition. A `FormState` that is dropped unresolved resolves
/// as cancelled, so an acquisition can never hang on a vanished dialog.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::debug;

use crate::protocol::lenient_text;
use crate::tui::UiEvent;

// ── Values ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFormValues {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub est_time_days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Importance,
    Deadline,
    EstTimeDays,
    Description,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Title,
        FormField::Importance,
        FormField::Deadline,
        FormField::EstTimeDays,
        FormField::Description,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Importance => "Importance",
            FormField::Deadline => "Deadline",
            FormField::EstTimeDays => "Est. days",
            FormField::Description => "Description",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            FormField::Title => "max 100 chars",
            FormField::Importance => "0 or more",
            FormField::Deadline => "YYYY-MM-DD",
            FormField::EstTimeDays => "optional",
            FormField::Description => "optional",
        }
    }
}

impl TaskFormValues {
    pub fn get(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Title => self.title.as_deref(),
            FormField::Importance => self.importance.as_deref(),
            FormField::Deadline => self.deadline.as_deref(),
            FormField::EstTimeDays => self.est_time_days.as_deref(),
            FormField::Description => self.description.as_deref(),
        }
    }

    fn slot(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::Title => &mut self.title,
            FormField::Importance => &mut self.importance,
            FormField::Deadline => &mut self.deadline,
            FormField::EstTimeDays => &mut self.est_time_days,
            FormField::Description => &mut self.description,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        *self.slot(field) = Some(value.into());
    }
}

// ── Acquisition ───────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("another task form is already open")]
    Busy,
    #[error("the terminal closed before the form was answered")]
    Closed,
    #[error("the task form needs an interactive terminal")]
    Unavailable,
}

#[async_trait]
pub trait FormPrompt: Send + Sync {
    /// Ask the user for task fields, pre-filled from `defaults`.
    /// `Ok(None)` means the user cancelled.
    async fn acquire(
        &self,
        defaults: Option<TaskFormValues>,
    ) -> Result<Option<TaskFormValues>, FormError>;

    /// Whether `acquire` can ever show a form. Lets multi-step flows
    /// bail out before making remote calls.
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Presents forms through the TUI. At most one acquisition is in flight.
pub struct DialogPrompt {
    tx: UnboundedSender<UiEvent>,
    active: Arc<AtomicBool>,
}

impl DialogPrompt {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx, active: Arc::new(AtomicBool::new(false)) }
    }
}

/// Frees the single dialog slot however the acquisition ends.
struct SlotGuard<'a>(&'a AtomicBool);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl FormPrompt for DialogPrompt {
    async fn acquire(
        &self,
        defaults: Option<TaskFormValues>,
    ) -> Result<Option<TaskFormValues>, FormError> {
        if self.active.swap(true, Ordering::AcqRel) {
            return Err(FormError::Busy);
        }
        let _slot = SlotGuard(&self.active);

        let (reply, answer) = oneshot::channel();
        let form = FormState::open(defaults.as_ref(), reply);
        // On send failure the form comes back inside the error and is dropped here.
        self.tx
            .send(UiEvent::OpenForm(form))
            .map_err(|_| FormError::Closed)?;
        debug!("task form opened");

        let result = answer.await.map_err(|_| FormError::Closed);
        debug!(submitted = matches!(result, Ok(Some(_))), "task form closed");
        result
    }
}

/// For single-shot mode, where there is nowhere to draw a dialog.
pub struct NoPrompt;

#[async_trait]
impl FormPrompt for NoPrompt {
    async fn acquire(
        &self,
        _defaults: Option<TaskFormValues>,
    ) -> Result<Option<TaskFormValues>, FormError> {
        Err(FormError::Unavailable)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ── Dialog surface ────────────────────────────────────────────────────────────

pub struct FormState {
    pub heading: &'static str,
    values: [String; 5],
    pub focused: usize,
    reply: Option<oneshot::Sender<Option<TaskFormValues>>>,
}

impl std::fmt::Debug for FormState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormState")
            .field("heading", &self.heading)
            .field("values", &self.values)
            .field("focused", &self.focused)
            .finish()
    }
}

impl FormState {
    /// Fields present in `defaults` are pre-filled; the rest start empty.
    pub fn open(
        defaults: Option<&TaskFormValues>,
        reply: oneshot::Sender<Option<TaskFormValues>>,
    ) -> Self {
        let values = FormField::ALL.map(|f| {
            defaults
                .and_then(|d| d.get(f))
                .unwrap_or_default()
                .to_string()
        });
        Self {
            heading: if defaults.is_some() { " Edit task " } else { " New task " },
            values,
            focused: 0,
            reply: Some(reply),
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        &self.values[field as usize]
    }

    pub fn focused_field(&self) -> FormField {
        FormField::ALL[self.focused]
    }

    pub fn insert_char(&mut self, c: char) {
        self.values[self.focused].push(c);
    }

    pub fn backspace(&mut self) {
        self.values[self.focused].pop();
    }

    pub fn next_field(&mut self) {
        self.focused = (self.focused + 1) % FormField::ALL.len();
    }

    pub fn prev_field(&mut self) {
        self.focused = (self.focused + FormField::ALL.len() - 1) % FormField::ALL.len();
    }

    /// Every field's current text, empty fields included.
    pub fn collect(&self) -> TaskFormValues {
        let mut out = TaskFormValues::default();
        for field in FormField::ALL {
            out.set(field, self.value(field));
        }
        out
    }

    pub fn submit(mut self) {
        let values = self.collect();
        self.resolve(Some(values));
    }

    pub fn cancel(mut self) {
        self.resolve(None);
    }

    fn resolve(&mut self, outcome: Option<TaskFormValues>) {
        if let Some(reply) = self.reply.take() {
            // The acquirer may have gone away (worker shut down); nothing to tell.
            let _ = reply.send(outcome);
        }
    }
}

impl Drop for FormState {
    fn drop(&mut self) {
        self.resolve(None);
    }
}
