//! Trigger surface: one "AI" control per eligible editor field.
//!
//! A generation runs in three phases so the network call can overlap with
//! other fields:
//! - [`TriggerSurface::begin`] asks the operator for a prompt (blocking) and
//!   marks the control busy
//! - [`dispatch`] sends the prompt through a [`RelayClient`]
//! - [`TriggerSurface::complete`] re-enables the control and writes the
//!   result into the field, or alerts the operator
//!
//! [`TriggerSurface::activate`] runs all three back to back.

mod client;
mod document;
pub mod terminal;

pub use client::{HttpRelayClient, LocalRelayClient, RelayClient};
pub use document::{Document, Field, FieldKind};

use crate::relay::Envelope;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PROMPT_MESSAGE: &str = "Enter your content prompt for AI:";
pub const TRANSPORT_ALERT: &str = "Relay error. Check the log for details.";

/// Blocking modal input. `None` means the operator cancelled.
pub trait PromptSource {
    fn ask(&mut self, field: &Field, message: &str) -> Option<String>;
}

/// Operator-visible alerts.
pub trait Notifier {
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Ready,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: FieldKind,
    pub state: ControlState,
}

/// Field id → control. Built by scanning; a field is never registered twice.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    controls: BTreeMap<String, Control>,
}

impl ControlRegistry {
    pub fn get(&self, field_id: &str) -> Option<&Control> {
        self.controls.get(field_id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    fn set_state(&mut self, field_id: &str, state: ControlState) {
        if let Some(c) = self.controls.get_mut(field_id) {
            c.state = state;
        }
    }
}

/// Prompt collected for a field; the control is busy until completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub field_id: String,
    pub prompt: String,
}

#[derive(Debug)]
pub struct Completion {
    pub field_id: String,
    pub reply: anyhow::Result<Envelope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No ready control for the field.
    Skipped,
    /// Empty or cancelled prompt; nothing was sent.
    Aborted,
    Filled,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TriggerSurface {
    title_class: String,
    registry: ControlRegistry,
}

impl TriggerSurface {
    pub fn new(title_class: impl Into<String>) -> Self {
        Self {
            title_class: title_class.into(),
            registry: ControlRegistry::default(),
        }
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Attach a control to every eligible field that lacks one.
    /// Returns how many were attached.
    pub fn scan(&mut self, doc: &Document) -> usize {
        let mut attached = 0;
        for field in &doc.fields {
            if self.registry.controls.contains_key(&field.id) {
                continue;
            }
            let Some(kind) = field.kind(&self.title_class) else {
                continue;
            };
            self.registry.controls.insert(
                field.id.clone(),
                Control {
                    kind,
                    state: ControlState::Ready,
                },
            );
            attached += 1;
        }
        tracing::debug!(attached, total = self.registry.len(), "scanned document");
        attached
    }

    /// Ask for a prompt. On success the control goes busy.
    pub fn begin(
        &mut self,
        doc: &Document,
        field_id: &str,
        prompts: &mut dyn PromptSource,
    ) -> Result<PendingGeneration, Outcome> {
        let ready = matches!(
            self.registry.get(field_id),
            Some(Control {
                state: ControlState::Ready,
                ..
            })
        );
        let field = doc.field(field_id).filter(|_| ready).ok_or(Outcome::Skipped)?;

        let prompt = prompts.ask(field, PROMPT_MESSAGE).unwrap_or_default();
        if prompt.is_empty() {
            return Err(Outcome::Aborted);
        }

        self.registry.set_state(field_id, ControlState::Busy);
        Ok(PendingGeneration {
            field_id: field_id.to_string(),
            prompt,
        })
    }

    /// Re-enable the control and apply the reply.
    pub fn complete(&mut self, doc: &mut Document, completion: Completion, notifier: &mut dyn Notifier) -> Outcome {
        self.registry.set_state(&completion.field_id, ControlState::Ready);

        let envelope = match completion.reply {
            Ok(env) => env,
            Err(e) => {
                tracing::error!(field = %completion.field_id, error = %format!("{e:#}"), "relay call failed");
                notifier.alert(TRANSPORT_ALERT);
                return Outcome::Failed;
            }
        };

        if !envelope.success {
            let message = envelope.message().filter(|m| !m.is_empty()).unwrap_or("Unknown error");
            notifier.alert(&format!("Error: {message}"));
            return Outcome::Failed;
        }

        let Some(field) = doc.field_mut(&completion.field_id) else {
            return Outcome::Skipped;
        };
        // Whole-value overwrite; re-trigger to refine.
        field.value = envelope.content().unwrap_or_default().to_string();
        Outcome::Filled
    }

    pub async fn activate(
        &mut self,
        doc: &mut Document,
        field_id: &str,
        prompts: &mut dyn PromptSource,
        relay: Arc<dyn RelayClient>,
        notifier: &mut dyn Notifier,
    ) -> Outcome {
        let pending = match self.begin(doc, field_id, prompts) {
            Ok(p) => p,
            Err(outcome) => return outcome,
        };
        let completion = dispatch(relay, pending).await;
        self.complete(doc, completion, notifier)
    }
}

/// Network phase. Owns everything it needs so it can be spawned.
pub async fn dispatch(relay: Arc<dyn RelayClient>, pending: PendingGeneration) -> Completion {
    let reply = relay.submit(&pending.prompt).await;
    Completion {
        field_id: pending.field_id,
        reply,
    }
}
