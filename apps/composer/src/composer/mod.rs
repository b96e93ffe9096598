//! Composer — the single mutation pipeline.
//!
//! Every user intent arrives as a [`Command`]. `dispatch` runs
//! mutate → render → persist to completion before it returns, so callers that
//! serialize access (the HTTP layer holds one `tokio::sync::Mutex`) never see
//! a half-applied change. Structural commands rebuild the affected section's
//! descriptors inside the same call.

pub mod binder;
pub mod handlers;
pub mod index;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::llm_client::TextImprover;
use crate::models::{Record, ScalarKey, Section};
use crate::persistence::PersistenceGateway;
use crate::render::{self, Style};
use crate::suggestion::{
    Completion, SuggestionCoordinator, SuggestionError, SuggestionStatus, SuggestionTicket,
};

use binder::{FieldBinder, FormView};
use index::{CollectionIndex, ControlId, RemoveControl};
use store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit { control: ControlId, value: String },
    AddEntry { section: Section },
    RemoveEntry { control: RemoveControl },
    SetStyle { style: Style },
    SetProfilePicture { data_url: String },
    AcceptSuggestion { control: ControlId },
    /// Clears the form back to a blank record.
    Reset,
    /// Re-reads the record from the persistence slot.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// False when the command hit a stale address and changed nothing.
    pub applied: bool,
    pub revision: u64,
    pub style: Style,
    /// Ordinal of the entry created by `AddEntry`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposerStatus {
    pub revision: u64,
    pub style: Style,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub entry_counts: Vec<(Section, usize)>,
}

pub struct Composer {
    store: RecordStore,
    index: CollectionIndex,
    binder: FieldBinder,
    suggestions: SuggestionCoordinator,
    persistence: PersistenceGateway,
    style: Style,
    preview: String,
}

impl Composer {
    /// Hydrates from the persistence slot (blank record when absent or corrupt)
    /// and renders the initial preview.
    pub fn open(persistence: PersistenceGateway, style: Style) -> Self {
        let record = persistence.load_or_default();
        let store = RecordStore::new(record);
        let index = CollectionIndex::from_record(store.get());
        let binder = FieldBinder::bind_all(&store, &index);
        let preview = render::render(store.get(), style);
        Self {
            store,
            index,
            binder,
            suggestions: SuggestionCoordinator::default(),
            persistence,
            style,
            preview,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, SuggestionError> {
        debug!(?command, "Dispatching command");
        let mut ordinal = None;
        let mut restyled = false;
        let mut persist = true;

        let applied = match command {
            Command::Edit { control, value } => {
                self.binder
                    .edit(&control, value, &mut self.store, &self.index)
            }
            Command::AddEntry { section } => {
                ordinal = Some(
                    self.binder
                        .add(section, &mut self.store, &mut self.index),
                );
                true
            }
            Command::RemoveEntry { control } => {
                let removed = self
                    .binder
                    .remove(&control, &mut self.store, &mut self.index);
                if removed {
                    let index = &self.index;
                    self.suggestions
                        .retain_live(|c| index.resolve(c).is_some());
                }
                removed
            }
            Command::SetStyle { style } => {
                restyled = self.style != style;
                self.style = style;
                true
            }
            Command::SetProfilePicture { data_url } => {
                self.store.set_scalar(ScalarKey::ProfilePicture, data_url);
                true
            }
            Command::AcceptSuggestion { control } => {
                if self.index.resolve(&control).is_none() {
                    self.suggestions.dismiss(&control);
                    return Err(SuggestionError::UnknownControl(control.address.to_string()));
                }
                let candidate = self.suggestions.take_candidate(&control)?;
                self.binder
                    .edit(&control, candidate, &mut self.store, &self.index)
            }
            Command::Reset => {
                self.replace_record(Record::default());
                true
            }
            Command::Reload => {
                let record = self.persistence.load_or_default();
                self.replace_record(record);
                persist = false;
                true
            }
        };

        self.commit(restyled, persist);

        Ok(Outcome {
            applied,
            revision: self.store.revision(),
            style: self.style,
            ordinal,
        })
    }

    /// Render and persist after a mutation. Nothing happens when the store is
    /// clean and the style did not change.
    fn commit(&mut self, restyled: bool, persist: bool) {
        let dirty = self.store.take_dirty();
        if !dirty && !restyled {
            return;
        }
        self.preview = render::render(self.store.get(), self.style);
        if dirty && persist {
            self.persistence.save(self.store.get());
        }
    }

    fn replace_record(&mut self, record: Record) {
        self.store.replace(record);
        self.index.sync_all(self.store.get());
        self.binder = FieldBinder::bind_all(&self.store, &self.index);
        self.suggestions.invalidate_all();
        info!(revision = self.store.revision(), "Form rebuilt from a new record");
    }

    // ── suggestions ────────────────────────────────────────────────────────

    /// Marks the control busy and returns the ticket plus the text to improve.
    pub fn begin_suggestion(
        &mut self,
        control: ControlId,
    ) -> Result<(SuggestionTicket, String), SuggestionError> {
        if self.index.resolve(&control).is_none() {
            return Err(SuggestionError::UnknownControl(control.address.to_string()));
        }
        let descriptor = self
            .binder
            .descriptor(&control)
            .ok_or_else(|| SuggestionError::UnknownControl(control.address.to_string()))?;
        if !descriptor.suggestible {
            return Err(SuggestionError::NotEligible(control.address.to_string()));
        }
        let text = descriptor.value.clone();
        let ticket = self.suggestions.begin(control)?;
        Ok((ticket, text))
    }

    /// Stores the outcome of a remote call. Completions for controls that
    /// were torn down in the meantime are dropped.
    pub fn finish_suggestion(
        &mut self,
        ticket: &SuggestionTicket,
        result: Result<String, String>,
    ) -> Completion {
        if self.index.resolve(&ticket.control).is_none() {
            self.suggestions.dismiss(&ticket.control);
            return Completion::Dropped;
        }
        self.suggestions.complete(ticket, result)
    }

    pub fn dismiss_suggestion(&mut self, control: &ControlId) -> bool {
        self.suggestions.dismiss(control)
    }

    pub fn copy_suggestion(&self, control: &ControlId) -> Result<String, SuggestionError> {
        self.suggestions.copy(control).map(str::to_string)
    }

    pub fn suggestion_status(&self, control: &ControlId) -> SuggestionStatus {
        self.suggestions.status(control)
    }

    pub fn suggestion_statuses(&self) -> Vec<(ControlId, SuggestionStatus)> {
        self.suggestions.statuses()
    }

    // ── read side ──────────────────────────────────────────────────────────

    pub fn record(&self) -> &Record {
        self.store.get()
    }

    /// The bound form, with each suggestible field's request state.
    pub fn form(&self) -> FormView {
        let mut form = self.binder.view(&self.store);
        for field in form.fields_mut().filter(|f| f.suggestible) {
            field.suggestion = Some(self.suggestions.status(&field.control));
        }
        form
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Renders another style without changing the selected one.
    pub fn preview_as(&self, style: Style) -> String {
        render::render(self.store.get(), style)
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn status(&self) -> ComposerStatus {
        ComposerStatus {
            revision: self.store.revision(),
            style: self.style,
            last_saved_at: self.persistence.last_saved_at(),
            entry_counts: Section::ALL
                .iter()
                .map(|&s| (s, self.store.get().len(s)))
                .collect(),
        }
    }
}

/// Runs one "help me improve" request against `improver`.
///
/// The composer lock is held only to start and to finish the request, so
/// the rest of the form stays editable while the remote call is pending.
/// The remote call runs on its own task and always reports back, so a
/// caller that goes away mid-request never leaves the control busy.
pub async fn request_suggestion(
    composer: Arc<Mutex<Composer>>,
    improver: Arc<dyn TextImprover>,
    control: ControlId,
    timeout: Duration,
) -> Result<SuggestionStatus, SuggestionError> {
    let (ticket, text) = composer.lock().await.begin_suggestion(control)?;

    let worker = {
        let composer = composer.clone();
        let ticket = ticket.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, improver.improve(&text)).await {
                Ok(Ok(improved)) => Ok(improved),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
            };
            composer.lock().await.finish_suggestion(&ticket, result)
        })
    };

    let completion = match worker.await {
        Ok(completion) => completion,
        Err(e) => {
            warn!(control = %ticket.control.address, "Suggestion task aborted: {e}");
            composer.lock().await.dismiss_suggestion(&ticket.control);
            return Err(SuggestionError::Service("suggestion task aborted".to_string()));
        }
    };

    let composer = composer.lock().await;
    match completion {
        Completion::Dropped => Err(SuggestionError::UnknownControl(
            ticket.control.address.to_string(),
        )),
        Completion::Failed => match composer.suggestion_status(&ticket.control) {
            SuggestionStatus::Failed { message } => Err(SuggestionError::Service(message)),
            other => Ok(other),
        },
        Completion::Stored => Ok(composer.suggestion_status(&ticket.control)),
    }
}
