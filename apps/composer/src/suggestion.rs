//! Suggestion Coordinator — per-control state for "help me improve" requests.
//!
//! ```text
//! Idle ──begin──▶ Busy ──complete(Ok)──▶ Ready ──accept/dismiss──▶ Idle
//!                  │
//!                  └──complete(Err)──▶ Failed ──begin (retry)──▶ Busy
//! ```
//!
//! The coordinator never touches the record. Accepting hands the candidate
//! back to the composer, which applies it as an ordinary edit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::index::ControlId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestionError {
    #[error("a suggestion request is already pending for {0}")]
    Busy(String),

    #[error("field {0} does not support suggestions")]
    NotEligible(String),

    #[error("control {0} no longer exists")]
    UnknownControl(String),

    #[error("no suggestion is available for {0}")]
    NoCandidate(String),

    #[error("suggestion service failed: {0}")]
    Service(String),
}

/// Handle for one in-flight request. Only the newest ticket for a control in
/// the current epoch can complete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub id: Uuid,
    pub control: ControlId,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SuggestionStatus {
    Idle,
    Busy,
    Ready {
        candidate: String,
        received_at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Stored,
    Failed,
    /// The ticket was stale: the form was reset, the control was rebuilt, or
    /// the request was dismissed while in flight.
    Dropped,
}

#[derive(Debug, Clone)]
enum Slot {
    Busy { ticket: Uuid },
    Ready {
        candidate: String,
        received_at: DateTime<Utc>,
    },
    Failed { message: String },
}

#[derive(Debug, Default)]
pub struct SuggestionCoordinator {
    epoch: u64,
    slots: HashMap<ControlId, Slot>,
}

impl SuggestionCoordinator {
    pub fn begin(&mut self, control: ControlId) -> Result<SuggestionTicket, SuggestionError> {
        if let Some(Slot::Busy { .. }) = self.slots.get(&control) {
            return Err(SuggestionError::Busy(control.address.to_string()));
        }
        let id = Uuid::new_v4();
        self.slots.insert(control.clone(), Slot::Busy { ticket: id });
        debug!(control = %control.address, ticket = %id, "Suggestion request started");
        Ok(SuggestionTicket {
            id,
            control,
            epoch: self.epoch,
        })
    }

    pub fn complete(
        &mut self,
        ticket: &SuggestionTicket,
        result: Result<String, String>,
    ) -> Completion {
        if ticket.epoch != self.epoch {
            debug!(ticket = %ticket.id, "Dropping suggestion from a previous form session");
            return Completion::Dropped;
        }
        match self.slots.get(&ticket.control) {
            Some(Slot::Busy { ticket: id }) if *id == ticket.id => {}
            _ => {
                debug!(ticket = %ticket.id, "Dropping suggestion for a control that moved on");
                return Completion::Dropped;
            }
        }
        match result {
            Ok(candidate) => {
                info!(control = %ticket.control.address, "Suggestion ready");
                self.slots.insert(
                    ticket.control.clone(),
                    Slot::Ready {
                        candidate,
                        received_at: Utc::now(),
                    },
                );
                Completion::Stored
            }
            Err(message) => {
                warn!(control = %ticket.control.address, "Suggestion failed: {message}");
                self.slots
                    .insert(ticket.control.clone(), Slot::Failed { message });
                Completion::Failed
            }
        }
    }

    /// Removes and returns the candidate for `control`.
    pub fn take_candidate(&mut self, control: &ControlId) -> Result<String, SuggestionError> {
        match self.slots.remove(control) {
            Some(Slot::Ready { candidate, .. }) => Ok(candidate),
            Some(other) => {
                self.slots.insert(control.clone(), other);
                Err(SuggestionError::NoCandidate(control.address.to_string()))
            }
            None => Err(SuggestionError::NoCandidate(control.address.to_string())),
        }
    }

    /// Discards whatever the control holds. A request still in flight will be
    /// dropped when it completes.
    pub fn dismiss(&mut self, control: &ControlId) -> bool {
        self.slots.remove(control).is_some()
    }

    pub fn copy(&self, control: &ControlId) -> Result<&str, SuggestionError> {
        match self.slots.get(control) {
            Some(Slot::Ready { candidate, .. }) => Ok(candidate),
            _ => Err(SuggestionError::NoCandidate(control.address.to_string())),
        }
    }

    pub fn status(&self, control: &ControlId) -> SuggestionStatus {
        match self.slots.get(control) {
            None => SuggestionStatus::Idle,
            Some(Slot::Busy { .. }) => SuggestionStatus::Busy,
            Some(Slot::Ready {
                candidate,
                received_at,
            }) => SuggestionStatus::Ready {
                candidate: candidate.clone(),
                received_at: *received_at,
            },
            Some(Slot::Failed { message }) => SuggestionStatus::Failed {
                message: message.clone(),
            },
        }
    }

    /// Every control that is not idle, ordered by address.
    pub fn statuses(&self) -> Vec<(ControlId, SuggestionStatus)> {
        let mut all: Vec<_> = self
            .slots
            .keys()
            .map(|control| (control.clone(), self.status(control)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Forgets every control's state and invalidates outstanding tickets.
    pub fn invalidate_all(&mut self) {
        self.epoch += 1;
        self.slots.clear();
    }

    /// Keeps only the controls for which `live` holds.
    pub fn retain_live(&mut self, mut live: impl FnMut(&ControlId) -> bool) {
        self.slots.retain(|control, _| live(control));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldAddress, ScalarKey};

    fn summary() -> ControlId {
        ControlId::scalar(FieldAddress::Scalar(ScalarKey::Summary))
    }

    #[test]
    fn test_second_request_on_same_control_is_rejected() {
        let mut coordinator = SuggestionCoordinator::default();
        coordinator.begin(summary()).unwrap();
        assert!(matches!(
            coordinator.begin(summary()),
            Err(SuggestionError::Busy(_))
        ));
        assert_eq!(coordinator.status(&summary()), SuggestionStatus::Busy);
    }

    #[test]
    fn test_completion_holds_candidate_until_accepted() {
        let mut coordinator = SuggestionCoordinator::default();
        let ticket = coordinator.begin(summary()).unwrap();
        assert_eq!(
            coordinator.complete(&ticket, Ok("Better".into())),
            Completion::Stored
        );
        assert_eq!(coordinator.copy(&summary()).unwrap(), "Better");
        assert_eq!(coordinator.take_candidate(&summary()).unwrap(), "Better");
        assert_eq!(coordinator.status(&summary()), SuggestionStatus::Idle);
    }

    #[test]
    fn test_failure_is_surfaced_and_retry_allowed() {
        let mut coordinator = SuggestionCoordinator::default();
        let ticket = coordinator.begin(summary()).unwrap();
        assert_eq!(
            coordinator.complete(&ticket, Err("timeout".into())),
            Completion::Failed
        );
        assert_eq!(
            coordinator.status(&summary()),
            SuggestionStatus::Failed {
                message: "timeout".into()
            }
        );
        assert!(coordinator.take_candidate(&summary()).is_err());
        assert!(coordinator.begin(summary()).is_ok());
    }

    #[test]
    fn test_completion_after_reset_is_dropped() {
        let mut coordinator = SuggestionCoordinator::default();
        let ticket = coordinator.begin(summary()).unwrap();
        coordinator.invalidate_all();
        assert_eq!(
            coordinator.complete(&ticket, Ok("late".into())),
            Completion::Dropped
        );
        assert_eq!(coordinator.status(&summary()), SuggestionStatus::Idle);
    }

    #[test]
    fn test_dismiss_while_busy_drops_late_completion() {
        let mut coordinator = SuggestionCoordinator::default();
        let ticket = coordinator.begin(summary()).unwrap();
        assert!(coordinator.dismiss(&summary()));
        assert_eq!(
            coordinator.complete(&ticket, Ok("late".into())),
            Completion::Dropped
        );
    }

    #[test]
    fn test_copy_without_candidate_fails() {
        let coordinator = SuggestionCoordinator::default();
        assert!(matches!(
            coordinator.copy(&summary()),
            Err(SuggestionError::NoCandidate(_))
        ));
    }

    #[test]
    fn test_retain_live_discards_dead_controls() {
        let mut coordinator = SuggestionCoordinator::default();
        coordinator.begin(summary()).unwrap();
        coordinator.retain_live(|_| false);
        assert!(coordinator.statuses().is_empty());
    }
}
