use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{ApprovalPatch, ClientStatus};
use crate::errors::WorkflowError;

/// Where an approval record sits: on the board in some column, or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalState {
    Listed(ClientStatus),
    Cleared,
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalState::Listed(status) => write!(f, "{status}"),
            ApprovalState::Cleared => f.write_str("cleared"),
        }
    }
}

/// Board buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ApprovalEvent {
    Release,
    ConfirmRelease { by: String, at: DateTime<Utc> },
    Restore,
    Clear,
    /// Drag-and-drop onto another column; edges are checked by the board
    Move {
        to: ClientStatus,
        by: String,
        at: DateTime<Utc>,
    },
}

impl ApprovalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalEvent::Release => "release",
            ApprovalEvent::ConfirmRelease { .. } => "confirm release of",
            ApprovalEvent::Restore => "restore",
            ApprovalEvent::Clear => "clear",
            ApprovalEvent::Move { .. } => "move",
        }
    }
}

/// Remote write that realizes a transition
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalEffect {
    Update(ApprovalPatch),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: ClientStatus,
    pub to: ApprovalState,
    pub effect: ApprovalEffect,
}

/// Fixed one-step-back lookup used by restore
pub fn restore_target(status: ClientStatus) -> ClientStatus {
    match status {
        ClientStatus::Pending => ClientStatus::Blocked,
        ClientStatus::Active => ClientStatus::Pending,
        ClientStatus::Blocked => ClientStatus::Cancelled,
        ClientStatus::Cancelled => ClientStatus::Cancelled,
    }
}

/// Resolve an event against the current status without touching anything
pub fn plan(from: ClientStatus, event: &ApprovalEvent) -> Result<Transition, WorkflowError> {
    use ClientStatus::*;

    let (to, effect) = match (from, event) {
        (Cancelled | Blocked, ApprovalEvent::Release) => (
            ApprovalState::Listed(Pending),
            ApprovalEffect::Update(ApprovalPatch::unapproved(Pending)),
        ),
        (Pending, ApprovalEvent::ConfirmRelease { by, at }) => (
            ApprovalState::Listed(Active),
            ApprovalEffect::Update(ApprovalPatch::approved(by, *at)),
        ),
        (_, ApprovalEvent::Restore) => {
            let target = restore_target(from);
            (
                ApprovalState::Listed(target),
                ApprovalEffect::Update(ApprovalPatch::unapproved(target)),
            )
        }
        (Active, ApprovalEvent::Clear) => (ApprovalState::Cleared, ApprovalEffect::Delete),
        (_, ApprovalEvent::Move { to, by, at }) => (
            ApprovalState::Listed(*to),
            ApprovalEffect::Update(ApprovalPatch::for_target(*to, by, *at)),
        ),
        (from, event) => {
            return Err(WorkflowError::InvalidTransition {
                from,
                action: event.name(),
            })
        }
    };

    Ok(Transition { from, to, effect })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub from_state: ApprovalState,
    pub to_state: ApprovalState,
    pub event: ApprovalEvent,
    pub timestamp: DateTime<Utc>,
}

/// State machine for a single approval record, with an audit trail
#[derive(Debug, Clone)]
pub struct ApprovalMachine {
    approval_id: Uuid,
    state: ApprovalState,
    history: Vec<TransitionRecord>,
}

impl ApprovalMachine {
    pub fn new(approval_id: Uuid, status: ClientStatus) -> Self {
        Self {
            approval_id,
            state: ApprovalState::Listed(status),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> ApprovalState {
        self.state
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Follow a status change made elsewhere (another user, the registry)
    /// without recording it as a transition
    pub fn sync(&mut self, status: ClientStatus) {
        let observed = ApprovalState::Listed(status);
        if self.state != observed {
            debug!(
                approval = %self.approval_id,
                from_state = %self.state,
                to_state = %observed,
                "Approval changed remotely"
            );
            self.state = observed;
        }
    }

    /// Advance on `event`, returning the remote write to perform
    pub fn handle_event(&mut self, event: ApprovalEvent) -> Result<Transition, WorkflowError> {
        let from = match self.state {
            ApprovalState::Listed(status) => status,
            ApprovalState::Cleared => return Err(WorkflowError::UnknownApproval(self.approval_id)),
        };

        let transition = plan(from, &event)?;
        self.record_transition(transition.to, event);
        Ok(transition)
    }

    fn record_transition(&mut self, to: ApprovalState, event: ApprovalEvent) {
        let record = TransitionRecord {
            from_state: self.state,
            to_state: to,
            event,
            timestamp: Utc::now(),
        };

        info!(
            approval = %self.approval_id,
            from_state = %record.from_state,
            to_state = %record.to_state,
            event = record.event.name(),
            "Approval state transition"
        );

        self.history.push(record);
        self.state = to;
    }
}
