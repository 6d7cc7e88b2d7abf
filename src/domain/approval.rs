use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::Client;
use crate::domain::status::ClientStatus;

/// Approval record tracked per client on the board (`client_approvals`).
///
/// When present, `approval_status` is the client's authoritative status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientApproval {
    pub id: Uuid,
    pub client_id: Uuid,
    pub approval_status: ClientStatus,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Approval joined with the client it belongs to, as shown on a board card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalCard {
    #[serde(flatten)]
    pub approval: ClientApproval,
    #[serde(rename = "clients")]
    pub client: Client,
}

impl ApprovalCard {
    pub fn id(&self) -> Uuid {
        self.approval.id
    }

    pub fn status(&self) -> ClientStatus {
        self.approval.approval_status
    }
}

/// Fields written by every approval mutation.
///
/// Approver fields serialize as explicit nulls so that leaving `active` clears them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalPatch {
    pub approval_status: ClientStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl ApprovalPatch {
    /// Move to `status` with approver fields cleared
    pub fn unapproved(status: ClientStatus) -> Self {
        Self {
            approval_status: status,
            approved_by: None,
            approved_at: None,
        }
    }

    /// Move to `active`, stamped with who approved and when
    pub fn approved(by: &str, at: DateTime<Utc>) -> Self {
        Self {
            approval_status: ClientStatus::Active,
            approved_by: Some(by.to_string()),
            approved_at: Some(at),
        }
    }

    /// Patch for an arbitrary target, stamping only when the target is `active`
    pub fn for_target(target: ClientStatus, actor: &str, now: DateTime<Utc>) -> Self {
        if target == ClientStatus::Active {
            Self::approved(actor, now)
        } else {
            Self::unapproved(target)
        }
    }

    pub fn apply_to(&self, approval: &mut ClientApproval) {
        approval.approval_status = self.approval_status;
        approval.approved_by = self.approved_by.clone();
        approval.approved_at = self.approved_at;
    }
}

/// Row of the `status_workflow` reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEdge {
    pub current_status: ClientStatus,
    pub next_status: ClientStatus,
}

impl StatusEdge {
    pub fn new(current_status: ClientStatus, next_status: ClientStatus) -> Self {
        Self {
            current_status,
            next_status,
        }
    }
}

/// A client together with its approval record, if it has been routed onto the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientView {
    pub client: Client,
    pub approval: Option<ClientApproval>,
}

impl ClientView {
    /// The approval's status wins over the baseline status stored on the client
    pub fn effective_status(&self) -> ClientStatus {
        self.approval
            .as_ref()
            .map(|approval| approval.approval_status)
            .unwrap_or(self.client.status)
    }
}
