//! Client registry: listing, filtering, create/update/delete and the status
//! menu that routes clients onto the approval board.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::document::digits_only;
use crate::domain::{
    ApprovalPatch, Client, ClientInput, ClientPayload, ClientStatus, ClientView,
};
use crate::errors::{AppError, WorkflowError};
use crate::observability::OperationTimer;
use crate::remote::RemoteStore;
use crate::telemetry::{create_action_span, generate_correlation_id};
use crate::validation::validate_client_input;
use crate::workflow::Workflow;

/// Statuses the registry menu can set directly; `pending` is reached through the board
pub const MENU_TARGETS: [ClientStatus; 3] = [
    ClientStatus::Active,
    ClientStatus::Blocked,
    ClientStatus::Cancelled,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    /// Case-insensitive substring over trade name, code, document and legal name
    pub search: Option<String>,
    /// Matches the effective status
    pub status: Option<ClientStatus>,
}

impl ClientFilter {
    pub fn matches(&self, view: &ClientView) -> bool {
        if let Some(status) = self.status {
            if view.effective_status() != status {
                return false;
            }
        }

        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let client = &view.client;
        if is_document_query(needle) {
            let digits = digits_only(needle);
            if !digits.is_empty() && client.document.contains(&digits) {
                return true;
            }
        }

        let needle = needle.to_lowercase();
        [
            Some(client.trade_name.as_str()),
            Some(client.code.as_str()),
            Some(client.document.as_str()),
            client.legal_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Digits plus the punctuation of the CPF/CNPJ masks, as printed by the CLI
fn is_document_query(needle: &str) -> bool {
    needle
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '-' | ' '))
}

/// Statuses offered in a client's menu: the direct targets minus the current
/// status, restricted to what the workflow allows from there
pub fn status_menu(view: &ClientView, workflow: &Workflow) -> Vec<ClientStatus> {
    let current = view.effective_status();
    MENU_TARGETS
        .into_iter()
        .filter(|target| *target != current && workflow.allows(current, *target))
        .collect()
}

pub struct ClientRegistry {
    store: Arc<dyn RemoteStore>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Clients ordered by code, joined with their approvals and filtered
    pub async fn list(&self, filter: &ClientFilter) -> Result<Vec<ClientView>, AppError> {
        let timer = OperationTimer::new("registry.list");
        let (clients, approvals) =
            tokio::try_join!(self.store.list_clients(), self.store.list_approval_records())?;

        let mut by_client: HashMap<Uuid, _> = approvals
            .into_iter()
            .map(|approval| (approval.client_id, approval))
            .collect();

        let mut views: Vec<ClientView> = clients
            .into_iter()
            .map(|client| ClientView {
                approval: by_client.remove(&client.id),
                client,
            })
            .filter(|view| filter.matches(view))
            .collect();
        views.sort_by(|a, b| a.client.code.cmp(&b.client.code));

        timer.finish();
        Ok(views)
    }

    pub async fn get(&self, id: Uuid) -> Result<ClientView, AppError> {
        let (client, approval) =
            tokio::try_join!(self.store.get_client(id), self.store.find_approval(id))?;
        Ok(ClientView { client, approval })
    }

    /// Validate, insert the client as `active`, then its contacts
    pub async fn create(&self, input: &ClientInput) -> Result<Client, AppError> {
        let input = input.normalized();
        validate_client_input(&input)?;

        let span = create_action_span("client.create", None, Some(&generate_correlation_id()));
        async {
            let payload = ClientPayload::from_input(&input, Some(ClientStatus::Active));
            let mut client = self.store.insert_client(&payload).await?;
            self.store.insert_contacts(client.id, &input.contacts).await?;
            client.contacts = input.contacts.clone();
            info!(client = %client.id, code = %client.code, "Client created");
            Ok::<_, AppError>(client)
        }
        .instrument(span)
        .await
    }

    /// Validate, update the row and replace the whole contact set
    pub async fn update(&self, id: Uuid, input: &ClientInput) -> Result<Client, AppError> {
        let input = input.normalized();
        validate_client_input(&input)?;

        let span = create_action_span(
            "client.update",
            Some(&id.to_string()),
            Some(&generate_correlation_id()),
        );
        async {
            let payload = ClientPayload::from_input(&input, None);
            let mut client = self.store.update_client(id, &payload).await?;
            self.store.delete_contacts(id).await?;
            self.store.insert_contacts(id, &input.contacts).await?;
            client.contacts = input.contacts.clone();
            info!(client = %id, contacts = input.contacts.len(), "Client updated");
            Ok::<_, AppError>(client)
        }
        .instrument(span)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_client(id).await?;
        info!(client = %id, "Client deleted");
        Ok(())
    }

    /// Set a client's status from the registry menu.
    ///
    /// The write always lands on the client's approval record: an existing one
    /// is updated conditionally, a missing one is created, which puts the
    /// client on the board. `active` is stamped with `actor` like a board
    /// confirm-release; other targets clear the approver fields.
    pub async fn change_status(
        &self,
        id: Uuid,
        target: ClientStatus,
        actor: &str,
    ) -> Result<ClientView, AppError> {
        let (view, edges) = tokio::try_join!(self.get(id), async {
            self.store.list_workflow().await.map_err(AppError::from)
        })?;
        let workflow = Workflow::from_edges(edges);
        let current = view.effective_status();

        if current == target {
            return Err(WorkflowError::Unchanged(target).into());
        }
        if !MENU_TARGETS.contains(&target) {
            return Err(WorkflowError::InvalidTransition {
                from: current,
                action: "set this status on",
            }
            .into());
        }
        workflow.check(current, target)?;

        let patch = ApprovalPatch::for_target(target, actor, Utc::now());
        let approval = match &view.approval {
            Some(existing) => {
                self.store
                    .update_approval(existing.id, current, &patch)
                    .await?
            }
            None => self.store.upsert_approval(id, &patch).await?,
        };

        info!(client = %id, from = %current, to = %target, "Client status changed");
        Ok(ClientView {
            client: view.client,
            approval: Some(approval),
        })
    }
}
