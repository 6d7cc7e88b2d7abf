use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::edges::Workflow;
use super::machine::{
    ApprovalEffect, ApprovalEvent, ApprovalMachine, ApprovalState, TransitionRecord,
};
use crate::domain::{ApprovalCard, ClientStatus};
use crate::errors::{AppError, WorkflowError};
use crate::notice::Notice;
use crate::observability::OperationTimer;
use crate::remote::RemoteStore;
use crate::telemetry::{create_action_span, generate_correlation_id};

/// One kanban column; the status doubles as the column identity
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub status: ClientStatus,
    pub cards: Vec<ApprovalCard>,
}

impl BoardColumn {
    pub fn title(&self) -> &'static str {
        self.status.column_title()
    }
}

fn empty_columns() -> Vec<BoardColumn> {
    ClientStatus::ALL
        .iter()
        .map(|&status| BoardColumn {
            status,
            cards: Vec::new(),
        })
        .collect()
}

/// Approval board state plus the actions that mutate it.
///
/// Each card seen on the board keeps its state machine for as long as the
/// board lives, so the transitions made through it can be audited.
pub struct ApprovalBoard {
    store: Arc<dyn RemoteStore>,
    actor: String,
    workflow: Workflow,
    columns: Vec<BoardColumn>,
    machines: HashMap<Uuid, ApprovalMachine>,
}

impl ApprovalBoard {
    /// `actor` is recorded as the approver on confirm-release
    pub fn new(store: Arc<dyn RemoteStore>, actor: impl Into<String>) -> Self {
        Self {
            store,
            actor: actor.into(),
            workflow: Workflow::default(),
            columns: empty_columns(),
            machines: HashMap::new(),
        }
    }

    /// Fetch approvals and workflow edges together and regroup the columns.
    ///
    /// On failure the current columns are kept.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let timer = OperationTimer::new("board.load");
        let (cards, edges) =
            tokio::try_join!(self.store.list_approvals(), self.store.list_workflow())?;

        let mut columns = empty_columns();
        for card in &cards {
            self.machines
                .entry(card.id())
                .or_insert_with(|| ApprovalMachine::new(card.id(), card.status()))
                .sync(card.status());
        }
        for card in cards {
            let index = ClientStatus::ALL
                .iter()
                .position(|status| *status == card.status())
                .unwrap_or_default();
            columns[index].cards.push(card);
        }
        for column in &mut columns {
            column.cards.sort_by(|a, b| a.client.code.cmp(&b.client.code));
        }

        self.columns = columns;
        self.workflow = Workflow::from_edges(edges);
        timer.finish();
        Ok(())
    }

    pub fn columns(&self) -> &[BoardColumn] {
        &self.columns
    }

    pub fn column(&self, status: ClientStatus) -> &[ApprovalCard] {
        self.columns
            .iter()
            .find(|column| column.status == status)
            .map(|column| column.cards.as_slice())
            .unwrap_or_default()
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Transitions applied to `approval_id` through this board, oldest first.
    /// Kept after the card is cleared.
    pub fn history(&self, approval_id: Uuid) -> &[TransitionRecord] {
        self.machines
            .get(&approval_id)
            .map(ApprovalMachine::history)
            .unwrap_or_default()
    }

    /// Working copy of a card's machine; stored back only once the remote
    /// write succeeded
    fn machine_for(&self, approval_id: Uuid, status: ClientStatus) -> ApprovalMachine {
        let mut machine = self
            .machines
            .get(&approval_id)
            .cloned()
            .unwrap_or_else(|| ApprovalMachine::new(approval_id, status));
        machine.sync(status);
        machine
    }

    pub fn find(&self, approval_id: Uuid) -> Option<&ApprovalCard> {
        self.columns
            .iter()
            .flat_map(|column| column.cards.iter())
            .find(|card| card.id() == approval_id)
    }

    /// Cancelled or blocked back to the "to release" column
    pub async fn release(&mut self, approval_id: Uuid) -> Notice {
        self.apply(approval_id, ApprovalEvent::Release).await
    }

    /// Pending to active, stamped with the acting user
    pub async fn confirm_release(&mut self, approval_id: Uuid) -> Notice {
        let event = ApprovalEvent::ConfirmRelease {
            by: self.actor.clone(),
            at: Utc::now(),
        };
        self.apply(approval_id, event).await
    }

    /// One step back along the workflow
    pub async fn restore(&mut self, approval_id: Uuid) -> Notice {
        self.apply(approval_id, ApprovalEvent::Restore).await
    }

    /// Remove a released client from the board
    pub async fn clear(&mut self, approval_id: Uuid) -> Notice {
        self.apply(approval_id, ApprovalEvent::Clear).await
    }

    async fn apply(&mut self, approval_id: Uuid, event: ApprovalEvent) -> Notice {
        let correlation_id = generate_correlation_id();
        let span = create_action_span(
            event.name(),
            Some(&approval_id.to_string()),
            Some(&correlation_id),
        );

        async move {
            match self.perform(approval_id, event).await {
                Ok(message) => self.reload_after(message).await,
                Err(err) => {
                    warn!(error = %err, "Board action rejected");
                    Notice::from_error(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn perform(&mut self, approval_id: Uuid, event: ApprovalEvent) -> Result<String, AppError> {
        let card = self
            .find(approval_id)
            .ok_or(WorkflowError::UnknownApproval(approval_id))?;
        let from = card.status();
        let name = card.client.trade_name.clone();

        let mut machine = self.machine_for(approval_id, from);
        let transition = machine.handle_event(event)?;

        let message = match (&transition.to, &transition.effect) {
            (ApprovalState::Listed(to), ApprovalEffect::Update(patch)) => {
                self.workflow.check(from, *to)?;
                self.store.update_approval(approval_id, from, patch).await?;
                info!(%approval_id, %from, to = %to, "Approval updated");
                format!("{name} moved to {}", to.column_title())
            }
            (_, ApprovalEffect::Delete) => {
                self.store.delete_approval(approval_id, from).await?;
                info!(%approval_id, "Approval cleared");
                format!("{name} cleared from the board")
            }
            (ApprovalState::Cleared, ApprovalEffect::Update(_)) => {
                return Err(WorkflowError::UnknownApproval(approval_id).into());
            }
        };

        self.machines.insert(approval_id, machine);
        Ok(message)
    }

    async fn reload_after(&mut self, message: String) -> Notice {
        match self.load().await {
            Ok(()) => Notice::success(message),
            Err(err) => Notice::error(format!("{message}, but reloading the board failed: {err}")),
        }
    }

    /// Drag-and-drop a card onto the column of `target`.
    ///
    /// Same column is a no-op; a missing edge is rejected locally; a remote
    /// failure reloads the board so it reflects what was actually stored.
    pub async fn move_card(&mut self, approval_id: Uuid, target: ClientStatus) -> Notice {
        let correlation_id = generate_correlation_id();
        let span = create_action_span("move", Some(&approval_id.to_string()), Some(&correlation_id));

        async move {
            let Some(card) = self.find(approval_id) else {
                return Notice::from_error(&WorkflowError::UnknownApproval(approval_id).into());
            };
            let from = card.status();
            if from == target {
                return Notice::info("Card is already in that column");
            }
            if let Err(err) = self.workflow.check(from, target) {
                warn!(%from, to = %target, "Move rejected by workflow");
                return Notice::from_error(&err.into());
            }

            let mut machine = self.machine_for(approval_id, from);
            let event = ApprovalEvent::Move {
                to: target,
                by: self.actor.clone(),
                at: Utc::now(),
            };
            let patch = match machine.handle_event(event) {
                Ok(transition) => match transition.effect {
                    ApprovalEffect::Update(patch) => patch,
                    ApprovalEffect::Delete => {
                        return Notice::from_error(&WorkflowError::UnknownApproval(approval_id).into())
                    }
                },
                Err(err) => return Notice::from_error(&err.into()),
            };

            match self.store.update_approval(approval_id, from, &patch).await {
                Ok(updated) => {
                    self.machines.insert(approval_id, machine);
                    self.place(approval_id, |card| card.approval = updated);
                    info!(%approval_id, %from, to = %target, "Card moved");
                    Notice::success("Client status updated")
                }
                Err(err) => {
                    let notice = Notice::from_error(&err.into());
                    if let Err(reload) = self.load().await {
                        warn!(error = %reload, "Reload after failed move also failed");
                    }
                    notice
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Apply a local edit to a card and re-file it under its new status
    fn place(&mut self, approval_id: Uuid, edit: impl FnOnce(&mut ApprovalCard)) {
        let mut taken = None;
        for column in &mut self.columns {
            if let Some(index) = column.cards.iter().position(|c| c.id() == approval_id) {
                taken = Some(column.cards.remove(index));
                break;
            }
        }
        let Some(mut card) = taken else { return };
        edit(&mut card);

        if let Some(column) = self.columns.iter_mut().find(|c| c.status == card.status()) {
            column.cards.push(card);
            column.cards.sort_by(|a, b| a.client.code.cmp(&b.client.code));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApprovalPatch, Client, ClientApproval, ClientPayload, DocumentType};
    use crate::errors::RemoteError;
    use crate::remote::{MemoryBackend, MockRemoteStore};

    async fn board_with(statuses: &[ClientStatus]) -> (MemoryBackend, ApprovalBoard, Vec<Uuid>) {
        let backend = MemoryBackend::new();
        let mut ids = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let client = backend
                .insert_client(&ClientPayload {
                    code: format!("C-{i:03}"),
                    document_type: DocumentType::Cnpj,
                    document: "11222333000181".to_string(),
                    razao_social: None,
                    nome_fantasia: format!("Loja {i}"),
                    observacao: String::new(),
                    status: Some(ClientStatus::Active),
                })
                .await
                .unwrap();
            let approval = backend
                .upsert_approval(client.id, &ApprovalPatch::unapproved(*status))
                .await
                .unwrap();
            ids.push(approval.id);
        }
        let mut board = ApprovalBoard::new(Arc::new(backend.clone()), "ana");
        board.load().await.unwrap();
        (backend, board, ids)
    }

    #[tokio::test]
    async fn load_groups_into_fixed_columns() {
        use ClientStatus::*;
        let (_, board, _) = board_with(&[Pending, Active, Blocked, Pending]).await;

        let titles: Vec<&str> = board.columns().iter().map(BoardColumn::title).collect();
        assert_eq!(titles, vec!["Cancelled", "Blocked", "To release", "Released"]);
        assert_eq!(board.column(Pending).len(), 2);
        assert_eq!(board.column(Cancelled).len(), 0);
    }

    #[tokio::test]
    async fn confirm_release_records_actor() {
        let (_, mut board, ids) = board_with(&[ClientStatus::Pending]).await;

        let notice = board.confirm_release(ids[0]).await;
        assert!(!notice.is_error(), "{notice}");

        let card = board.find(ids[0]).unwrap();
        assert_eq!(card.status(), ClientStatus::Active);
        assert_eq!(card.approval.approved_by.as_deref(), Some("ana"));
        assert!(card.approval.approved_at.is_some());
    }

    #[tokio::test]
    async fn invalid_action_makes_no_remote_call() {
        let (backend, mut board, ids) = board_with(&[ClientStatus::Blocked]).await;
        backend.clear_calls();

        let notice = board.clear(ids[0]).await;
        assert!(notice.is_error());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn move_to_same_column_is_a_no_op() {
        let (backend, mut board, ids) = board_with(&[ClientStatus::Pending]).await;
        backend.clear_calls();

        let notice = board.move_card(ids[0], ClientStatus::Pending).await;
        assert!(!notice.is_error());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_move_reloads_board() {
        let (backend, mut board, ids) = board_with(&[ClientStatus::Pending]).await;
        backend.clear_calls();
        backend.fail_next("update_approval", "connection reset");

        let notice = board.move_card(ids[0], ClientStatus::Active).await;
        assert!(notice.is_error());
        assert_eq!(notice.message, "connection reset");
        assert!(backend.calls().contains(&"list_approvals".to_string()));
        assert_eq!(board.find(ids[0]).unwrap().status(), ClientStatus::Pending);
    }

    #[tokio::test]
    async fn history_survives_reloads_and_clear() {
        let (_, mut board, ids) = board_with(&[ClientStatus::Blocked]).await;

        assert!(!board.release(ids[0]).await.is_error());
        assert!(!board.confirm_release(ids[0]).await.is_error());
        assert!(!board.clear(ids[0]).await.is_error());
        assert!(board.find(ids[0]).is_none());

        let history = board.history(ids[0]);
        let steps: Vec<(ApprovalState, ApprovalState)> = history
            .iter()
            .map(|record| (record.from_state, record.to_state))
            .collect();
        assert_eq!(
            steps,
            vec![
                (
                    ApprovalState::Listed(ClientStatus::Blocked),
                    ApprovalState::Listed(ClientStatus::Pending)
                ),
                (
                    ApprovalState::Listed(ClientStatus::Pending),
                    ApprovalState::Listed(ClientStatus::Active)
                ),
                (
                    ApprovalState::Listed(ClientStatus::Active),
                    ApprovalState::Cleared
                ),
            ]
        );
        assert!(matches!(
            history[1].event,
            ApprovalEvent::ConfirmRelease { ref by, .. } if by == "ana"
        ));
    }

    #[tokio::test]
    async fn moves_are_recorded_but_failed_writes_are_not() {
        let (backend, mut board, ids) = board_with(&[ClientStatus::Pending]).await;

        backend.fail_next("update_approval", "connection reset");
        assert!(board.move_card(ids[0], ClientStatus::Blocked).await.is_error());
        assert!(board.history(ids[0]).is_empty());

        assert!(!board.move_card(ids[0], ClientStatus::Blocked).await.is_error());
        let history = board.history(ids[0]);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to_state, ApprovalState::Listed(ClientStatus::Blocked));
        assert!(matches!(history[0].event, ApprovalEvent::Move { to: ClientStatus::Blocked, .. }));
    }

    fn pending_card() -> ApprovalCard {
        let client_id = Uuid::new_v4();
        ApprovalCard {
            approval: ClientApproval {
                id: Uuid::new_v4(),
                client_id,
                approval_status: ClientStatus::Pending,
                approved_by: None,
                approved_at: None,
            },
            client: Client {
                id: client_id,
                code: "C-001".to_string(),
                document_type: DocumentType::Cnpj,
                document: "11222333000181".to_string(),
                legal_name: None,
                trade_name: "Loja".to_string(),
                note: None,
                status: ClientStatus::Active,
                contacts: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn failed_move_keeps_columns_when_reload_also_fails() {
        let card = pending_card();
        let approval_id = card.id();

        let mut store = MockRemoteStore::new();
        let mut loads = 0;
        store.expect_list_approvals().times(2).returning(move || {
            loads += 1;
            if loads == 1 {
                Ok(vec![card.clone()])
            } else {
                Err(RemoteError::Transport("connection refused".to_string()))
            }
        });
        store
            .expect_list_workflow()
            .returning(|| Ok(Workflow::standard().edges().to_vec()));
        store
            .expect_update_approval()
            .times(1)
            .returning(|_, _, _| {
                Err(RemoteError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                })
            });

        let mut board = ApprovalBoard::new(Arc::new(store), "ana");
        board.load().await.unwrap();

        let notice = board.move_card(approval_id, ClientStatus::Active).await;
        assert!(notice.is_error());
        assert_eq!(notice.message, "service unavailable");
        assert_eq!(board.column(ClientStatus::Pending).len(), 1);
        assert!(board.history(approval_id).is_empty());
    }
}
