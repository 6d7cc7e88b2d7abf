use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::{AuthService, RemoteStore, SignUp};
use crate::auth::session::{AuthUser, Session};
use crate::domain::{
    ApprovalCard, ApprovalPatch, Client, ClientApproval, ClientPayload, ClientStatus, Contact,
    Profile, StatusEdge,
};
use crate::errors::RemoteError;
use crate::workflow::Workflow;

#[derive(Debug, Default)]
struct MemoryState {
    clients: Vec<Client>,
    approvals: Vec<ClientApproval>,
    workflow: Vec<StatusEdge>,
    profiles: Vec<Profile>,
    users: Vec<(AuthUser, String)>,
    tokens: HashMap<String, Uuid>,
    failures: HashMap<String, String>,
    calls: Vec<String>,
}

impl MemoryState {
    /// Record the call and fire a failure queued with `fail_next`
    fn enter(&mut self, op: &str) -> Result<(), RemoteError> {
        self.calls.push(op.to_string());
        match self.failures.remove(op) {
            Some(message) => Err(RemoteError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    fn client_mut(&mut self, id: Uuid) -> Result<&mut Client, RemoteError> {
        self.clients
            .iter_mut()
            .find(|client| client.id == id)
            .ok_or_else(|| RemoteError::not_found("client", id))
    }

    fn ensure_unique_code(&self, code: &str, except: Option<Uuid>) -> Result<(), RemoteError> {
        let taken = self
            .clients
            .iter()
            .any(|client| client.code == code && Some(client.id) != except);
        if taken {
            return Err(RemoteError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint \"clients_code_key\""
                    .to_string(),
            });
        }
        Ok(())
    }

    fn approval_mut(
        &mut self,
        id: Uuid,
        expected: ClientStatus,
    ) -> Result<&mut ClientApproval, RemoteError> {
        let approval = self
            .approvals
            .iter_mut()
            .find(|approval| approval.id == id)
            .ok_or_else(|| RemoteError::not_found("approval", id))?;
        if approval.approval_status != expected {
            return Err(RemoteError::Conflict { expected });
        }
        Ok(approval)
    }

    fn issue_session(&mut self, user: AuthUser) -> Session {
        let access_token = format!("memory-{}", Uuid::new_v4());
        self.tokens.insert(access_token.clone(), user.id);
        Session {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user,
        }
    }
}

/// In-process stand-in for the hosted service, with the same constraints the
/// real tables enforce (unique client code, one approval per client,
/// conditional approval writes)
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty tables with the standard workflow edges
    pub fn new() -> Self {
        Self::with_workflow(Workflow::standard().edges().to_vec())
    }

    pub fn with_workflow(edges: Vec<StatusEdge>) -> Self {
        let state = MemoryState {
            workflow: edges,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call to `op` fail with `message`
    pub fn fail_next(&self, op: &str, message: &str) {
        self.lock()
            .failures
            .insert(op.to_string(), message.to_string());
    }

    /// Every operation invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Change an approval behind the caller's back, as another user would
    pub fn set_approval_status(&self, id: Uuid, status: ClientStatus) {
        if let Some(approval) = self.lock().approvals.iter_mut().find(|a| a.id == id) {
            approval.approval_status = status;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryBackend {
    async fn list_clients(&self) -> Result<Vec<Client>, RemoteError> {
        let mut state = self.lock();
        state.enter("list_clients")?;
        let mut clients = state.clients.clone();
        clients.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(clients)
    }

    async fn get_client(&self, id: Uuid) -> Result<Client, RemoteError> {
        let mut state = self.lock();
        state.enter("get_client")?;
        state.client_mut(id).map(|client| client.clone())
    }

    async fn insert_client(&self, payload: &ClientPayload) -> Result<Client, RemoteError> {
        let mut state = self.lock();
        state.enter("insert_client")?;
        state.ensure_unique_code(&payload.code, None)?;

        let client = Client {
            id: Uuid::new_v4(),
            code: payload.code.clone(),
            document_type: payload.document_type,
            document: payload.document.clone(),
            legal_name: payload.razao_social.clone(),
            trade_name: payload.nome_fantasia.clone(),
            note: Some(payload.observacao.clone()).filter(|note| !note.is_empty()),
            status: payload.status.unwrap_or(ClientStatus::Active),
            contacts: Vec::new(),
        };
        state.clients.push(client.clone());
        debug!(client = %client.id, "Inserted client");
        Ok(client)
    }

    async fn update_client(
        &self,
        id: Uuid,
        payload: &ClientPayload,
    ) -> Result<Client, RemoteError> {
        let mut state = self.lock();
        state.enter("update_client")?;
        state.ensure_unique_code(&payload.code, Some(id))?;

        let client = state.client_mut(id)?;
        client.code = payload.code.clone();
        client.document_type = payload.document_type;
        client.document = payload.document.clone();
        client.legal_name = payload.razao_social.clone();
        client.trade_name = payload.nome_fantasia.clone();
        client.note = Some(payload.observacao.clone()).filter(|note| !note.is_empty());
        if let Some(status) = payload.status {
            client.status = status;
        }
        Ok(client.clone())
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("delete_client")?;
        let before = state.clients.len();
        state.clients.retain(|client| client.id != id);
        if state.clients.len() == before {
            return Err(RemoteError::not_found("client", id));
        }
        state.approvals.retain(|approval| approval.client_id != id);
        Ok(())
    }

    async fn delete_contacts(&self, client_id: Uuid) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("delete_contacts")?;
        if let Ok(client) = state.client_mut(client_id) {
            client.contacts.clear();
        }
        Ok(())
    }

    async fn insert_contacts(
        &self,
        client_id: Uuid,
        contacts: &[Contact],
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("insert_contacts")?;
        state
            .client_mut(client_id)?
            .contacts
            .extend(contacts.iter().cloned());
        Ok(())
    }

    async fn list_approvals(&self) -> Result<Vec<ApprovalCard>, RemoteError> {
        let mut state = self.lock();
        state.enter("list_approvals")?;
        let cards = state
            .approvals
            .iter()
            .filter_map(|approval| {
                state
                    .clients
                    .iter()
                    .find(|client| client.id == approval.client_id)
                    .map(|client| ApprovalCard {
                        approval: approval.clone(),
                        client: client.clone(),
                    })
            })
            .collect();
        Ok(cards)
    }

    async fn list_approval_records(&self) -> Result<Vec<ClientApproval>, RemoteError> {
        let mut state = self.lock();
        state.enter("list_approval_records")?;
        Ok(state.approvals.clone())
    }

    async fn find_approval(&self, client_id: Uuid) -> Result<Option<ClientApproval>, RemoteError> {
        let mut state = self.lock();
        state.enter("find_approval")?;
        Ok(state
            .approvals
            .iter()
            .find(|approval| approval.client_id == client_id)
            .cloned())
    }

    async fn upsert_approval(
        &self,
        client_id: Uuid,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError> {
        let mut state = self.lock();
        state.enter("upsert_approval")?;
        state.client_mut(client_id)?;

        if let Some(existing) = state
            .approvals
            .iter_mut()
            .find(|approval| approval.client_id == client_id)
        {
            patch.apply_to(existing);
            return Ok(existing.clone());
        }

        let mut approval = ClientApproval {
            id: Uuid::new_v4(),
            client_id,
            approval_status: patch.approval_status,
            approved_by: None,
            approved_at: None,
        };
        patch.apply_to(&mut approval);
        state.approvals.push(approval.clone());
        Ok(approval)
    }

    async fn update_approval(
        &self,
        id: Uuid,
        expected: ClientStatus,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError> {
        let mut state = self.lock();
        state.enter("update_approval")?;
        let approval = state.approval_mut(id, expected)?;
        patch.apply_to(approval);
        Ok(approval.clone())
    }

    async fn delete_approval(&self, id: Uuid, expected: ClientStatus) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("delete_approval")?;
        state.approval_mut(id, expected)?;
        state.approvals.retain(|approval| approval.id != id);
        Ok(())
    }

    async fn list_workflow(&self) -> Result<Vec<StatusEdge>, RemoteError> {
        let mut state = self.lock();
        state.enter("list_workflow")?;
        Ok(state.workflow.clone())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RemoteError> {
        let mut state = self.lock();
        state.enter("get_profile")?;
        Ok(state.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("insert_profile")?;
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(RemoteError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint \"profiles_pkey\""
                    .to_string(),
            });
        }
        state.profiles.push(profile.clone());
        Ok(())
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let mut state = self.lock();
        state.enter("sign_in")?;
        let user = state
            .users
            .iter()
            .find(|(user, stored)| user.email.as_deref() == Some(email) && stored == password)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| RemoteError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;
        Ok(state.issue_session(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError> {
        let mut state = self.lock();
        state.enter("sign_up")?;
        if state
            .users
            .iter()
            .any(|(user, _)| user.email.as_deref() == Some(email))
        {
            return Err(RemoteError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        state.users.push((user.clone(), password.to_string()));
        let session = state.issue_session(user.clone());
        Ok(SignUp {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter("sign_out")?;
        state.tokens.remove(access_token);
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, RemoteError> {
        let mut state = self.lock();
        state.enter("current_user")?;
        let id = state
            .tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| RemoteError::Api {
                status: 401,
                message: "invalid JWT".to_string(),
            })?;
        state
            .users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| RemoteError::not_found("user", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentType;

    fn payload(code: &str) -> ClientPayload {
        ClientPayload {
            code: code.to_string(),
            document_type: DocumentType::Cnpj,
            document: "11222333000181".to_string(),
            razao_social: None,
            nome_fantasia: "Loja".to_string(),
            observacao: String::new(),
            status: Some(ClientStatus::Active),
        }
    }

    #[tokio::test]
    async fn client_codes_are_unique() {
        let backend = MemoryBackend::new();
        backend.insert_client(&payload("C-1")).await.unwrap();

        let err = backend.insert_client(&payload("C-1")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn conditional_update_detects_concurrent_change() {
        let backend = MemoryBackend::new();
        let client = backend.insert_client(&payload("C-1")).await.unwrap();
        let approval = backend
            .upsert_approval(client.id, &ApprovalPatch::unapproved(ClientStatus::Blocked))
            .await
            .unwrap();

        backend.set_approval_status(approval.id, ClientStatus::Cancelled);

        let err = backend
            .update_approval(
                approval.id,
                ClientStatus::Blocked,
                &ApprovalPatch::unapproved(ClientStatus::Pending),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Conflict {
                expected: ClientStatus::Blocked
            }
        ));
    }

    #[tokio::test]
    async fn queued_failure_fires_once() {
        let backend = MemoryBackend::new();
        backend.fail_next("list_clients", "boom");

        assert!(backend.list_clients().await.is_err());
        assert!(backend.list_clients().await.is_ok());
        assert_eq!(backend.calls(), vec!["list_clients", "list_clients"]);
    }

    #[tokio::test]
    async fn sign_in_checks_credentials() {
        let backend = MemoryBackend::new();
        backend.sign_up("ana@example.com", "secret1").await.unwrap();

        assert!(backend.sign_in("ana@example.com", "wrong").await.is_err());
        let session = backend.sign_in("ana@example.com", "secret1").await.unwrap();
        let user = backend.current_user(&session.access_token).await.unwrap();
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }
}
