//! Access to the hosted data and auth service.
//!
//! Everything above this module talks to `RemoteStore` / `AuthService`; the REST
//! backend speaks the PostgREST and GoTrue dialects, the memory backend keeps the
//! same tables in process for tests.

pub mod gotrue;
pub mod http;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::session::{AuthUser, Session};
use crate::domain::{
    ApprovalCard, ApprovalPatch, Client, ClientApproval, ClientPayload, ClientStatus, Contact,
    Profile, StatusEdge,
};
use crate::errors::RemoteError;

pub use http::RateLimitedHttpClient;
pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Table-level operations on `clients`, `client_contacts`, `client_approvals`,
/// `status_workflow` and `profiles`
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All clients with their contacts embedded, ordered by code
    async fn list_clients(&self) -> Result<Vec<Client>, RemoteError>;

    async fn get_client(&self, id: Uuid) -> Result<Client, RemoteError>;

    async fn insert_client(&self, payload: &ClientPayload) -> Result<Client, RemoteError>;

    async fn update_client(&self, id: Uuid, payload: &ClientPayload)
        -> Result<Client, RemoteError>;

    async fn delete_client(&self, id: Uuid) -> Result<(), RemoteError>;

    async fn delete_contacts(&self, client_id: Uuid) -> Result<(), RemoteError>;

    async fn insert_contacts(&self, client_id: Uuid, contacts: &[Contact])
        -> Result<(), RemoteError>;

    /// Approvals joined with their client, for the board
    async fn list_approvals(&self) -> Result<Vec<ApprovalCard>, RemoteError>;

    /// Approval rows without the join, for the registry
    async fn list_approval_records(&self) -> Result<Vec<ClientApproval>, RemoteError>;

    async fn find_approval(&self, client_id: Uuid) -> Result<Option<ClientApproval>, RemoteError>;

    /// Insert or replace the approval of `client_id`
    async fn upsert_approval(
        &self,
        client_id: Uuid,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError>;

    /// Update only if the stored status still equals `expected`.
    ///
    /// Fails with `RemoteError::Conflict` when someone else changed it first.
    async fn update_approval(
        &self,
        id: Uuid,
        expected: ClientStatus,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError>;

    /// Delete only if the stored status still equals `expected`
    async fn delete_approval(&self, id: Uuid, expected: ClientStatus) -> Result<(), RemoteError>;

    async fn list_workflow(&self) -> Result<Vec<StatusEdge>, RemoteError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RemoteError>;

    async fn insert_profile(&self, profile: &Profile) -> Result<(), RemoteError>;
}

/// Result of a sign-up: the session is absent when the service wants the
/// address confirmed first
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError>;

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, RemoteError>;
}

/// A full backend: tables plus auth, able to act for a signed-in user
pub trait Backend: RemoteStore + AuthService {
    /// Store handle whose requests carry the user's access token
    fn with_session(&self, access_token: &str) -> Arc<dyn RemoteStore>;
}

impl Backend for RestBackend {
    fn with_session(&self, access_token: &str) -> Arc<dyn RemoteStore> {
        Arc::new(self.clone().with_access_token(access_token))
    }
}

/// Row-level security is not modelled; every session sees the same tables
impl Backend for MemoryBackend {
    fn with_session(&self, _access_token: &str) -> Arc<dyn RemoteStore> {
        Arc::new(self.clone())
    }
}
