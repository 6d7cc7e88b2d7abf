// PostgREST dialect over `{url}/rest/v1/{table}`

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use reqwest_middleware::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::http::RateLimitedHttpClient;
use super::RemoteStore;
use crate::config::ClientBoardConfig;
use crate::domain::{
    ApprovalCard, ApprovalPatch, Client, ClientApproval, ClientPayload, ClientStatus, Contact,
    ContactPayload, Profile, StatusEdge,
};
use crate::errors::{AppError, RemoteError};
use crate::observability::remote_metrics;

const CLIENT_SELECT: &str = "*,client_contacts(*)";
const CARD_SELECT: &str = "*,clients(*,client_contacts(*))";
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";

/// Remote store and auth client for a hosted PostgREST + GoTrue project
#[derive(Debug, Clone)]
pub struct RestBackend {
    http: Arc<RateLimitedHttpClient>,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

#[derive(Serialize)]
struct ApprovalUpsert<'a> {
    client_id: Uuid,
    #[serde(flatten)]
    patch: &'a ApprovalPatch,
}

impl RestBackend {
    pub fn new(
        base_url: &str,
        api_key: &str,
        http: RateLimitedHttpClient,
    ) -> Self {
        Self {
            http: Arc::new(http),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
        }
    }

    pub fn from_config(config: &ClientBoardConfig) -> Result<Self, AppError> {
        if !config.remote.is_configured() {
            return Err(AppError::Config(
                "remote.url and remote.api_key must be set".to_string(),
            ));
        }
        let http = RateLimitedHttpClient::new(
            Duration::from_secs(config.remote.timeout_seconds),
            &config.retry,
            &config.rate_limit,
        )?;
        let api_key = config.remote.api_key.as_deref().unwrap_or_default();
        Ok(Self::new(&config.remote.url, api_key, http))
    }

    /// Act on behalf of a signed-in user instead of the anonymous key
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http
            .acquire()
            .await
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn table(&self, method: Method, table: &str) -> RequestBuilder {
        let builder = self
            .request(method.clone(), self.endpoint(&format!("rest/v1/{table}")))
            .await;
        if method == Method::GET {
            builder
        } else {
            // Reused by the retry middleware, so a retried write keeps its key
            builder.header("Idempotency-Key", Uuid::new_v4().to_string())
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RemoteError> {
        debug!(table, "Selecting rows");
        let builder = self.table(Method::GET, table).await.query(query);
        read_json(builder).await
    }

    async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Vec<T>, RemoteError> {
        debug!(table, %method, "Writing rows");
        let mut builder = self
            .table(method, table)
            .await
            .query(query)
            .header("Prefer", RETURN_REPRESENTATION);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        read_json(builder).await
    }

    /// Tell an empty conditional write apart: row gone vs. row changed
    async fn approval_mismatch(&self, id: Uuid, expected: ClientStatus) -> RemoteError {
        let still_there: Result<Vec<serde_json::Value>, _> = self
            .select(
                "client_approvals",
                &[("select", "id".to_string()), ("id", eq(id))],
            )
            .await;
        match still_there {
            Ok(rows) if !rows.is_empty() => {
                remote_metrics().record_conflict();
                RemoteError::Conflict { expected }
            }
            Ok(_) => RemoteError::not_found("approval", id),
            Err(e) => e,
        }
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn first<T>(rows: Vec<T>, entity: &'static str, id: impl ToString) -> Result<T, RemoteError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RemoteError::not_found(entity, id))
}

/// Pull the human message out of an error body, whichever dialect produced it
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .or_else(|| Some(body.trim().to_string()).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    RemoteError::Api {
        status: status.as_u16(),
        message,
    }
}

pub(crate) async fn send(builder: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
    let response = builder.send().await.inspect_err(|_| remote_metrics().record_error())?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    remote_metrics().record_error();
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "Remote service returned an error");
    Err(error_from_body(status, &body))
}

pub(crate) async fn read_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, RemoteError> {
    let response = send(builder).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteStore for RestBackend {
    async fn list_clients(&self) -> Result<Vec<Client>, RemoteError> {
        self.select(
            "clients",
            &[
                ("select", CLIENT_SELECT.to_string()),
                ("order", "code.asc".to_string()),
            ],
        )
        .await
    }

    async fn get_client(&self, id: Uuid) -> Result<Client, RemoteError> {
        let rows = self
            .select(
                "clients",
                &[("select", CLIENT_SELECT.to_string()), ("id", eq(id))],
            )
            .await?;
        first(rows, "client", id)
    }

    async fn insert_client(&self, payload: &ClientPayload) -> Result<Client, RemoteError> {
        let rows = self
            .write(Method::POST, "clients", &[], Some(payload))
            .await?;
        first(rows, "client", &payload.code)
    }

    async fn update_client(
        &self,
        id: Uuid,
        payload: &ClientPayload,
    ) -> Result<Client, RemoteError> {
        let rows = self
            .write(Method::PATCH, "clients", &[("id", eq(id))], Some(payload))
            .await?;
        first(rows, "client", id)
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), RemoteError> {
        let rows: Vec<serde_json::Value> = self
            .write::<_, ()>(Method::DELETE, "clients", &[("id", eq(id))], None)
            .await?;
        if rows.is_empty() {
            return Err(RemoteError::not_found("client", id));
        }
        Ok(())
    }

    async fn delete_contacts(&self, client_id: Uuid) -> Result<(), RemoteError> {
        let builder = self
            .table(Method::DELETE, "client_contacts")
            .await
            .query(&[("client_id", eq(client_id))])
            .header("Prefer", RETURN_MINIMAL);
        send(builder).await.map(|_| ())
    }

    async fn insert_contacts(
        &self,
        client_id: Uuid,
        contacts: &[Contact],
    ) -> Result<(), RemoteError> {
        if contacts.is_empty() {
            return Ok(());
        }
        let rows: Vec<ContactPayload<'_>> = contacts
            .iter()
            .map(|contact| ContactPayload::new(client_id, contact))
            .collect();
        let builder = self
            .table(Method::POST, "client_contacts")
            .await
            .header("Prefer", RETURN_MINIMAL)
            .json(&rows);
        send(builder).await.map(|_| ())
    }

    async fn list_approvals(&self) -> Result<Vec<ApprovalCard>, RemoteError> {
        self.select("client_approvals", &[("select", CARD_SELECT.to_string())])
            .await
    }

    async fn list_approval_records(&self) -> Result<Vec<ClientApproval>, RemoteError> {
        self.select("client_approvals", &[("select", "*".to_string())])
            .await
    }

    async fn find_approval(&self, client_id: Uuid) -> Result<Option<ClientApproval>, RemoteError> {
        let rows: Vec<ClientApproval> = self
            .select(
                "client_approvals",
                &[("select", "*".to_string()), ("client_id", eq(client_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_approval(
        &self,
        client_id: Uuid,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError> {
        let body = ApprovalUpsert { client_id, patch };
        let builder = self
            .table(Method::POST, "client_approvals")
            .await
            .query(&[("on_conflict", "client_id")])
            .header(
                "Prefer",
                format!("resolution=merge-duplicates,{RETURN_REPRESENTATION}"),
            )
            .json(&body);
        let rows: Vec<ClientApproval> = read_json(builder).await?;
        first(rows, "approval", client_id)
    }

    async fn update_approval(
        &self,
        id: Uuid,
        expected: ClientStatus,
        patch: &ApprovalPatch,
    ) -> Result<ClientApproval, RemoteError> {
        let rows: Vec<ClientApproval> = self
            .write(
                Method::PATCH,
                "client_approvals",
                &[("id", eq(id)), ("approval_status", eq(expected))],
                Some(patch),
            )
            .await?;
        match rows.into_iter().next() {
            Some(updated) => Ok(updated),
            None => Err(self.approval_mismatch(id, expected).await),
        }
    }

    async fn delete_approval(&self, id: Uuid, expected: ClientStatus) -> Result<(), RemoteError> {
        let rows: Vec<serde_json::Value> = self
            .write::<_, ()>(
                Method::DELETE,
                "client_approvals",
                &[("id", eq(id)), ("approval_status", eq(expected))],
                None,
            )
            .await?;
        if rows.is_empty() {
            return Err(self.approval_mismatch(id, expected).await);
        }
        Ok(())
    }

    async fn list_workflow(&self) -> Result<Vec<StatusEdge>, RemoteError> {
        self.select(
            "status_workflow",
            &[("select", "current_status,next_status".to_string())],
        )
        .await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RemoteError> {
        let rows: Vec<Profile> = self
            .select(
                "profiles",
                &[("select", "*".to_string()), ("id", eq(user_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), RemoteError> {
        let builder = self
            .table(Method::POST, "profiles")
            .await
            .header("Prefer", RETURN_MINIMAL)
            .json(profile);
        send(builder).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_is_extracted() {
        let err = error_from_body(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint \"clients_code_key\""}"#,
        );
        match err {
            RemoteError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.starts_with("duplicate key value"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gotrue_style_bodies_are_understood() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn empty_body_falls_back_to_reason() {
        let err = error_from_body(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.to_string(), "Service Unavailable");
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let config = ClientBoardConfig::default();
        assert!(matches!(
            RestBackend::from_config(&config),
            Err(AppError::Config(_))
        ));
    }
}
