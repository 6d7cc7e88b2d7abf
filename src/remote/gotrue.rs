// GoTrue dialect over `{url}/auth/v1/*`

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::rest::{read_json, send, RestBackend};
use super::{AuthService, SignUp};
use crate::auth::session::{AuthUser, Session};
use crate::errors::RemoteError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a full session when auto-confirm is on, otherwise
/// with the bare user (either top-level or under `user`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Wrapped { user: AuthUser },
    User(AuthUser),
}

impl RestBackend {
    async fn auth_request(&self, method: Method, path: &str) -> reqwest_middleware::RequestBuilder {
        self.request(method, self.endpoint(&format!("auth/v1/{path}")))
            .await
    }
}

#[async_trait]
impl AuthService for RestBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let builder = self
            .auth_request(Method::POST, "token")
            .await
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = read_json(builder).await?;
        info!(user = %token.user.id, "Signed in");
        Ok(token.into_session(Utc::now()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError> {
        let builder = self
            .auth_request(Method::POST, "signup")
            .await
            .json(&json!({ "email": email, "password": password }));
        let response: SignUpResponse = read_json(builder).await?;
        Ok(match response {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                SignUp {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::Wrapped { user } | SignUpResponse::User(user) => SignUp {
                user,
                session: None,
            },
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        let builder = self
            .clone()
            .with_access_token(access_token)
            .auth_request(Method::POST, "logout")
            .await;
        send(builder).await.map(|_| ())
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, RemoteError> {
        let builder = self
            .clone()
            .with_access_token(access_token)
            .auth_request(Method::GET, "user")
            .await;
        read_json(builder).await
    }
}
