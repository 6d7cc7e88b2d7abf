use std::sync::Arc;
use tracing::{info, warn};

use super::session::{AuthUser, Session, SessionStore};
use crate::domain::Profile;
use crate::errors::AppError;
use crate::remote::{Backend, RemoteStore, SignUp};
use crate::validation::{LoginForm, RegistrationForm};

const FALLBACK_NAME: &str = "user";

/// Who is signed in, as shown in the dashboard header
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user: AuthUser,
    pub profile: Option<Profile>,
    pub display_name: String,
}

/// Profile username, else the account email, else a generic label
pub fn display_name(profile: Option<&Profile>, user: &AuthUser) -> String {
    profile
        .map(|p| p.username.trim())
        .filter(|name| !name.is_empty())
        .or_else(|| user.email.as_deref().filter(|email| !email.is_empty()))
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Sign-in, sign-up and sign-out against the remote auth service, keeping the
/// local session file in step
pub struct AuthManager {
    backend: Arc<dyn Backend>,
    sessions: SessionStore,
}

impl AuthManager {
    pub fn new(backend: Arc<dyn Backend>, sessions: SessionStore) -> Self {
        Self { backend, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Session, AppError> {
        form.validate()?;
        let session = self
            .backend
            .sign_in(form.email.trim(), &form.password)
            .await?;
        self.sessions.save(&session).await?;
        info!(user = %session.user.id, "Logged in");
        Ok(session)
    }

    /// Create the account and its admin profile.
    ///
    /// When the service asks for e-mail confirmation no session is stored.
    pub async fn register(&self, form: &RegistrationForm) -> Result<SignUp, AppError> {
        form.validate()?;
        let signed_up = self
            .backend
            .sign_up(form.email.trim(), &form.password)
            .await?;

        let profile = Profile {
            id: signed_up.user.id,
            username: form.username.trim().to_string(),
            is_admin: true,
        };
        match &signed_up.session {
            Some(session) => {
                self.backend
                    .with_session(&session.access_token)
                    .insert_profile(&profile)
                    .await?;
                self.sessions.save(session).await?;
            }
            None => self.backend.insert_profile(&profile).await?,
        }

        info!(user = %signed_up.user.id, "Account created");
        Ok(signed_up)
    }

    /// Returns whether a session was active. The local session is removed
    /// even if the remote sign-out fails.
    pub async fn logout(&self) -> Result<bool, AppError> {
        let Some(session) = self.sessions.load().await? else {
            return Ok(false);
        };
        if let Err(err) = self.backend.sign_out(&session.access_token).await {
            warn!(error = %err, "Remote sign-out failed, clearing local session anyway");
        }
        self.sessions.clear().await?;
        info!(user = %session.user.id, "Logged out");
        Ok(true)
    }

    /// The stored session, or `NotAuthenticated`
    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.sessions
            .load()
            .await?
            .ok_or(AppError::NotAuthenticated)
    }

    /// Table access on behalf of the signed-in user
    pub fn store_for(&self, session: &Session) -> Arc<dyn RemoteStore> {
        self.backend.with_session(&session.access_token)
    }

    pub async fn whoami(&self) -> Result<Identity, AppError> {
        let session = self.require_session().await?;
        let user = self.backend.current_user(&session.access_token).await?;
        let profile = self.store_for(&session).get_profile(user.id).await?;
        let display_name = display_name(profile.as_ref(), &user);
        Ok(Identity {
            user,
            profile,
            display_name,
        })
    }
}
