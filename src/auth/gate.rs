use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::session::{Session, SessionStore};
use crate::errors::AppError;

/// Pages of the dashboard shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Auth,
    /// Approval board, the dashboard index
    Board,
    Clients,
    Settings,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Auth => "/auth",
            Route::Board => "/dashboard",
            Route::Clients => "/dashboard/clients",
            Route::Settings => "/dashboard/settings",
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        match normalized {
            "/auth" => Some(Route::Auth),
            "/dashboard" => Some(Route::Board),
            "/dashboard/clients" => Some(Route::Clients),
            "/dashboard/settings" => Some(Route::Settings),
            _ => None,
        }
    }

    pub fn requires_session(&self) -> bool {
        !matches!(self, Route::Auth)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Where a request for `path` ends up given whether a session exists
pub fn resolve(path: &str, authenticated: bool) -> Navigation {
    let home = if authenticated { Route::Board } else { Route::Auth };
    match Route::parse(path) {
        None => Navigation::Redirect(home),
        Some(route) if route.requires_session() && !authenticated => {
            Navigation::Redirect(Route::Auth)
        }
        Some(Route::Auth) if authenticated => Navigation::Redirect(Route::Board),
        Some(route) => Navigation::Render(route),
    }
}

/// Session-aware access to dashboard routes
#[derive(Debug, Clone)]
pub struct SessionGate {
    store: SessionStore,
}

impl SessionGate {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn resolve(&self, path: &str) -> Result<Navigation, AppError> {
        let session = self.store.load().await?;
        Ok(resolve(path, session.is_some()))
    }

    /// The live session needed to render `route`
    pub async fn guard(&self, route: Route) -> Result<Session, AppError> {
        match self.store.load().await? {
            Some(session) => Ok(session),
            None => {
                debug!(%route, "No live session, redirecting to {}", Route::Auth);
                Err(AppError::NotAuthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_requires_session() {
        for path in ["/dashboard", "/dashboard/clients", "/dashboard/settings/"] {
            assert_eq!(resolve(path, false), Navigation::Redirect(Route::Auth), "{path}");
        }
        assert_eq!(
            resolve("/dashboard/clients", true),
            Navigation::Render(Route::Clients)
        );
    }

    #[test]
    fn auth_page_redirects_signed_in_users() {
        assert_eq!(resolve("/auth", true), Navigation::Redirect(Route::Board));
        assert_eq!(resolve("/auth", false), Navigation::Render(Route::Auth));
    }

    #[test]
    fn unknown_paths_go_home() {
        assert_eq!(resolve("/", true), Navigation::Redirect(Route::Board));
        assert_eq!(resolve("/nope", false), Navigation::Redirect(Route::Auth));
    }

    #[tokio::test]
    async fn guard_without_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gate = SessionGate::new(SessionStore::new(dir.path().join("session.json")));
        assert!(matches!(
            gate.guard(Route::Board).await,
            Err(AppError::NotAuthenticated)
        ));
        assert_eq!(
            gate.resolve("/dashboard").await.unwrap(),
            Navigation::Redirect(Route::Auth)
        );
    }
}
