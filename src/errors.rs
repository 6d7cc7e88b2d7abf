use std::fmt::Write as _;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ClientStatus;
use crate::validation::ValidationError;

/// Failures reported by (or while talking to) the remote data/auth service
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered with an error; `message` is passed through verbatim
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("record was changed by someone else (expected status '{expected}')")]
    Conflict { expected: ClientStatus },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RemoteError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for RemoteError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => RemoteError::Transport(format!("{e:#}")),
        }
    }
}

/// Failures of the public document lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("document lookup failed: {0}")]
    Request(String),
    #[error("document lookup rejected the number: {0}")]
    Rejected(String),
    #[error("only CNPJ documents can be looked up")]
    NotOrganization,
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Request(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {action} a client in status '{from}'")]
    InvalidTransition {
        from: ClientStatus,
        action: &'static str,
    },
    #[error("status transition not allowed: {from} → {to}")]
    EdgeMissing { from: ClientStatus, to: ClientStatus },
    #[error("approval {0} is not on the board")]
    UnknownApproval(Uuid),
    #[error("client is already '{0}'")]
    Unchanged(ClientStatus),
}

/// Umbrella error for every user-facing operation
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("not signed in")]
    NotAuthenticated,
    /// A board action that was refused; the notice was already shown
    #[error("{0}")]
    Action(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("session file error: {0}")]
    Session(#[from] std::io::Error),
}

impl AppError {
    /// Multi-line explanation with next steps, printed by the CLI
    pub fn guidance(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_guidance(&mut out);
        out
    }

    fn write_guidance(&self, f: &mut String) -> std::fmt::Result {
        match self {
            AppError::Validation(errors) => {
                writeln!(f, "Invalid input")?;
                writeln!(f, "─────────────")?;
                for (field, message) in errors.fields() {
                    writeln!(f, "   ✗ {field}: {message}")?;
                }
                write!(f, "\n🔧 Fix the fields above and try again")
            }
            AppError::Remote(RemoteError::Api { status, message }) => {
                writeln!(f, "Remote Service Error")?;
                writeln!(f, "────────────────────")?;
                write!(f, "🌐 HTTP {status}: {message}\n\n")?;
                match status {
                    401 => {
                        writeln!(f, "🔧 AUTHENTICATION FAILED:")?;
                        writeln!(f, "   → Session expired or invalid")?;
                        write!(f, "   → Run: client-board login")
                    }
                    403 => {
                        writeln!(f, "🔧 PERMISSION DENIED:")?;
                        write!(f, "   → Your account lacks access to this table")
                    }
                    409 => {
                        writeln!(f, "🔧 DUPLICATE OR CONFLICTING DATA:")?;
                        write!(f, "   → Check the client code and document for duplicates")
                    }
                    _ => {
                        writeln!(f, "🔧 TROUBLESHOOTING:")?;
                        writeln!(f, "   → Check remote.url and remote.api_key: client-board settings")?;
                        write!(f, "   → Retry the operation")
                    }
                }
            }
            AppError::Remote(RemoteError::Conflict { .. }) => {
                writeln!(f, "Concurrent Change Detected")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔀 {self}\n\n")?;
                write!(f, "🔧 Reload the board (client-board board show) and try again")
            }
            AppError::Remote(RemoteError::Transport(msg)) => {
                writeln!(f, "Network Error")?;
                writeln!(f, "─────────────")?;
                write!(f, "🌐 {msg}\n\n")?;
                writeln!(f, "🔧 TROUBLESHOOTING:")?;
                writeln!(f, "   → Check internet connectivity")?;
                write!(f, "   → Verify remote.url: client-board settings")
            }
            AppError::Remote(other) => write!(f, "❌ {other}"),
            AppError::Lookup(err) => {
                write!(f, "❌ {err}\n\n")?;
                write!(f, "🔧 Check the number and try again; form fields were left unchanged")
            }
            AppError::Workflow(err) => write!(f, "🚫 {err}"),
            AppError::Action(msg) => {
                write!(f, "🚫 {msg}\n\n")?;
                write!(f, "🔧 Check the board (client-board board show) and try again")
            }
            AppError::NotAuthenticated => {
                writeln!(f, "Not Signed In")?;
                writeln!(f, "─────────────")?;
                writeln!(f, "🔑 This command needs an active session\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → Sign in: client-board login --email you@example.com")?;
                write!(f, "   → New here? client-board register")
            }
            AppError::Config(msg) => {
                writeln!(f, "Configuration Error")?;
                writeln!(f, "───────────────────")?;
                write!(f, "📂 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → export CLIENT_BOARD_REMOTE__URL=https://your-project.supabase.co")?;
                writeln!(f, "   → export CLIENT_BOARD_REMOTE__API_KEY=your_anon_key")?;
                write!(f, "   → Or write client-board.toml in the working directory")
            }
            AppError::Session(err) => {
                write!(f, "📁 Session file error: {err}\n\n")?;
                write!(f, "🔧 Check permissions on the session path (client-board settings)")
            }
        }
    }
}
