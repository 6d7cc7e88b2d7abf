// Client Board Library - client registry and approval board
// This exposes the core components for testing and integration

pub mod auth;
pub mod cli;
pub mod config;
pub mod document;
pub mod domain;
pub mod errors;
pub mod lookup;
pub mod notice;
pub mod observability;
pub mod registry;
pub mod remote;
pub mod telemetry;
pub mod validation;
pub mod workflow;

// Re-export key types for easy access
pub use auth::{AuthManager, Navigation, Route, Session, SessionGate, SessionStore};
pub use crate::config::ClientBoardConfig;
pub use document::{format_document, format_phone, DocumentType};
pub use domain::{ApprovalCard, Client, ClientInput, ClientStatus, ClientView, Contact, ContactRole};
pub use errors::{AppError, LookupError, RemoteError, WorkflowError};
pub use lookup::{fill_from_lookup, CnpjWsLookup, DocumentLookup, LookupResult};
pub use notice::{Notice, NoticeLevel};
pub use observability::{remote_metrics, OperationTimer, RemoteApiMetrics};
pub use registry::{ClientFilter, ClientRegistry};
pub use remote::{Backend, MemoryBackend, RateLimitedHttpClient, RemoteStore, RestBackend};
pub use telemetry::{create_action_span, generate_correlation_id, init_telemetry};
pub use workflow::{ApprovalBoard, Workflow};
