// Session gate: persisted session, sign-in flows and route guarding

pub mod gate;
pub mod manager;
pub mod session;

pub use gate::{resolve, Navigation, Route, SessionGate};
pub use manager::{display_name, AuthManager, Identity};
pub use session::{AuthUser, Session, SessionStore};
