// Domain records exchanged with the remote data service

pub mod approval;
pub mod client;
pub mod profile;
pub mod status;

pub use crate::document::DocumentType;
pub use approval::{ApprovalCard, ApprovalPatch, ClientApproval, ClientView, StatusEdge};
pub use client::{Client, ClientInput, ClientPayload, Contact, ContactPayload, ContactRole};
pub use profile::Profile;
pub use status::{ClientStatus, ParseStatusError};
