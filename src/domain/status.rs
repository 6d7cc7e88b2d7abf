use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status shared by clients and approval records.
///
/// Variant order is the board's column order, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Cancelled,
    Blocked,
    Pending,
    Active,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status '{0}' (expected one of: cancelled, blocked, pending, active)")]
pub struct ParseStatusError(pub String);

impl ClientStatus {
    pub const ALL: [ClientStatus; 4] = [
        ClientStatus::Cancelled,
        ClientStatus::Blocked,
        ClientStatus::Pending,
        ClientStatus::Active,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Cancelled => "cancelled",
            ClientStatus::Blocked => "blocked",
            ClientStatus::Pending => "pending",
            ClientStatus::Active => "active",
        }
    }

    /// Human label used on cards and in listings
    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::Cancelled => "Cancelled",
            ClientStatus::Blocked => "Blocked",
            ClientStatus::Pending => "Pending",
            ClientStatus::Active => "Active",
        }
    }

    /// Title of the board column that holds this status
    pub fn column_title(&self) -> &'static str {
        match self {
            ClientStatus::Cancelled => "Cancelled",
            ClientStatus::Blocked => "Blocked",
            ClientStatus::Pending => "To release",
            ClientStatus::Active => "Released",
        }
    }

    /// Verb shown in status menus when this status is the target
    pub fn action_label(&self) -> &'static str {
        match self {
            ClientStatus::Cancelled => "Cancel",
            ClientStatus::Blocked => "Block",
            ClientStatus::Pending => "Release",
            ClientStatus::Active => "Activate",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ClientStatus::Cancelled => "⚪",
            ClientStatus::Blocked => "🔴",
            ClientStatus::Pending => "🟡",
            ClientStatus::Active => "🟢",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancelled" | "canceled" => Ok(ClientStatus::Cancelled),
            "blocked" => Ok(ClientStatus::Blocked),
            "pending" => Ok(ClientStatus::Pending),
            "active" => Ok(ClientStatus::Active),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values_case_insensitively() {
        assert_eq!("Active".parse::<ClientStatus>(), Ok(ClientStatus::Active));
        assert_eq!("canceled".parse::<ClientStatus>(), Ok(ClientStatus::Cancelled));
        assert!("archived".parse::<ClientStatus>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ClientStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }

    #[test]
    fn column_order_follows_workflow() {
        let mut statuses = vec![ClientStatus::Active, ClientStatus::Cancelled, ClientStatus::Pending];
        statuses.sort();
        assert_eq!(
            statuses,
            vec![ClientStatus::Cancelled, ClientStatus::Pending, ClientStatus::Active]
        );
    }
}
