// Transient user-facing messages produced by every action

use serde::Serialize;
use std::fmt;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Errors keep their short `Display` text; `AppError::guidance` has the long form
    pub fn from_error(err: &AppError) -> Self {
        Self::error(err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    pub fn icon(&self) -> &'static str {
        match self.level {
            NoticeLevel::Success => "✅",
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Error => "❌",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.message)
    }
}

impl From<AppError> for Notice {
    fn from(err: AppError) -> Self {
        Notice::from_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WorkflowError;
    use crate::domain::ClientStatus;

    #[test]
    fn errors_become_error_notices() {
        let notice: Notice = AppError::from(WorkflowError::EdgeMissing {
            from: ClientStatus::Cancelled,
            to: ClientStatus::Active,
        })
        .into();
        assert!(notice.is_error());
        assert_eq!(
            notice.message,
            "status transition not allowed: cancelled → active"
        );
    }

    #[test]
    fn display_prefixes_icon() {
        assert_eq!(Notice::success("Saved").to_string(), "✅ Saved");
    }
}
