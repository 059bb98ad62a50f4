//! Unified error type for pool-buddy.
//!
//! Every core operation returns [`Result`]. Errors fall into a small taxonomy
//! ([`ErrorKind`]) so the request layer can render a structured payload without
//! matching on every variant.

use crate::entities::line_item::Pool;
use serde::Serialize;
use thiserror::Error;

/// All failures surfaced by the core and the bot layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A user, income, line item, meal or goal does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier used for the lookup
        id: String,
    },

    /// No income dated inside the current salary cycle, so no pool exists yet.
    #[error("No income found for the salary cycle {start} to {end}")]
    NoIncomeInCycle {
        /// First day of the cycle
        start: chrono::NaiveDate,
        /// Last day of the cycle
        end: chrono::NaiveDate,
    },

    /// Missing or malformed input.
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable reason
        message: String,
    },

    /// Amount is zero, negative or not a finite number.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount
        amount: f64,
    },

    /// Date string that does not parse.
    #[error("Invalid date '{value}', expected format {expected}")]
    InvalidDate {
        /// Raw input
        value: String,
        /// Expected format
        expected: &'static str,
    },

    /// Time string that does not parse.
    #[error("Invalid time '{value}', expected format {expected}")]
    InvalidTime {
        /// Raw input
        value: String,
        /// Expected format
        expected: &'static str,
    },

    /// Admission control rejected a write against a pool.
    #[error("Insufficient {pool} pool: {remaining:.2} remaining, {requested:.2} requested")]
    InsufficientPool {
        /// Pool the write targeted
        pool: Pool,
        /// Allowance left, including any amount being replaced by an edit
        remaining: f64,
        /// Amount the caller asked for
        requested: f64,
    },

    /// Record already exists where only one is allowed.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human readable reason
        message: String,
    },

    /// Photo store failure.
    #[error("Photo storage error: {message}")]
    Photo {
        /// Human readable reason
        message: String,
    },

    /// Nutrition coach collaborator failure.
    #[error("Nutrition coach error: {message}")]
    Coach {
        /// Human readable reason
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable reason
        message: String,
    },

    /// Database error from `SeaORM`.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatting error while building a reply.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Environment variable error.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Coarse failure category used by callers to pick a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing record (4xx-equivalent)
    NotFound,
    /// Bad input (4xx-equivalent)
    Validation,
    /// Pool admission control rejection
    InsufficientPool,
    /// Duplicate record
    Conflict,
    /// Anything else
    Internal,
}

/// Serializable error body: failure kind, message and, for pool rejections,
/// the exact remaining allowance.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Failure category
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
    /// Remaining pool allowance, set only for [`ErrorKind::InsufficientPool`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Maps the error onto its [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NoIncomeInCycle { .. } => ErrorKind::NotFound,
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidDate { .. }
            | Self::InvalidTime { .. } => ErrorKind::Validation,
            Self::InsufficientPool { .. } => ErrorKind::InsufficientPool,
            Self::Conflict { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    /// Builds the structured payload for this error.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        let remaining = match self {
            Self::InsufficientPool { remaining, .. } => Some(*remaining),
            _ => None,
        };
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            remaining,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::not_found("income", 3).kind(), ErrorKind::NotFound);
        assert_eq!(Error::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(
            Error::InvalidDate {
                value: "x".to_string(),
                expected: "YYYY-MM-DD"
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::Conflict {
                message: "dup".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::Photo {
                message: "disk".to_string()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_insufficient_pool_payload_carries_remaining() {
        let err = Error::InsufficientPool {
            pool: Pool::Burn,
            remaining: 5.0,
            requested: 6.0,
        };
        let payload = err.payload();
        assert_eq!(payload.kind, ErrorKind::InsufficientPool);
        assert_eq!(payload.remaining, Some(5.0));

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"insufficient_pool\""));
        assert!(json.contains("\"remaining\":5.0"));
        assert!(json.contains("5.00 remaining"));
    }

    #[test]
    fn test_payload_omits_remaining_for_other_errors() {
        let json = serde_json::to_string(&Error::not_found("meal", 9).payload()).unwrap();
        assert!(!json.contains("remaining"));
        assert!(json.contains("meal not found: 9"));
    }
}
