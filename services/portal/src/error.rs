//! services/portal/src/error.rs
//!
//! Defines the primary error type for the portal client.

use crate::config::ConfigError;
use student_portal_core::{GateError, PaymentRejection, PortError};

/// The primary error type for the `portal` service.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request never produced a reply (network, decoding, ...).
    #[error("Server error: {0}")]
    Port(#[from] PortError),

    /// The session gate refused the operation.
    #[error("{0}")]
    Gate(#[from] GateError),

    /// A payment amount failed local validation.
    #[error("{0}")]
    Payment(#[from] PaymentRejection),

    /// Input rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// The server replied with `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// Course actions are locked until overdue fees are cleared.
    #[error("Clear pending fees to manage courses")]
    FeesPending,

    /// Represents a standard Input/Output error (e.g. writing to stdout).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;
