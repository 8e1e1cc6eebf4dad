//! Error types for registry operations.

use metalnet_switch::FabricError;
use thiserror::Error;

use crate::allocator::AllocationError;
use crate::config::ConfigError;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// Every variant is raised before the graph is touched; a caller that sees
/// an error can assume no mutation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A referenced entity or relationship does not exist.
    #[error("{kind} {label:?} not found")]
    NotFound { kind: &'static str, label: String },

    /// A create hit a taken label, or a connect hit an occupied slot.
    #[error("{kind} {label:?} already exists")]
    Duplicate { kind: &'static str, label: String },

    /// Externally supplied input failed a syntactic or vendor check.
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// The network identifier pool is exhausted.
    #[error("Allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    /// Delete or detach refused while dependents still exist.
    #[error("Cannot remove {kind} {label:?}: {reason}")]
    Blocked {
        kind: &'static str,
        label: String,
        reason: String,
    },

    /// The switch rejected or never received a command.
    #[error("Hardware error: {0}")]
    Hardware(FabricError),

    /// Startup configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    pub fn not_found(kind: &'static str, label: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            label: label.into(),
        }
    }

    pub fn duplicate(kind: &'static str, label: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            label: label.into(),
        }
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument(message.into())
    }

    pub fn blocked(kind: &'static str, label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Blocked {
            kind,
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for hardware failures worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Hardware(e) if e.is_retryable())
    }
}

impl From<FabricError> for RegistryError {
    fn from(e: FabricError) -> Self {
        match e {
            FabricError::BadArgument { message } => Self::BadArgument(message),
            e if e.is_caller_error() => Self::BadArgument(e.to_string()),
            e => Self::Hardware(e),
        }
    }
}
