//! Error types for switch driver operations.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use metalnet_types::{Channel, VlanId};
use thiserror::Error;

/// Result type alias for driver operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors raised by switch drivers and the transport underneath them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FabricError {
    /// An externally supplied identifier failed the vendor grammar.
    #[error("Bad argument: {message}")]
    BadArgument {
        /// Error message.
        message: String,
    },

    /// Switch configuration object missing or mistyping a field.
    #[error("Invalid switch configuration for {field}: {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// A tagged channel was requested for a network it cannot carry.
    #[error("Channel {channel} cannot carry network {network}")]
    ChannelMismatch {
        /// Requested channel.
        channel: Channel,
        /// Requested network identifier.
        network: VlanId,
    },

    /// The switch answered with an error status.
    #[error("Switch rejected {method} {url} (status {status}): {body}")]
    Hardware {
        /// HTTP method.
        method: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request never produced a response (connect failure, timeout).
    #[error("Transport failure talking to {url}: {message}")]
    Transport {
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Scraped device output did not match the expected layout.
    #[error("Unexpected output from '{command}': {message}")]
    UnexpectedOutput {
        /// The command whose output was parsed.
        command: String,
        /// Error message.
        message: String,
    },

    /// No driver is registered under this vendor identifier.
    #[error("Unknown switch vendor '{0}'")]
    UnknownVendor(String),
}

impl FabricError {
    /// Creates a bad argument error.
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an unexpected output error.
    pub fn unexpected_output(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error came from the caller's input rather than
    /// from the device.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            FabricError::BadArgument { .. }
                | FabricError::InvalidConfig { .. }
                | FabricError::ChannelMismatch { .. }
                | FabricError::UnknownVendor(_)
        )
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry. The controller itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            FabricError::Transport { .. } => true,
            FabricError::Hardware { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
