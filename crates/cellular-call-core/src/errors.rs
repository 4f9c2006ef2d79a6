//! Error types for the call-session control core
//!
//! Every public operation of the service returns a [`CallError`] on failure.
//! Callers on the far side of an IPC boundary only see an integer, so each
//! variant maps to a stable code through [`CallError::code`]; `0` is success.

use thiserror::Error;

use crate::capability::Permission;
use crate::transport::TransportError;
use crate::types::{SlotId, TelCallState};

/// Result type for call control operations
pub type Result<T> = std::result::Result<T, CallError>;

/// Stable result codes surfaced to the application layer.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    /// Dial string was consumed as a supplementary service code.
    pub const RETURN_TYPE_MMI: i32 = 8_300_000;
    pub const ERR_FAIL: i32 = 8_300_001;
    pub const ERR_PERMISSION: i32 = 8_300_002;
    pub const ERR_ARGUMENT_INVALID: i32 = 8_300_003;
    pub const CALL_ERR_INVALID_SLOT_ID: i32 = 8_300_101;
    pub const CALL_ERR_SRVCC_IN_PROGRESS: i32 = 8_300_102;
    pub const CALL_ERR_PHONE_NUMBER_EMPTY: i32 = 8_300_103;
    pub const CALL_ERR_RADIO_STATE: i32 = 8_300_104;
    pub const CALL_ERR_UNSUPPORTED_NETWORK_TYPE: i32 = 8_300_105;
    pub const CALL_ERR_CALL_COUNTS_EXCEED_LIMIT: i32 = 8_300_106;
    pub const CALL_ERR_CONNECTION_NOT_EXIST: i32 = 8_300_107;
    pub const CALL_ERR_CALL_STATE: i32 = 8_300_108;
    pub const CALL_ERR_TRANSPORT_UNAVAILABLE: i32 = 8_300_109;
    pub const CALL_ERR_SERVICE_UNAVAILABLE: i32 = 8_300_110;
}

/// Errors that can occur while controlling calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The caller lacks the permission required by the operation
    #[error("Permission denied: {permission:?} required")]
    PermissionDenied { permission: Permission },

    /// Slot id outside the configured SIM slot range
    #[error("Invalid slot id: {slot_id}")]
    InvalidSlotId { slot_id: SlotId },

    /// A single radio voice call continuity handover is running
    #[error("SRVCC handover in progress")]
    SrvccInProgress,

    #[error("Phone number is empty")]
    PhoneNumberEmpty,

    #[error("Radio is not available")]
    RadioUnavailable,

    #[error("Unsupported network type")]
    UnsupportedNetworkType,

    /// Connection table is at its concurrent call bound
    #[error("Call count exceeds limit of {limit}")]
    CallCountsExceedLimit { limit: usize },

    /// No tracked connection matches the number or index
    #[error("Connection does not exist (number: {number:?}, index: {index})")]
    ConnectionNotExist { number: String, index: i32 },

    /// Operation is not legal in the current call state
    #[error("Invalid call state {state:?}: {message}")]
    CallState {
        state: Option<TelCallState>,
        message: String,
    },

    #[error("Invalid argument: {message}")]
    ArgumentInvalid { message: String },

    /// Transport refused or failed to send the request
    #[error("Transport unavailable: {0}")]
    Transport(#[from] TransportError),

    /// The slot worker is gone (service stopped)
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CallError {
    /// Create a call state error
    pub fn call_state(state: Option<TelCallState>, message: impl Into<String>) -> Self {
        Self::CallState {
            state,
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn argument_invalid(message: impl Into<String>) -> Self {
        Self::ArgumentInvalid {
            message: message.into(),
        }
    }

    /// Create a connection lookup error
    pub fn connection_not_exist(number: impl Into<String>, index: i32) -> Self {
        Self::ConnectionNotExist {
            number: number.into(),
            index,
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable integer code for this error
    pub fn code(&self) -> i32 {
        match self {
            Self::PermissionDenied { .. } => codes::ERR_PERMISSION,
            Self::InvalidSlotId { .. } => codes::CALL_ERR_INVALID_SLOT_ID,
            Self::SrvccInProgress => codes::CALL_ERR_SRVCC_IN_PROGRESS,
            Self::PhoneNumberEmpty => codes::CALL_ERR_PHONE_NUMBER_EMPTY,
            Self::RadioUnavailable => codes::CALL_ERR_RADIO_STATE,
            Self::UnsupportedNetworkType => codes::CALL_ERR_UNSUPPORTED_NETWORK_TYPE,
            Self::CallCountsExceedLimit { .. } => codes::CALL_ERR_CALL_COUNTS_EXCEED_LIMIT,
            Self::ConnectionNotExist { .. } => codes::CALL_ERR_CONNECTION_NOT_EXIST,
            Self::CallState { .. } => codes::CALL_ERR_CALL_STATE,
            Self::ArgumentInvalid { .. } => codes::ERR_ARGUMENT_INVALID,
            Self::Transport(_) => codes::CALL_ERR_TRANSPORT_UNAVAILABLE,
            Self::ServiceUnavailable { .. } => codes::CALL_ERR_SERVICE_UNAVAILABLE,
            Self::Config { .. } => codes::ERR_FAIL,
        }
    }

    /// Whether this is a precondition failure (no transport call was attempted)
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::InvalidSlotId { .. }
                | Self::SrvccInProgress
                | Self::PhoneNumberEmpty
                | Self::RadioUnavailable
                | Self::UnsupportedNetworkType
                | Self::CallCountsExceedLimit { .. }
        )
    }
}

/// Flatten an operation result into the integer surface
pub fn result_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => codes::SUCCESS,
        Err(e) => e.code(),
    }
}
