//! Error types for the bluebridge crate.

use serde::Serialize;

use crate::model::{CharacteristicId, DeviceId, ServiceId};

/// Errors that can occur while bridging the entity tree.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A required request field is missing or has the wrong shape
    #[error("Invalid argument: missing or malformed `{field}`")]
    InvalidArgument {
        /// Name of the offending field
        field: &'static str,
    },

    /// The device is not known to the driver
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// The device has no such discovered service
    #[error("Service not found: {service} on device {device}")]
    ServiceNotFound { device: DeviceId, service: ServiceId },

    /// The service has no such characteristic
    #[error("Characteristic not found: {characteristic} in service {service} on device {device}")]
    CharacteristicNotFound {
        device: DeviceId,
        service: ServiceId,
        characteristic: CharacteristicId,
    },

    /// The driver reported a failure; carries its message verbatim
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Unknown command name
    #[error("Unimplemented command: {0}")]
    Unimplemented(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Attach was called outside of a tokio runtime
    #[error("No tokio runtime available to host the bridge")]
    NoRuntime,
}

impl BridgeError {
    /// The failure code reported to the remote consumer.
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            BridgeError::DeviceNotFound(_)
            | BridgeError::ServiceNotFound { .. }
            | BridgeError::CharacteristicNotFound { .. } => ErrorCode::NotFound,
            BridgeError::OperationFailed(_) => ErrorCode::OperationFailed,
            BridgeError::Unimplemented(_) => ErrorCode::Unimplemented,
            BridgeError::Configuration(_) | BridgeError::NoRuntime => ErrorCode::Internal,
        }
    }
}

impl From<DriverError> for BridgeError {
    fn from(error: DriverError) -> Self {
        BridgeError::OperationFailed(error.message)
    }
}

/// Failure reported by the Bluetooth driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure codes visible to the remote consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    OperationFailed,
    Unimplemented,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalidArgument",
            ErrorCode::NotFound => "notFound",
            ErrorCode::OperationFailed => "operationFailed",
            ErrorCode::Unimplemented => "unimplemented",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged `(code, message)` failure delivered to the pending remote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<BridgeError> for RemoteError {
    fn from(error: BridgeError) -> Self {
        let message = match &error {
            BridgeError::OperationFailed(message) => message.clone(),
            other => other.to_string(),
        };
        Self {
            code: error.code(),
            message,
        }
    }
}

/// Convenience type alias for Results using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
