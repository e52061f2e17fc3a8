use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::printer::{CallbackCode, PrinterStatusSnapshot, PrinterTarget};

/// Status reported by the vendor SDK when a device call is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorStatus {
    Param,
    Connect,
    Timeout,
    Memory,
    Illegal,
    /// The device is still busy with a previous request
    Processing,
    NotFound,
    InUse,
    TypeInvalid,
    Disconnect,
    AlreadyOpened,
    AlreadyUsed,
    Unsupported,
    Failure,
}

impl DeviceErrorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Param => "ERR_PARAM",
            Self::Connect => "ERR_CONNECT",
            Self::Timeout => "ERR_TIMEOUT",
            Self::Memory => "ERR_MEMORY",
            Self::Illegal => "ERR_ILLEGAL",
            Self::Processing => "ERR_PROCESSING",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::InUse => "ERR_IN_USE",
            Self::TypeInvalid => "ERR_TYPE_INVALID",
            Self::Disconnect => "ERR_DISCONNECT",
            Self::AlreadyOpened => "ERR_ALREADY_OPENED",
            Self::AlreadyUsed => "ERR_ALREADY_USED",
            Self::Unsupported => "ERR_UNSUPPORTED",
            Self::Failure => "ERR_FAILURE",
        }
    }

    /// Only `Processing` is worth retrying; everything else is terminal
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for DeviceErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a device capability call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct DeviceError {
    pub status: DeviceErrorStatus,
    pub message: String,
}

impl DeviceError {
    pub fn new(status: DeviceErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Which step of an orderly disconnect failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectStage {
    EndTransaction,
    Close,
}

impl fmt::Display for DisconnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndTransaction => f.write_str("Ending transaction"),
            Self::Close => f.write_str("Disconnecting printer"),
        }
    }
}

/// Errors reported to callers of the printer core.
///
/// Every variant maps to a stable code (see [`PrinterError::code`]) so that
/// remote callers can tell failures apart without parsing messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrinterError {
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    #[error("Discovery failed: {0}")]
    Discovery(DeviceError),

    #[error("Printer already connected to {current}")]
    AlreadyConnected { current: PrinterTarget },

    #[error("Creating printer failed: {0}")]
    DeviceCreation(DeviceError),

    #[error("Printer is not connected")]
    NotConnected,

    #[error("Connecting printer failed: {0}")]
    Connect(DeviceError),

    #[error("Beginning transaction failed: {0}")]
    Transaction(DeviceError),

    #[error("{stage} failed: {error}")]
    Disconnect {
        stage: DisconnectStage,
        error: DeviceError,
    },

    #[error("Failed to add print data: {0}")]
    BufferAppend(DeviceError),

    #[error("Failed to convert image data: {0}")]
    ImageDecode(String),

    #[error("Printer is not ready. Check device and paper.")]
    PrinterNotReady {
        status: Option<PrinterStatusSnapshot>,
    },

    #[error("Failed to send print job: {0}")]
    SendFailed(DeviceError),

    #[error("Print job failed with {code}. Check the device.")]
    PrintJobFailed { code: CallbackCode },

    #[error("A print job is already pending")]
    JobAlreadyPending,

    #[error("Print job did not complete within {0:?}")]
    JobTimeout(Duration),
}

impl PrinterError {
    /// Stable error code reported to remote callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "0x00000",
            Self::Discovery(_) => "0x00001",
            Self::AlreadyConnected { .. } => "0x00011",
            Self::DeviceCreation(_) => "0x00012",
            Self::NotConnected => "0x00013",
            Self::Connect(_) => "0x00014",
            Self::Transaction(_) => "0x00015",
            Self::Disconnect {
                stage: DisconnectStage::EndTransaction,
                ..
            } => "0x00020",
            Self::Disconnect {
                stage: DisconnectStage::Close,
                ..
            } => "0x00021",
            Self::BufferAppend(_) => "0x00030",
            Self::ImageDecode(_) => "0x00040",
            Self::PrinterNotReady { .. } => "0x00050",
            Self::SendFailed(_) => "0x00051",
            Self::PrintJobFailed { .. } => "0x00052",
            Self::JobAlreadyPending => "0x00053",
            Self::JobTimeout(_) => "0x00054",
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, PrinterError>;
