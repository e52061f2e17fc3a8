use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::operation::{CutMode, ImageBlock, PrintOperation, TextStyle};
use super::series::PrinterSeries;
use super::status::PrinterStatusSnapshot;
use super::target::PrinterTarget;
use crate::error::DeviceError;

/// Result code carried by an asynchronous job completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackCode {
    Success,
    ErrTimeout,
    ErrNotFound,
    ErrAutoRecover,
    ErrCoverOpen,
    ErrCutter,
    ErrMechanical,
    ErrEmpty,
    ErrUnrecoverable,
    ErrFailure,
    ErrInProgress,
}

impl CallbackCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "CODE_SUCCESS",
            Self::ErrTimeout => "CODE_ERR_TIMEOUT",
            Self::ErrNotFound => "CODE_ERR_NOT_FOUND",
            Self::ErrAutoRecover => "CODE_ERR_AUTORECOVER",
            Self::ErrCoverOpen => "CODE_ERR_COVER_OPEN",
            Self::ErrCutter => "CODE_ERR_CUTTER",
            Self::ErrMechanical => "CODE_ERR_MECHANICAL",
            Self::ErrEmpty => "CODE_ERR_EMPTY",
            Self::ErrUnrecoverable => "CODE_ERR_UNRECOVERABLE",
            Self::ErrFailure => "CODE_ERR_FAILURE",
            Self::ErrInProgress => "CODE_ERR_IN_PROGRESS",
        }
    }
}

impl std::fmt::Display for CallbackCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion signal delivered once per sent job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveEvent {
    pub code: CallbackCode,
    pub status: PrinterStatusSnapshot,
    /// Identifier assigned by the device, when it reports one
    pub device_job_id: Option<String>,
}

/// Callback registered with a device to receive completion signals
pub type ReceiveListener = Box<dyn Fn(ReceiveEvent) + Send + Sync>;

/// Capability over the vendor print engine.
///
/// Connection, transaction and send calls block on the transport. Content
/// calls only stage data in the device-side command buffer.
#[async_trait]
pub trait PrinterDevice: Send + Sync {
    /// Open the transport to the given address
    async fn connect(&mut self, target: &PrinterTarget, timeout: Duration)
    -> Result<(), DeviceError>;

    /// Close the transport
    async fn disconnect(&mut self) -> Result<(), DeviceError>;

    async fn begin_transaction(&mut self) -> Result<(), DeviceError>;

    async fn end_transaction(&mut self) -> Result<(), DeviceError>;

    /// Set font, size and alignment for following text; `None` fields reset
    /// to the device default
    fn add_text_style(&mut self, style: &TextStyle) -> Result<(), DeviceError>;

    fn add_text(&mut self, text: &str) -> Result<(), DeviceError>;

    fn add_feed_line(&mut self, lines: u8) -> Result<(), DeviceError>;

    fn add_image(&mut self, image: &ImageBlock) -> Result<(), DeviceError>;

    fn add_cut(&mut self, mode: CutMode) -> Result<(), DeviceError>;

    /// Transmit the staged command buffer. Completion arrives later through
    /// the receive listener.
    async fn send_data(&mut self, timeout: Duration) -> Result<(), DeviceError>;

    /// Drop everything staged in the device-side command buffer
    fn clear_buffer(&mut self);

    /// Last status cached by the device, if any was received
    fn status(&self) -> Option<PrinterStatusSnapshot>;

    /// Register (or with `None`, detach) the completion listener
    fn set_receive_listener(&mut self, listener: Option<ReceiveListener>);

    /// Stage one buffered operation using the primitive content calls.
    ///
    /// Every text run restates its full style so a run without overrides
    /// never inherits the previous run's font, size or alignment.
    fn add_operation(&mut self, operation: &PrintOperation) -> Result<(), DeviceError> {
        match operation {
            PrintOperation::Text { content, style } => {
                self.add_text_style(style)?;
                self.add_text(content)
            }
            PrintOperation::Feed { lines } => self.add_feed_line(*lines),
            PrintOperation::Image(image) => self.add_image(image),
            PrintOperation::Cut { mode } => self.add_cut(*mode),
        }
    }
}

/// Creates device instances for a printer series
pub trait PrinterDeviceFactory: Send + Sync {
    fn create(&self, series: PrinterSeries) -> Result<Box<dyn PrinterDevice>, DeviceError>;
}
