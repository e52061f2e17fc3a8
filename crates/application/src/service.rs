use std::sync::Arc;

use domain::discovery::DiscoveryFilter;
use domain::error::Result;
use domain::event::EventPublisher;
use domain::printer::{
    Alignment, Font, Halftone, ImageBlock, ImageMode, PrintOperation, PrinterSeries,
    PrinterStatusSnapshot, PrinterTarget, StatusReport, TextSize, TextStyle,
};
use domain::DomainEvent;
use infrastructure::imaging::decode_data_url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::discovery::DiscoverySession;
use crate::printer::{ConnectionManager, JobReceipt};

/// Inbound command surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PrinterCommand {
    /// Without a filter the service's configured one is used
    StartDiscover {
        #[serde(default)]
        filter: Option<DiscoveryFilter>,
    },
    StopDiscover,
    ConnectPrinter {
        target: String,
        #[serde(default)]
        model: Option<String>,
    },
    DisconnectPrinter,
    /// Fragments equal to `"\n"` become a line feed
    PrintText {
        data: Vec<String>,
        #[serde(default)]
        font: Option<Font>,
        /// Magnification applied to width and height
        #[serde(default)]
        size: Option<u8>,
        #[serde(default)]
        align: Option<Alignment>,
        /// Send the buffer right away
        #[serde(default)]
        terminate: bool,
    },
    PrintImage {
        data: String,
        #[serde(default)]
        mode: ImageMode,
        #[serde(default)]
        halftone: Halftone,
        #[serde(default)]
        terminate: bool,
    },
    SendData,
    GetPrinterStatus,
    GetSupportedModels,
}

impl PrinterCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::StartDiscover { .. } => "startDiscover",
            Self::StopDiscover => "stopDiscover",
            Self::ConnectPrinter { .. } => "connectPrinter",
            Self::DisconnectPrinter => "disconnectPrinter",
            Self::PrintText { .. } => "printText",
            Self::PrintImage { .. } => "printImage",
            Self::SendData => "sendData",
            Self::GetPrinterStatus => "getPrinterStatus",
            Self::GetSupportedModels => "getSupportedModels",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum CommandResponse {
    Ack,
    Status(StatusReport),
    Models { models: Vec<String> },
    Job(JobReceipt),
}

/// Executes inbound commands against the connection and discovery managers
pub struct PrinterService {
    connection: ConnectionManager,
    discovery: Arc<DiscoverySession>,
    publisher: Arc<dyn EventPublisher>,
    default_filter: DiscoveryFilter,
}

impl PrinterService {
    pub fn new(
        connection: ConnectionManager,
        discovery: Arc<DiscoverySession>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            connection,
            discovery,
            publisher,
            default_filter: DiscoveryFilter::default(),
        }
    }

    pub fn with_discovery_filter(mut self, filter: DiscoveryFilter) -> Self {
        self.default_filter = filter;
        self
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub async fn handle(&self, command: PrinterCommand) -> Result<CommandResponse> {
        debug!(action = command.action(), "Handling command");

        match command {
            PrinterCommand::StartDiscover { filter } => {
                let filter = filter.unwrap_or(self.default_filter);
                self.start_discover(filter).await
            }
            PrinterCommand::StopDiscover => {
                self.discovery.stop().await?;
                Ok(CommandResponse::Ack)
            }
            PrinterCommand::ConnectPrinter { target, model } => {
                let target = PrinterTarget::new(target)?;
                let series = self.connection.resolve_series(model.as_deref());
                self.connection.ensure_connected(target, series).await?;
                Ok(CommandResponse::Ack)
            }
            PrinterCommand::DisconnectPrinter => {
                self.connection.disconnect().await?;
                Ok(CommandResponse::Ack)
            }
            PrinterCommand::PrintText {
                data,
                font,
                size,
                align,
                terminate,
            } => {
                let style = TextStyle {
                    font,
                    size: size.map(TextSize::uniform).transpose()?,
                    align,
                };
                let operations = text_operations(data, style);
                self.append_all(operations, terminate).await
            }
            PrinterCommand::PrintImage {
                data,
                mode,
                halftone,
                terminate,
            } => {
                let bitmap = decode_data_url(&data)?;
                let image = PrintOperation::Image(ImageBlock {
                    bitmap,
                    mode,
                    halftone,
                });
                self.append_all(vec![image], terminate).await
            }
            PrinterCommand::SendData => self.append_all(Vec::new(), true).await,
            PrinterCommand::GetPrinterStatus => {
                self.connection.ensure_ready().await?;
                let report = match self.connection.status().await {
                    Some(status) => StatusReport::from(status),
                    None => StatusReport {
                        status: PrinterStatusSnapshot::default(),
                        is_printable: false,
                    },
                };
                Ok(CommandResponse::Status(report))
            }
            PrinterCommand::GetSupportedModels => {
                let mut models: Vec<String> = PrinterSeries::supported_models()
                    .into_iter()
                    .map(String::from)
                    .collect();
                models.sort();
                Ok(CommandResponse::Models { models })
            }
        }
    }

    /// Stage the command's operations as one unit; with `terminate`, the job
    /// is submitted under the same lock and awaited after it is released
    async fn append_all(
        &self,
        operations: Vec<PrintOperation>,
        terminate: bool,
    ) -> Result<CommandResponse> {
        match self.connection.append_batch(operations, terminate).await? {
            Some(ticket) => Ok(CommandResponse::Job(ticket.wait().await?)),
            None => Ok(CommandResponse::Ack),
        }
    }

    async fn start_discover(&self, filter: DiscoveryFilter) -> Result<CommandResponse> {
        let mut devices = self.discovery.start(&filter).await?;
        let publisher = self.publisher.clone();

        // Runs until the scan drops its listener
        tokio::spawn(async move {
            while let Some(device) = devices.recv().await {
                info!(device = %device.device_name, address = %device.target, "Device discovered");
                if let Err(e) = publisher.publish(DomainEvent::device_discovered(device)).await {
                    warn!(error = %e, "Failed to publish discovered device");
                }
            }
            debug!("Discovery stream closed");
        });

        Ok(CommandResponse::Ack)
    }
}

fn text_operations(data: Vec<String>, style: TextStyle) -> Vec<PrintOperation> {
    data.into_iter()
        .map(|fragment| {
            if fragment == "\n" {
                PrintOperation::feed(1)
            } else {
                PrintOperation::text(fragment, style)
            }
        })
        .collect()
}
