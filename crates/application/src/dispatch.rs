use std::sync::Arc;

use domain::PrinterError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::{CommandResponse, PrinterCommand, PrinterService};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Command dispatcher is not running")]
    Closed,

    #[error(transparent)]
    Printer(#[from] PrinterError),
}

/// A queued command and the channel its outcome is returned on
pub struct CommandEnvelope {
    pub command: PrinterCommand,
    pub reply: oneshot::Sender<Result<CommandResponse, PrinterError>>,
}

/// Cloneable producer side of the command queue
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandEnvelope>,
}

impl CommandSender {
    /// Queue a command and wait for its outcome
    pub async fn send(&self, command: PrinterCommand) -> Result<CommandResponse, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CommandEnvelope { command, reply })
            .await
            .map_err(|_| DispatchError::Closed)?;

        let response = rx.await.map_err(|_| DispatchError::Closed)??;
        Ok(response)
    }
}

/// Pulls commands off the queue and runs each one on its own task.
///
/// Commands are not ordered relative to each other; the connection manager's
/// lock is what serializes printer state changes.
pub struct CommandDispatcher {
    service: Arc<PrinterService>,
    rx: mpsc::Receiver<CommandEnvelope>,
}

impl CommandDispatcher {
    pub fn new(service: Arc<PrinterService>, capacity: usize) -> (Self, CommandSender) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { service, rx }, CommandSender { tx })
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("🖨️ Command dispatcher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("🖨️ Shutdown requested. Command dispatcher stopping.");
                    break;
                }
                envelope = self.rx.recv() => {
                    let Some(CommandEnvelope { command, reply }) = envelope else {
                        // All senders dropped
                        info!("🖨️ Command channel closed. Command dispatcher shutting down.");
                        break;
                    };

                    let service = self.service.clone();
                    tokio::spawn(async move {
                        let action = command.action();
                        let outcome = service.handle(command).await;
                        match &outcome {
                            Ok(_) => debug!(action, "Command succeeded"),
                            Err(e) => warn!(action, code = e.code(), error = %e, "Command failed"),
                        }
                        if reply.send(outcome).is_err() {
                            debug!(action, "Caller went away before the reply");
                        }
                    });
                }
            }
        }
    }
}
