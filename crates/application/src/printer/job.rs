use chrono::{DateTime, Utc};
use domain::PrinterError;
use domain::error::Result;
use domain::printer::{PrinterStatusSnapshot, ReceiveEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Outcome of a job the device reported as printed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: String,
    pub device_job_id: Option<String>,
    pub status: PrinterStatusSnapshot,
    pub completed_at: DateTime<Utc>,
}

/// The single in-flight job of a connection
pub(crate) struct PendingJob {
    pub(crate) id: String,
    reply: oneshot::Sender<Result<JobReceipt>>,
}

impl PendingJob {
    pub(crate) fn new(id: String) -> (Self, oneshot::Receiver<Result<JobReceipt>>) {
        let (reply, rx) = oneshot::channel();
        (Self { id, reply }, rx)
    }

    /// Resolve from the device completion signal
    pub(crate) fn complete(self, event: ReceiveEvent) {
        let result = if event.code.is_success() {
            Ok(JobReceipt {
                job_id: self.id.clone(),
                device_job_id: event.device_job_id,
                status: event.status,
                completed_at: Utc::now(),
            })
        } else {
            Err(PrinterError::PrintJobFailed { code: event.code })
        };
        self.resolve(result);
    }

    pub(crate) fn resolve(self, result: Result<JobReceipt>) {
        if self.reply.send(result).is_err() {
            tracing::debug!(job_id = %self.id, "Job ticket dropped before completion");
        }
    }
}

/// Handle to a submitted job. Await [`JobTicket::wait`] for the device outcome.
///
/// The job timeout runs from submission whether or not the ticket is awaited;
/// dropping the ticket does not cancel the job.
#[derive(Debug)]
pub struct JobTicket {
    job_id: String,
    rx: oneshot::Receiver<Result<JobReceipt>>,
}

impl JobTicket {
    pub(crate) fn new(job_id: String, rx: oneshot::Receiver<Result<JobReceipt>>) -> Self {
        Self { job_id, rx }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the completion signal, a timeout or a disconnect
    pub async fn wait(self) -> Result<JobReceipt> {
        self.rx.await.unwrap_or(Err(PrinterError::NotConnected))
    }
}
