use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::{EventPublisher, PublishError};

use crate::discovery::DiscoveredDevice;
use crate::printer::{CallbackCode, PrinterTarget};

/// Domain events that can occur in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// Transport opened and transaction started
    PrinterConnected {
        target: PrinterTarget,
        timestamp: DateTime<Utc>,
    },

    /// Printer released, either on request or by forced recovery
    PrinterDisconnected {
        target: PrinterTarget,
        forced: bool,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Buffered content handed to the device
    JobSubmitted {
        job_id: String,
        operations: usize,
        timestamp: DateTime<Utc>,
    },

    /// Device signalled the outcome of a job
    JobCompleted {
        job_id: String,
        success: bool,
        code: CallbackCode,
        timestamp: DateTime<Utc>,
    },

    /// A discovery scan reported a device
    DeviceDiscovered {
        device: DiscoveredDevice,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Create a PrinterConnected event
    pub fn printer_connected(target: PrinterTarget) -> Self {
        Self::PrinterConnected {
            target,
            timestamp: Utc::now(),
        }
    }

    /// Create a PrinterDisconnected event
    pub fn printer_disconnected(target: PrinterTarget, forced: bool, reason: impl Into<String>) -> Self {
        Self::PrinterDisconnected {
            target,
            forced,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a JobSubmitted event
    pub fn job_submitted(job_id: impl Into<String>, operations: usize) -> Self {
        Self::JobSubmitted {
            job_id: job_id.into(),
            operations,
            timestamp: Utc::now(),
        }
    }

    /// Create a JobCompleted event
    pub fn job_completed(job_id: impl Into<String>, code: CallbackCode) -> Self {
        Self::JobCompleted {
            job_id: job_id.into(),
            success: code.is_success(),
            code,
            timestamp: Utc::now(),
        }
    }

    /// Create a DeviceDiscovered event
    pub fn device_discovered(device: DiscoveredDevice) -> Self {
        Self::DeviceDiscovered {
            device,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PrinterConnected { timestamp, .. } => *timestamp,
            Self::PrinterDisconnected { timestamp, .. } => *timestamp,
            Self::JobSubmitted { timestamp, .. } => *timestamp,
            Self::JobCompleted { timestamp, .. } => *timestamp,
            Self::DeviceDiscovered { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::PrinterConnected { .. } => "PrinterConnected",
            Self::PrinterDisconnected { .. } => "PrinterDisconnected",
            Self::JobSubmitted { .. } => "JobSubmitted",
            Self::JobCompleted { .. } => "JobCompleted",
            Self::DeviceDiscovered { .. } => "DeviceDiscovered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_disconnected_event() {
        let target = PrinterTarget::new("TCP:192.168.0.10").unwrap();
        let event = DomainEvent::printer_disconnected(target.clone(), true, "send failed");

        assert_eq!(event.event_type(), "PrinterDisconnected");
        match event {
            DomainEvent::PrinterDisconnected {
                target: t,
                forced,
                reason,
                ..
            } => {
                assert_eq!(t, target);
                assert!(forced);
                assert_eq!(reason, "send failed");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_job_completed_event_tracks_success() {
        let ok = DomainEvent::job_completed("job-1", CallbackCode::Success);
        let failed = DomainEvent::job_completed("job-2", CallbackCode::ErrCoverOpen);

        assert!(matches!(ok, DomainEvent::JobCompleted { success: true, .. }));
        assert!(matches!(
            failed,
            DomainEvent::JobCompleted { success: false, .. }
        ));
    }

    #[test]
    fn test_event_serialization() {
        let event = DomainEvent::job_submitted("job-1", 4);

        let json_str = serde_json::to_string(&event).unwrap();
        assert!(json_str.contains("\"type\":\"JobSubmitted\""));

        let deserialized: DomainEvent = serde_json::from_str(&json_str).unwrap();
        assert_eq!(deserialized.event_type(), "JobSubmitted");
    }
}
