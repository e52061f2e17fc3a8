use serde::{Deserialize, Serialize};

/// Tri-state flag as cached by the device (`Unknown` until first status update)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFlag {
    True,
    False,
    #[default]
    Unknown,
}

impl StatusFlag {
    pub fn is_false(&self) -> bool {
        matches!(self, Self::False)
    }
}

impl From<bool> for StatusFlag {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperState {
    Ok,
    NearEnd,
    Empty,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    #[default]
    NoError,
    Mechanical,
    AutoCutter,
    Unrecoverable,
    AutoRecover,
    Unknown,
}

/// Point-in-time device status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatusSnapshot {
    pub online: StatusFlag,
    pub connection: StatusFlag,
    pub cover_open: StatusFlag,
    pub paper: PaperState,
    pub paper_feed: StatusFlag,
    pub error_status: ErrorStatus,
}

impl PrinterStatusSnapshot {
    /// Snapshot of a healthy, reachable printer
    pub fn ready() -> Self {
        Self {
            online: StatusFlag::True,
            connection: StatusFlag::True,
            cover_open: StatusFlag::False,
            paper: PaperState::Ok,
            paper_feed: StatusFlag::False,
            error_status: ErrorStatus::NoError,
        }
    }
}

/// Decide whether a job may be sent.
///
/// Only an explicit `False` on the connection or online flag blocks a send.
/// Cover, paper and error status are diagnostics and never gate the job.
pub fn is_printable(snapshot: Option<&PrinterStatusSnapshot>) -> bool {
    let Some(status) = snapshot else {
        return false;
    };

    if status.connection.is_false() {
        return false;
    }
    if status.online.is_false() {
        return false;
    }

    true
}

/// Status snapshot plus the computed printable flag, as returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: PrinterStatusSnapshot,
    pub is_printable: bool,
}

impl From<PrinterStatusSnapshot> for StatusReport {
    fn from(status: PrinterStatusSnapshot) -> Self {
        Self {
            status,
            is_printable: is_printable(Some(&status)),
        }
    }
}
