use serde::{Deserialize, Serialize};

/// Connection state for a single logical printer target
///
/// `InTransaction` implies the transport is connected. `Connected` only exists
/// between opening the transport and beginning the transaction; callers never
/// observe it after a connect call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No transport connection and no device instance
    #[default]
    Disconnected,
    /// Transport open, transaction not started yet
    Connected,
    /// Transport open and transaction active; content may be buffered
    InTransaction,
}

impl ConnectionState {
    /// Check if the transport is open
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::InTransaction)
    }

    /// Check if content may be appended
    pub fn accepts_content(&self) -> bool {
        matches!(self, Self::InTransaction)
    }

    /// Transition to connected state once the transport is open
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected => Ok(Self::Connected),
            _ => Err("Can only open a connection from Disconnected state"),
        }
    }

    /// Transition to transaction state
    pub fn to_in_transaction(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connected => Ok(Self::InTransaction),
            _ => Err("Can only begin a transaction from Connected state"),
        }
    }

    /// Transition to connected state after the transaction ended
    pub fn to_transaction_ended(&self) -> Result<Self, &'static str> {
        match self {
            Self::InTransaction => Ok(Self::Connected),
            _ => Err("Can only end a transaction from InTransaction state"),
        }
    }

    /// Transition to disconnected state (always allowed)
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::InTransaction => "in_transaction",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
