use serde::{Deserialize, Serialize};

use crate::error::{PrinterError, Result};

/// Value object representing a printer address
///
/// The address is opaque to the core (e.g. `TCP:192.168.0.10` or
/// `BT:00:01:90:AA:BB:CC`); only emptiness is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrinterTarget(String);

impl PrinterTarget {
    /// Create a new PrinterTarget with validation
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let trimmed = address.trim();

        if trimmed.is_empty() {
            return Err(PrinterError::invalid_argument(
                "Printer target cannot be empty",
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PrinterTarget {
    type Error = PrinterError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PrinterTarget> for String {
    fn from(target: PrinterTarget) -> Self {
        target.0
    }
}
