//! Domain layer - Pure printer orchestration types with no external dependencies
//!
//! This crate contains:
//! - Value objects (PrinterTarget, PrintOperation, PrinterStatusSnapshot)
//! - The connection state machine (ConnectionState)
//! - Capability traits for the vendor SDK (PrinterDevice, DeviceDiscovery)
//! - The error taxonomy reported to callers
//! - Domain events
//!
//! Principles:
//! - No dependencies on infrastructure or a runtime
//! - Invariants enforced at construction time
//! - Testable in isolation

pub mod discovery;
pub mod error;
pub mod event;
pub mod printer;

// Re-export commonly used types
pub use discovery::{DeviceDiscovery, DiscoveredDevice, DiscoveryFilter};
pub use error::{DeviceError, DeviceErrorStatus, PrinterError};
pub use event::DomainEvent;
pub use printer::{
    ConnectionState, PrintOperation, PrinterDevice, PrinterSeries, PrinterStatusSnapshot,
    PrinterTarget, is_printable,
};
