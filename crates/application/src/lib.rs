//! Application layer - Printer use cases
//!
//! Connection lifecycle, command buffering, job submission and discovery,
//! plus the inbound command surface that drives them.

pub mod discovery;
pub mod dispatch;
pub mod printer;
pub mod service;

pub use discovery::{DiscoverySession, DiscoverySettings};
pub use dispatch::{CommandDispatcher, CommandSender, DispatchError};
pub use printer::{ConnectionManager, ConnectionSettings, JobReceipt, JobTicket};
pub use service::{CommandResponse, PrinterCommand, PrinterService};
