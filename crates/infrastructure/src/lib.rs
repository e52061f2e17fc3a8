//! Infrastructure layer - External integrations
//!
//! Simulated vendor backends, layered configuration, image payload decoding
//! and event sinks.

pub mod config;
pub mod discovery;
pub mod imaging;
pub mod messaging;
pub mod printer;

pub use config::AgentConfig;
pub use discovery::SimulatedDiscovery;
pub use imaging::decode_data_url;
pub use messaging::{BroadcastEventPublisher, CompositeEventPublisher, TracingEventPublisher};
pub use printer::{SimulatedPrinter, SimulatedPrinterFactory, SimulatorHandle};
