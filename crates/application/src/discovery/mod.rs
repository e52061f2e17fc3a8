mod session;

pub use session::{DiscoverySession, DiscoverySettings, DiscoveryStream};
