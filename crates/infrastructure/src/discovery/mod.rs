mod simulated_discovery;

pub use simulated_discovery::SimulatedDiscovery;
