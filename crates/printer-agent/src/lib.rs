pub mod api;
pub mod state;

use application::{
    CommandDispatcher, ConnectionManager, ConnectionSettings, DiscoverySession,
    DiscoverySettings, PrinterService,
};
use domain::event::EventPublisher;
use infrastructure::config::AgentConfig;
use infrastructure::{
    BroadcastEventPublisher, CompositeEventPublisher, SimulatedDiscovery,
    SimulatedPrinterFactory, SimulatorHandle, TracingEventPublisher,
};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;

const EVENT_BUFFER: usize = 256;
const COMMAND_QUEUE: usize = 64;

/// Everything the binary needs to run, wired from configuration
pub struct Agent {
    pub state: Arc<AppState>,
    pub dispatcher: CommandDispatcher,
    pub connection: ConnectionManager,
    pub discovery: Arc<DiscoverySession>,
    pub simulator: SimulatorHandle,
}

pub fn assemble(config: &AgentConfig) -> Agent {
    let events = BroadcastEventPublisher::new(EVENT_BUFFER);
    let publisher: Arc<dyn EventPublisher> = Arc::new(CompositeEventPublisher::new(vec![
        Arc::new(TracingEventPublisher),
        Arc::new(events.clone()),
    ]));

    let simulator =
        SimulatorHandle::with_latency(Duration::from_millis(config.simulator.print_latency_ms));
    let connection = ConnectionManager::new(
        Arc::new(SimulatedPrinterFactory::new(simulator.clone())),
        publisher.clone(),
        ConnectionSettings::from(&config.printer),
    );

    let backend = Arc::new(SimulatedDiscovery::new(
        config.simulator.devices.clone(),
        Duration::from_millis(config.simulator.announce_interval_ms),
    ));
    let discovery = Arc::new(DiscoverySession::new(
        backend,
        DiscoverySettings::from(&config.discovery),
    ));

    let service = Arc::new(
        PrinterService::new(connection.clone(), discovery.clone(), publisher)
            .with_discovery_filter(config.discovery.filter),
    );
    let (dispatcher, commands) = CommandDispatcher::new(service, COMMAND_QUEUE);

    Agent {
        state: Arc::new(AppState::new(commands, events)),
        dispatcher,
        connection,
        discovery,
        simulator,
    }
}
