use application::CommandSender;
use infrastructure::BroadcastEventPublisher;

/// Shared handles for the HTTP layer
#[derive(Clone)]
pub struct AppState {
    pub commands: CommandSender,
    pub events: BroadcastEventPublisher,
}

impl AppState {
    pub fn new(commands: CommandSender, events: BroadcastEventPublisher) -> Self {
        Self { commands, events }
    }
}
