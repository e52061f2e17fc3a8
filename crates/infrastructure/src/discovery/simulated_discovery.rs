use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use domain::discovery::{
    DeviceDiscovery, DeviceKind, DiscoveredDevice, DiscoveryFilter, DiscoveryListener, PortType,
};
use domain::error::{DeviceError, DeviceErrorStatus};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct DiscoveryState {
    scan: Option<CancellationToken>,
    /// Remaining stop calls to reject with `Processing`
    busy_stops: u32,
    starts: usize,
    stops: usize,
}

/// Discovery backend announcing a fixed device list on an interval
pub struct SimulatedDiscovery {
    devices: Vec<DiscoveredDevice>,
    interval: Duration,
    state: Mutex<DiscoveryState>,
}

/// `tokio::time::interval` rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl SimulatedDiscovery {
    pub fn new(devices: Vec<DiscoveredDevice>, interval: Duration) -> Self {
        Self {
            devices,
            interval: interval.max(MIN_INTERVAL),
            state: Mutex::new(DiscoveryState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DiscoveryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reject the next `count` stop calls as if the scan were still winding down
    pub fn fail_next_stops(&self, count: u32) {
        self.lock().busy_stops = count;
    }

    pub fn start_count(&self) -> usize {
        self.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.lock().stops
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scan.is_some()
    }

    fn matches(filter: &DiscoveryFilter, device: &DiscoveredDevice) -> bool {
        let prefix = match filter.port_type {
            PortType::All => None,
            PortType::Tcp => Some("TCP:"),
            PortType::Bluetooth => Some("BT:"),
            PortType::Usb => Some("USB:"),
        };
        if let Some(prefix) = prefix {
            if !device.target.to_ascii_uppercase().starts_with(prefix) {
                return false;
            }
        }
        if filter.name_filter && !device.device_name.starts_with("TM-") {
            return false;
        }
        // Every simulated device is a printer
        matches!(filter.device_type, DeviceKind::Printer | DeviceKind::All)
    }
}

#[async_trait]
impl DeviceDiscovery for SimulatedDiscovery {
    async fn start(
        &self,
        filter: &DiscoveryFilter,
        listener: DiscoveryListener,
    ) -> Result<(), DeviceError> {
        let token = CancellationToken::new();
        {
            let mut state = self.lock();
            if state.scan.is_some() {
                return Err(DeviceError::new(
                    DeviceErrorStatus::Illegal,
                    "Discovery already running",
                ));
            }
            state.starts += 1;
            state.scan = Some(token.clone());
        }

        let devices: Vec<DiscoveredDevice> = self
            .devices
            .iter()
            .filter(|device| Self::matches(filter, device))
            .cloned()
            .collect();
        let mut ticker = tokio::time::interval(self.interval);

        tracing::info!(devices = devices.len(), "Simulated discovery started");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        for device in &devices {
                            listener(device.clone());
                        }
                    }
                }
            }
            tracing::debug!("Simulated discovery scan finished");
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.stops += 1;

        if state.busy_stops > 0 {
            state.busy_stops -= 1;
            return Err(DeviceError::new(
                DeviceErrorStatus::Processing,
                "Discovery is still processing",
            ));
        }

        if let Some(token) = state.scan.take() {
            token.cancel();
            tracing::info!("Simulated discovery stopped");
        }
        Ok(())
    }
}
