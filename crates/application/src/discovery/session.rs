use std::sync::Arc;
use std::time::Duration;

use domain::PrinterError;
use domain::discovery::{DeviceDiscovery, DiscoveredDevice, DiscoveryFilter};
use domain::error::Result;
use infrastructure::config::DiscoveryConfig;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Retry policy for stopping a scan that is still winding down
#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
    pub stop_retry_interval: Duration,
    /// Maximum stop attempts; `None` keeps retrying
    pub stop_retry_limit: Option<u32>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            stop_retry_interval: config.stop_retry_interval(),
            stop_retry_limit: config.stop_retry_limit(),
        }
    }
}

/// Devices reported by the running scan, in arrival order
pub type DiscoveryStream = mpsc::UnboundedReceiver<DiscoveredDevice>;

/// Start/stop lifecycle around the discovery backend.
///
/// Guarded by its own lock, independent of any printer connection.
pub struct DiscoverySession {
    discovery: Arc<dyn DeviceDiscovery>,
    settings: DiscoverySettings,
    active: Mutex<bool>,
}

impl DiscoverySession {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, settings: DiscoverySettings) -> Self {
        Self {
            discovery,
            settings,
            active: Mutex::new(false),
        }
    }

    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }

    /// Start a scan. A running scan is stopped first (best effort) so
    /// listeners never stack.
    pub async fn start(&self, filter: &DiscoveryFilter) -> Result<DiscoveryStream> {
        let mut active = self.active.lock().await;

        if *active {
            info!("Restarting discovery");
            if let Err(e) = self.stop_locked(&mut active).await {
                warn!(error = %e, "Stopping previous discovery failed, starting anyway");
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.discovery
            .start(
                filter,
                Box::new(move |device| {
                    // Subscriber gone; the scan keeps running until stopped
                    let _ = tx.send(device);
                }),
            )
            .await
            .map_err(PrinterError::Discovery)?;

        *active = true;
        info!(filter = ?filter, "🔍 Discovery started");
        Ok(rx)
    }

    /// Stop the scan, retrying while the backend reports it is still processing
    pub async fn stop(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        self.stop_locked(&mut active).await
    }

    async fn stop_locked(&self, active: &mut bool) -> Result<()> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.discovery.stop().await {
                Ok(()) => {
                    *active = false;
                    info!(attempts, "🔍 Discovery stopped");
                    return Ok(());
                }
                Err(e) if e.status.is_transient() && self.may_retry(attempts) => {
                    debug!(attempts, "Discovery still processing, retrying stop");
                    tokio::time::sleep(self.settings.stop_retry_interval).await;
                }
                Err(e) => {
                    *active = false;
                    warn!(attempts, error = %e, "Stopping discovery failed");
                    return Err(PrinterError::Discovery(e));
                }
            }
        }
    }

    fn may_retry(&self, attempts: u32) -> bool {
        self.settings
            .stop_retry_limit
            .is_none_or(|limit| attempts < limit)
    }
}
