use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Device reported by a discovery scan. The transport may report the same
/// physical device more than once per scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
    pub device_name: String,
    /// Address usable with `connectPrinter`
    pub target: String,
    pub ip_address: String,
    pub mac_address: String,
    pub device_type: i32,
    pub bd_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    #[default]
    All,
    Tcp,
    Bluetooth,
    Usb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Printer,
    All,
}

/// Scan filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryFilter {
    pub port_type: PortType,
    pub device_type: DeviceKind,
    /// Only report devices carrying the vendor's name prefix
    pub name_filter: bool,
    /// Include devices already bonded over Bluetooth
    pub bonded_devices: bool,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self {
            port_type: PortType::All,
            device_type: DeviceKind::Printer,
            name_filter: true,
            bonded_devices: true,
        }
    }
}

/// Callback invoked once per discovered device
pub type DiscoveryListener = Box<dyn Fn(DiscoveredDevice) + Send + Sync>;

/// Capability over the vendor discovery service
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Start scanning; `listener` is called for every device until `stop`
    async fn start(
        &self,
        filter: &DiscoveryFilter,
        listener: DiscoveryListener,
    ) -> Result<(), DeviceError>;

    /// Stop scanning. May fail with `Processing` while the scan winds down.
    async fn stop(&self) -> Result<(), DeviceError>;
}
