use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Power state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoweredOn => write!(f, "poweredOn"),
            Self::PoweredOff => write!(f, "poweredOff"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

/// A virtual hardware device attached to a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    /// `capacity_kb` is `None` when the platform cannot size the backing file.
    Disk {
        label: String,
        capacity_kb: Option<u64>,
    },
    Ethernet { label: String, mac_address: Option<String> },
    /// Anything else (CD-ROM, controllers, ...). Kept so device lists stay faithful.
    Other { label: String },
}

/// Hardware configuration. Absent on inaccessible or orphaned machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Platform UUID, stable across runs and renames.
    pub uuid: String,
    pub memory_mb: u64,
    pub num_cpu: u32,
    pub devices: Vec<Device>,
}

/// One network interface as seen by the guest tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestNic {
    pub mac_address: String,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// Guest networking facet. `Absent` when the guest tools report nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestNetwork {
    #[default]
    Absent,
    Present(Vec<GuestNic>),
}

/// Resource pool a machine runs in, with the name of its owning compute resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub owner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
}

/// Raw machine record as yielded by an inventory source. Read-only for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    /// Display name, possibly decorated (`web01*`).
    pub name: String,
    pub config: Option<HardwareConfig>,
    pub power_state: PowerState,
    #[serde(default)]
    pub guest: GuestNetwork,
    pub resource_pool: Option<ResourcePool>,
    pub folder: Option<Folder>,
}

/// Source of machine records, typically a virtualization management endpoint.
///
/// Implementations hold a connection; `release` must be safe to call once the
/// run is over, whatever its outcome.
pub trait InventorySource {
    /// List every virtual machine under the root scope.
    fn fetch_machines(&mut self) -> Result<Vec<MachineRecord>>;

    /// Release the underlying connection.
    fn release(&mut self) -> Result<()>;
}
