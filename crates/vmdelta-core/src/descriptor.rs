use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::{Device, GuestNetwork, MachineRecord, PowerState};
use crate::naming;

/// Cluster label for machines outside any resource pool (templates, orphans).
pub const UNKNOWN_CLUSTER: &str = "Unknown";

const KB_PER_GB: u128 = 1024 * 1024;

/// Binary activity classification derived from the power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Offline,
}

impl From<PowerState> for Status {
    fn from(state: PowerState) -> Self {
        match state {
            PowerState::PoweredOn => Self::Active,
            PowerState::PoweredOff | PowerState::Suspended => Self::Offline,
        }
    }
}

/// Exported network interface. `name` is positional (`eth0`, `eth1`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(rename = "macaddress")]
    pub mac_address: String,
    #[serde(rename = "ipaddresses")]
    pub ip_addresses: Vec<String>,
}

/// Canonical machine descriptor, written to `<output_dir>/<file_stem>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Normalized identity.
    pub name: String,
    pub uuid: String,
    pub power_state: PowerState,
    /// Memory in MB.
    pub memory: u64,
    pub vcpus: u32,
    /// Total allocated disk in GB, rounded to 2 decimals.
    pub disk: f64,
    pub cluster: String,
    pub datacenter: String,
    pub folder: String,
    pub interfaces: Vec<Interface>,
    pub status: Status,
}

/// A single record could not be turned into a descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("machine '{machine}' has no {field}")]
    MissingField {
        machine: String,
        field: &'static str,
    },
}

/// Build the descriptor for one record.
pub fn build(record: &MachineRecord, datacenter: &str) -> Result<Descriptor, RecordError> {
    let name = naming::normalize(&record.name);
    let config = record
        .config
        .as_ref()
        .ok_or_else(|| RecordError::MissingField {
            machine: name.clone(),
            field: "hardware configuration",
        })?;

    let mut disk_kb: u64 = 0;
    for device in &config.devices {
        if let Device::Disk { capacity_kb, .. } = device {
            disk_kb += capacity_kb.ok_or_else(|| RecordError::MissingField {
                machine: name.clone(),
                field: "disk capacity",
            })?;
        }
    }

    Ok(Descriptor {
        name,
        uuid: config.uuid.clone(),
        power_state: record.power_state,
        memory: config.memory_mb,
        vcpus: config.num_cpu,
        disk: kb_to_gb_rounded(disk_kb),
        cluster: record
            .resource_pool
            .as_ref()
            .map(|rp| rp.owner_name.clone())
            .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string()),
        datacenter: datacenter.to_string(),
        folder: record
            .folder
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_default(),
        interfaces: interfaces(&record.guest),
        status: record.power_state.into(),
    })
}

/// KB to GB, rounded half-up to 2 decimals.
///
/// Rounding happens on the exact KB count so that values sitting on a
/// `.005` boundary always round up, independent of float representation.
pub fn kb_to_gb_rounded(kb: u64) -> f64 {
    let hundredths = (kb as u128 * 100 + KB_PER_GB / 2) / KB_PER_GB;
    hundredths as f64 / 100.0
}

fn interfaces(guest: &GuestNetwork) -> Vec<Interface> {
    match guest {
        GuestNetwork::Absent => Vec::new(),
        GuestNetwork::Present(nics) => nics
            .iter()
            .enumerate()
            .map(|(idx, nic)| Interface {
                name: format!("eth{}", idx),
                mac_address: nic.mac_address.clone(),
                ip_addresses: nic.ip_addresses.clone(),
            })
            .collect(),
    }
}
