//! vCenter inventory source over the vSphere Automation REST API.
//!
//! One session is opened per run (`POST /api/session`) and deleted on
//! release. Every call is blocking; the inventory is small enough that
//! the per-VM detail requests are issued sequentially.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use vmdelta_core::config::VcenterConfig;
use vmdelta_core::descriptor::UNKNOWN_CLUSTER;
use vmdelta_core::inventory::{
    Device, Folder, GuestNetwork, GuestNic, HardwareConfig, InventorySource, MachineRecord,
    PowerState, ResourcePool,
};
use vmdelta_core::retry::retry;

const SESSION_HEADER: &str = "vmware-api-session-id";
const LOGIN_ATTEMPTS: u32 = 3;

// ============================================================================
// REST payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
    pub power_state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmInfo {
    #[serde(default)]
    pub identity: Option<VmIdentity>,
    pub memory: VmMemory,
    pub cpu: VmCpu,
    #[serde(default)]
    pub disks: HashMap<String, VmDisk>,
    #[serde(default)]
    pub nics: HashMap<String, VmNic>,
    #[serde(default)]
    pub cdroms: HashMap<String, VmLabeled>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmIdentity {
    pub bios_uuid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmMemory {
    #[serde(rename = "size_MiB")]
    pub size_mib: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmCpu {
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmDisk {
    pub label: String,
    /// Bytes. Absent for disks vCenter cannot size.
    pub capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmNic {
    pub label: String,
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmLabeled {
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestInterface {
    pub mac_address: Option<String>,
    pub ip: Option<GuestIpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestIpConfig {
    #[serde(default)]
    pub ip_addresses: Vec<GuestIpAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestIpAddress {
    pub ip_address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FolderSummary {
    folder: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ResourcePoolSummary {
    resource_pool: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ClusterSummary {
    cluster: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HostSummary {
    host: String,
    name: String,
}

// ============================================================================
// Mapping
// ============================================================================

/// Map the REST power state (`POWERED_ON`, ...) onto the record enum.
pub fn parse_power_state(raw: &str) -> PowerState {
    match raw {
        "POWERED_ON" => PowerState::PoweredOn,
        "SUSPENDED" => PowerState::Suspended,
        _ => PowerState::PoweredOff,
    }
}

/// Folder and compute placement of every VM, keyed by VM id.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    pub folders: HashMap<String, String>,
    pub compute: HashMap<String, String>,
    pub pooled: HashSet<String>,
}

impl Placement {
    fn resource_pool(&self, vm: &str) -> Option<ResourcePool> {
        if !self.pooled.contains(vm) {
            return None;
        }
        Some(ResourcePool {
            owner_name: self
                .compute
                .get(vm)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string()),
        })
    }
}

fn hardware_config(vm: &str, info: &VmInfo) -> Option<HardwareConfig> {
    let Some(uuid) = info.identity.as_ref().and_then(|i| i.bios_uuid.clone()) else {
        debug!(vm, "VM detail has no BIOS UUID");
        return None;
    };

    let mut devices: Vec<Device> = Vec::new();
    for disk in info.disks.values() {
        devices.push(Device::Disk {
            label: disk.label.clone(),
            capacity_kb: disk.capacity.map(|bytes| bytes / 1024),
        });
    }
    for nic in info.nics.values() {
        devices.push(Device::Ethernet {
            label: nic.label.clone(),
            mac_address: nic.mac_address.clone(),
        });
    }
    for cdrom in info.cdroms.values() {
        devices.push(Device::Other {
            label: cdrom.label.clone(),
        });
    }
    devices.sort_by(|a, b| device_label(a).cmp(device_label(b)));

    Some(HardwareConfig {
        uuid,
        memory_mb: info.memory.size_mib,
        num_cpu: info.cpu.count,
        devices,
    })
}

fn device_label(device: &Device) -> &str {
    match device {
        Device::Disk { label, .. } | Device::Ethernet { label, .. } | Device::Other { label } => {
            label.as_str()
        }
    }
}

fn guest_network(interfaces: Option<Vec<GuestInterface>>) -> GuestNetwork {
    match interfaces {
        None => GuestNetwork::Absent,
        Some(list) => GuestNetwork::Present(
            list.into_iter()
                .map(|iface| GuestNic {
                    mac_address: iface.mac_address.unwrap_or_default(),
                    ip_addresses: iface
                        .ip
                        .map(|ip| ip.ip_addresses.into_iter().map(|a| a.ip_address).collect())
                        .unwrap_or_default(),
                })
                .collect(),
        ),
    }
}

/// Assemble a record from the pieces fetched for one VM.
///
/// `info` is `None` when the detail call failed; the record then carries no
/// hardware configuration and fails descriptor building on its own.
pub fn assemble_record(
    summary: &VmSummary,
    info: Option<&VmInfo>,
    guest: Option<Vec<GuestInterface>>,
    placement: &Placement,
) -> MachineRecord {
    MachineRecord {
        name: summary.name.clone(),
        config: info.and_then(|i| hardware_config(&summary.vm, i)),
        power_state: parse_power_state(&summary.power_state),
        guest: guest_network(guest),
        resource_pool: placement.resource_pool(&summary.vm),
        folder: placement.folders.get(&summary.vm).map(|name| Folder {
            name: name.clone(),
        }),
    }
}

/// `https://<host>` unless the host already carries a scheme.
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// ============================================================================
// Client
// ============================================================================

fn build_client(verify_tls: bool) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("vmdelta/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .context("Failed to build HTTP client")
}

fn login(client: &Client, base: &str, cfg: &VcenterConfig) -> Result<String> {
    let url = format!("{}/api/session", base);
    let resp = client
        .post(&url)
        .basic_auth(&cfg.user, Some(&cfg.password))
        .send()
        .with_context(|| format!("HTTP request failed: {}", url))?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        anyhow::bail!("vCenter rejected the credentials for user {}", cfg.user);
    }
    if !status.is_success() {
        anyhow::bail!("HTTP {} for {}", status, url);
    }

    resp.json::<String>()
        .with_context(|| format!("Failed to parse session token from {}", url))
}

/// Live vCenter connection.
pub struct VcenterSource {
    client: Client,
    base: String,
    session: Option<String>,
}

impl VcenterSource {
    /// Open a session. Login is retried with backoff before giving up.
    pub fn connect(cfg: &VcenterConfig) -> Result<Self> {
        let client = build_client(cfg.verify_tls)?;
        let base = base_url(&cfg.host);
        if !cfg.verify_tls {
            debug!(host = %cfg.host, "TLS certificate verification disabled");
        }

        let token = retry(LOGIN_ATTEMPTS, Duration::from_secs(1), "vCenter login", || {
            login(&client, &base, cfg)
        })
        .with_context(|| format!("Failed to connect to vCenter at {}", cfg.host))?;

        info!(host = %cfg.host, user = %cfg.user, "connected to vCenter");
        Ok(Self {
            client,
            base,
            session: Some(token),
        })
    }

    fn token(&self) -> Result<&str> {
        self.session
            .as_deref()
            .context("vCenter session already released")
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::blocking::Response> {
        let url = format!("{}{}", self.base, path);
        self.client
            .get(&url)
            .header(SESSION_HEADER, self.token()?)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .with_context(|| format!("HTTP request failed: {}", url))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self.get(path, query)?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}{}", status, self.base, path);
        }
        resp.json::<T>()
            .with_context(|| format!("Failed to parse JSON from {}{}", self.base, path))
    }

    /// Like `get_json`, but a non-success status yields `None`.
    fn try_get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self.get(path, &[])?;
        let status = resp.status();
        if !status.is_success() {
            debug!(path, %status, "optional resource unavailable");
            return Ok(None);
        }
        resp.json::<T>()
            .map(Some)
            .with_context(|| format!("Failed to parse JSON from {}{}", self.base, path))
    }

    fn vm_ids(&self, filter: &str, id: &str) -> Result<Vec<String>> {
        let vms: Vec<VmSummary> = self.get_json("/api/vcenter/vm", &[(filter, id)])?;
        Ok(vms.into_iter().map(|v| v.vm).collect())
    }

    fn placement(&self) -> Result<Placement> {
        let mut placement = Placement::default();

        let folders: Vec<FolderSummary> =
            self.get_json("/api/vcenter/folder", &[("type", "VIRTUAL_MACHINE")])?;
        for folder in folders {
            for vm in self.vm_ids("folders", &folder.folder)? {
                placement.folders.insert(vm, folder.name.clone());
            }
        }

        let pools: Vec<ResourcePoolSummary> = self.get_json("/api/vcenter/resource-pool", &[])?;
        for pool in pools {
            placement
                .pooled
                .extend(self.vm_ids("resource_pools", &pool.resource_pool)?);
        }

        let clusters: Vec<ClusterSummary> = self.get_json("/api/vcenter/cluster", &[])?;
        for cluster in clusters {
            for vm in self.vm_ids("clusters", &cluster.cluster)? {
                placement.compute.insert(vm, cluster.name.clone());
            }
        }

        // Standalone hosts own their VMs when no cluster does.
        let hosts: Vec<HostSummary> = self.get_json("/api/vcenter/host", &[])?;
        for host in hosts {
            for vm in self.vm_ids("hosts", &host.host)? {
                placement
                    .compute
                    .entry(vm)
                    .or_insert_with(|| host.name.clone());
            }
        }

        Ok(placement)
    }
}

impl InventorySource for VcenterSource {
    fn fetch_machines(&mut self) -> Result<Vec<MachineRecord>> {
        let summaries: Vec<VmSummary> = self
            .get_json("/api/vcenter/vm", &[])
            .context("Failed to list virtual machines")?;
        let placement = self
            .placement()
            .context("Failed to resolve VM placement")?;

        let mut records = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let info = match self.get_json::<VmInfo>(&format!("/api/vcenter/vm/{}", summary.vm), &[])
            {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(vm = %summary.vm, name = %summary.name, error = %e, "VM detail unavailable");
                    None
                }
            };
            let guest = match self.try_get_json::<Vec<GuestInterface>>(&format!(
                "/api/vcenter/vm/{}/guest/networking/interfaces",
                summary.vm
            )) {
                Ok(guest) => guest,
                Err(e) => {
                    warn!(
                        vm = %summary.vm,
                        name = %summary.name,
                        error = %format!("{:#}", e),
                        "guest networking unreadable, reporting no interfaces"
                    );
                    None
                }
            };
            records.push(assemble_record(summary, info.as_ref(), guest, &placement));
        }

        info!(count = records.len(), "fetched inventory");
        Ok(records)
    }

    fn release(&mut self) -> Result<()> {
        let Some(token) = self.session.take() else {
            return Ok(());
        };
        let url = format!("{}/api/session", self.base);
        let resp = self
            .client
            .delete(&url)
            .header(SESSION_HEADER, token)
            .send()
            .with_context(|| format!("HTTP request failed: {}", url))?;
        if !resp.status().is_success() {
            anyhow::bail!("HTTP {} closing session at {}", resp.status(), url);
        }
        debug!("vCenter session closed");
        Ok(())
    }
}

impl Drop for VcenterSource {
    fn drop(&mut self) {
        if self.session.is_some()
            && let Err(e) = self.release()
        {
            warn!(error = %e, "failed to close vCenter session");
        }
    }
}
