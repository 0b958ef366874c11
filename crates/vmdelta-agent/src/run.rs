use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use vmdelta_core::audit;
use vmdelta_core::config::Config;
use vmdelta_core::descriptor;
use vmdelta_core::diff::{self, IdentitySet};
use vmdelta_core::inventory::{InventorySource, MachineRecord};
use vmdelta_core::naming;
use vmdelta_core::time;
use vmdelta_runtime::export;
use vmdelta_runtime::snapshot::SnapshotStore;
use vmdelta_runtime::ui;

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Read-only inspection of one machine.
    Single,
    /// Full differential run against the persisted snapshot.
    Diff,
}

/// A machine that could not be built or exported. The run carried on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub identity: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    /// Distinct identities fetched from the source.
    pub fetched: usize,
    /// Identities whose raw names collapsed onto another record's identity.
    pub duplicates: Vec<String>,
    /// Newly detected identities (diff mode), sorted.
    pub detected: Vec<String>,
    /// Identity matched by the selector (single mode).
    pub matched: Option<String>,
    pub exported: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    fn new(mode: RunMode, fetched: usize, duplicates: Vec<String>) -> Self {
        Self {
            mode,
            fetched,
            duplicates,
            detected: Vec::new(),
            matched: None,
            exported: Vec::new(),
            failures: Vec::new(),
        }
    }
}

// ============================================================================
// Source guard
// ============================================================================

/// Owns the inventory source for the run and releases it on drop, whichever
/// way the run ends.
struct SourceGuard<S: InventorySource> {
    source: S,
}

impl<S: InventorySource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        match self.source.release() {
            Ok(()) => debug!("inventory source released"),
            Err(e) => warn!(error = %e, "failed to release inventory source"),
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// Execute one poll-and-diff cycle.
///
/// With a `selector`, only the matching machine is exported and neither the
/// snapshot nor the detection log is touched. Otherwise every machine absent
/// from the previous snapshot is exported, the detection log is written, and
/// the full current identity set becomes the new snapshot.
pub fn run<S: InventorySource>(
    config: &Config,
    source: S,
    selector: Option<&str>,
) -> Result<RunReport> {
    let mut guard = SourceGuard { source };

    debug!(phase = "fetching", "run started");
    let records = guard
        .source
        .fetch_machines()
        .context("Failed to fetch inventory")?;
    let (inventory, duplicates) = index_by_identity(records);
    info!(machines = inventory.len(), "inventory indexed");

    let report = match selector {
        Some(selector) => single_mode(config, &inventory, duplicates, selector)?,
        None => diff_mode(config, &inventory, duplicates)?,
    };
    info!(
        mode = ?report.mode,
        fetched = report.fetched,
        detected = report.detected.len(),
        exported = report.exported.len(),
        failed = report.failures.len(),
        "run complete"
    );
    Ok(report)
}

/// Map records by normalized identity. Later records win; collisions are
/// reported back so they can be surfaced.
fn index_by_identity(
    records: Vec<MachineRecord>,
) -> (BTreeMap<String, MachineRecord>, Vec<String>) {
    let mut inventory = BTreeMap::new();
    let mut duplicates = Vec::new();

    for record in records {
        let identity = naming::normalize(&record.name);
        let raw_name = record.name.clone();
        if let Some(previous) = inventory.insert(identity.clone(), record) {
            warn!(
                identity = %identity,
                kept = %raw_name,
                dropped = %previous.name,
                "duplicate machine identity after normalization, keeping the last record"
            );
            if !duplicates.contains(&identity) {
                duplicates.push(identity);
            }
        }
    }

    duplicates.sort();
    (inventory, duplicates)
}

fn single_mode(
    config: &Config,
    inventory: &BTreeMap<String, MachineRecord>,
    duplicates: Vec<String>,
    selector: &str,
) -> Result<RunReport> {
    debug!(phase = "single", selector, "single machine mode");
    let mut report = RunReport::new(RunMode::Single, inventory.len(), duplicates);

    let Some((identity, record)) = inventory
        .iter()
        .find(|(identity, _)| naming::selector_matches(selector, identity))
    else {
        info!(selector, "no machine matches selector");
        return Ok(report);
    };

    report.matched = Some(identity.clone());
    // A broken record is still a per-machine failure, never fatal.
    export_one(config, identity, record, &mut report);
    Ok(report)
}

fn diff_mode(
    config: &Config,
    inventory: &BTreeMap<String, MachineRecord>,
    duplicates: Vec<String>,
) -> Result<RunReport> {
    debug!(phase = "diff", "differential mode");
    let mut report = RunReport::new(RunMode::Diff, inventory.len(), duplicates);

    let store = SnapshotStore::new(&config.paths.state_file);
    let previous = store
        .load()
        .with_context(|| format!("Failed to load snapshot {}", store.path().display()))?
        .into_set();
    let current: IdentitySet = inventory.keys().cloned().collect();

    report.detected = diff::diff(&previous, &current);
    info!(
        previous = previous.len(),
        current = current.len(),
        new = report.detected.len(),
        "computed inventory diff"
    );

    debug!(phase = "exporting", "exporting new machines");
    let detected_at = time::local_now();
    if !report.detected.is_empty() {
        ui::info("New machines detected:");
        for identity in &report.detected {
            ui::item(identity);
        }
    }
    for identity in report.detected.clone() {
        if let Some(record) = inventory.get(&identity) {
            export_one(config, &identity, record, &mut report);
        }
    }

    let entries = audit::entries_for(&report.detected, &detected_at);
    export::write_audit_log(&entries, &config.paths.log_file, config.audit_mode)?;

    debug!(phase = "persisting", "saving snapshot");
    store
        .save(&current)
        .with_context(|| format!("Failed to save snapshot {}", store.path().display()))?;
    info!(path = %store.path().display(), count = current.len(), "snapshot saved");

    Ok(report)
}

/// Build and export one machine, recording a failure instead of aborting.
fn export_one(config: &Config, identity: &str, record: &MachineRecord, report: &mut RunReport) {
    let result = descriptor::build(record, &config.datacenter)
        .map_err(anyhow::Error::from)
        .and_then(|d| export::export(&d, &config.paths.output_dir));

    match result {
        Ok(path) => report.exported.push(path),
        Err(e) => {
            warn!(identity, error = %format!("{:#}", e), "skipping machine");
            ui::warn(&format!("Skipped {}: {:#}", identity, e));
            report.failures.push(Failure {
                identity: identity.to_string(),
                error: format!("{:#}", e),
            });
        }
    }
}
