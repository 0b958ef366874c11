use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use vmdelta_core::audit::{AuditEntry, AuditMode};
use vmdelta_core::descriptor::Descriptor;
use vmdelta_core::naming;

use crate::files;
use crate::ui;

/// Path the descriptor for `identity` is written to.
pub fn descriptor_path(output_dir: &Path, identity: &str) -> PathBuf {
    output_dir.join(format!("{}.json", naming::file_stem(identity)))
}

/// Write one descriptor to `<output_dir>/<file_stem>.json`, replacing any
/// previous file for the same machine.
pub fn export(descriptor: &Descriptor, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let path = descriptor_path(output_dir, &descriptor.name);
    let json = serde_json::to_vec_pretty(descriptor)
        .with_context(|| format!("Failed to serialize descriptor for {}", descriptor.name))?;
    files::write_atomic(&path, &json)
        .with_context(|| format!("Failed to write descriptor: {}", path.display()))?;

    info!(machine = %descriptor.name, path = %path.display(), "exported descriptor");
    ui::info(&format!("Exported: {}", path.display()));
    Ok(path)
}

/// Load the detection log. A missing file is an empty log.
pub fn read_audit_log(path: &Path) -> Result<Vec<AuditEntry>> {
    let text = files::read_optional(path)
        .with_context(|| format!("Failed to read detection log: {}", path.display()))?;
    match text {
        Some(text) => serde_json::from_str(&text)
            .with_context(|| format!("Detection log is malformed: {}", path.display())),
        None => Ok(Vec::new()),
    }
}

/// Write this run's detections to the log and return what the file now holds.
///
/// `Replace` drops earlier runs' entries; `Append` keeps them.
pub fn write_audit_log(
    entries: &[AuditEntry],
    path: &Path,
    mode: AuditMode,
) -> Result<Vec<AuditEntry>> {
    let mut log = match mode {
        AuditMode::Replace => Vec::new(),
        AuditMode::Append => read_audit_log(path)?,
    };
    log.extend_from_slice(entries);

    let json = serde_json::to_vec_pretty(&log).context("Failed to serialize detection log")?;
    files::write_atomic(path, &json)
        .with_context(|| format!("Failed to write detection log: {}", path.display()))?;

    info!(
        path = %path.display(),
        new = entries.len(),
        total = log.len(),
        mode = ?mode,
        "wrote detection log"
    );
    Ok(log)
}
