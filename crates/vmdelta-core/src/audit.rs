use serde::{Deserialize, Serialize};

/// One newly detected machine, as written to the detection log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub identity: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub detected_at: String,
}

impl AuditEntry {
    pub fn new(identity: &str, detected_at: &str) -> Self {
        Self {
            identity: identity.to_string(),
            detected_at: detected_at.to_string(),
        }
    }
}

/// How the detection log is written at the end of a diff run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// The log holds only the latest run's detections.
    #[default]
    Replace,
    /// Detections accumulate across runs.
    Append,
}

impl AuditMode {
    /// Parse from a config string argument.
    pub fn from_str_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" | "overwrite" => Some(Self::Replace),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

/// Entries for one run; every entry shares the run's detection timestamp.
pub fn entries_for(identities: &[String], detected_at: &str) -> Vec<AuditEntry> {
    identities
        .iter()
        .map(|id| AuditEntry::new(id, detected_at))
        .collect()
}
