use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use vmdelta_core::diff::IdentitySet;
use vmdelta_core::naming;

use crate::files;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {} is not a JSON array of machine names", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write snapshot {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of loading the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Found(IdentitySet),
    /// No snapshot yet (first run). Equivalent to an empty set.
    NotFound,
}

impl Loaded {
    pub fn into_set(self) -> IdentitySet {
        match self {
            Self::Found(set) => set,
            Self::NotFound => IdentitySet::new(),
        }
    }
}

/// File-backed store holding exactly one identity snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted identities.
    ///
    /// Entries are normalized on the way in so hand-edited files compare
    /// the same way fetched names do.
    pub fn load(&self) -> Result<Loaded, SnapshotError> {
        let text = files::read_optional(&self.path).map_err(|source| SnapshotError::Read {
            path: self.path.clone(),
            source,
        })?;
        let Some(text) = text else {
            debug!(path = %self.path.display(), "no previous snapshot");
            return Ok(Loaded::NotFound);
        };

        let names: Vec<String> =
            serde_json::from_str(&text).map_err(|source| SnapshotError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let set: IdentitySet = names.iter().map(|n| naming::normalize(n)).collect();
        debug!(path = %self.path.display(), count = set.len(), "loaded snapshot");
        Ok(Loaded::Found(set))
    }

    /// Overwrite the store with `identities`, written as a sorted JSON array.
    pub fn save(&self, identities: &IdentitySet) -> Result<(), SnapshotError> {
        let names: Vec<&String> = identities.iter().collect();
        let json = serde_json::to_vec_pretty(&names).map_err(|e| SnapshotError::Write {
            path: self.path.clone(),
            source: e.into(),
        })?;
        files::write_atomic(&self.path, &json).map_err(|source| SnapshotError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = identities.len(), "saved snapshot");
        Ok(())
    }
}
