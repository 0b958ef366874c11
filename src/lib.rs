//! # vmdelta: vCenter inventory differ and descriptor exporter
//!
//! Facade crate that re-exports the vmdelta workspace crates so consumers
//! can depend on a single `vmdelta` library.
//!
//! ## Crate breakdown
//!
//! | Module | Crate | Purpose |
//! |--------|-------|---------|
//! | [`core`] | vmdelta-core | Identity normalization, records, descriptors, diffing, config |
//! | [`runtime`] | vmdelta-runtime | Snapshot store, exporter, vCenter inventory source |
//! | [`agent`] | vmdelta-agent | Run orchestrator |
//! | [`cli`] | vmdelta-cli | Argument parsing, logging, run summary |

pub use vmdelta_agent as agent;
pub use vmdelta_cli as cli;
pub use vmdelta_core as core;
pub use vmdelta_runtime as runtime;
