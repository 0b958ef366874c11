// vmdelta-runtime: File-backed state, descriptor export, vCenter inventory source
// Depends on vmdelta-core

pub mod export;
pub mod files;
pub mod snapshot;
pub mod ui;
pub mod vcenter;
