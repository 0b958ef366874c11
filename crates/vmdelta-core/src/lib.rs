// vmdelta-core: Pure types, identity normalization, descriptors, diffing
// No internal vmdelta dependencies: this is the foundation crate.

pub mod audit;
pub mod config;
pub mod descriptor;
pub mod diff;
pub mod inventory;
pub mod naming;
pub mod retry;
pub mod time;
