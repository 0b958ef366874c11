// vmdelta-cli: Clap entry point, logging, run summary
// Depends on vmdelta-core, vmdelta-runtime, vmdelta-agent

pub mod commands;
pub mod logging;

pub use commands::run;
