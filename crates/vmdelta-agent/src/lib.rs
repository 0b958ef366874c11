// vmdelta-agent: Run orchestrator
// Depends on vmdelta-core, vmdelta-runtime

pub mod run;

pub use run::{Failure, RunMode, RunReport, run};
