use anyhow::{Context, Result};
use clap::Parser;

use crate::logging::{self, LogFormat};

use vmdelta_agent::{RunMode, RunReport};
use vmdelta_core::config::Config;
use vmdelta_runtime::ui;
use vmdelta_runtime::vcenter::VcenterSource;

#[derive(Parser)]
#[command(
    name = "vmdelta",
    version,
    about = "Detect newly created vCenter virtual machines and export their descriptors",
    after_help = "Connection and paths come from VCENTER_HOST, VCENTER_USER, VCENTER_PASSWORD, \
DATACENTER_NAME, VM_STATE_FILE, VM_LOG_FILE, VM_OUTPUT_DIR, VM_LOG_MODE \
or a TOML file named by VMDELTA_CONFIG."
)]
struct Cli {
    /// Export a single machine by name (case-insensitive, `*` ignored) without touching saved state
    #[arg(long, value_name = "NAME")]
    single: Option<String>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogFormat::from_env());

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::debug!(?config, "configuration resolved");

    let spinner = ui::spinner(&format!("Connecting to {}...", config.vcenter.host));
    let source = VcenterSource::connect(&config.vcenter);
    spinner.finish_and_clear();

    let report = vmdelta_agent::run(&config, source?, cli.single.as_deref())?;
    print_summary(&report, cli.single.as_deref());
    Ok(())
}

fn print_summary(report: &RunReport, selector: Option<&str>) {
    for identity in &report.duplicates {
        ui::warn(&format!(
            "Several machines normalize to '{}'; only the last one was used",
            identity
        ));
    }

    match report.mode {
        RunMode::Single => {
            if report.matched.is_none() {
                ui::warn(&format!(
                    "No machine named '{}' found among {} machines",
                    selector.unwrap_or_default(),
                    report.fetched
                ));
            }
        }
        RunMode::Diff => {
            if report.detected.is_empty() {
                ui::info(&format!(
                    "No new machines ({} in inventory)",
                    report.fetched
                ));
            } else {
                ui::success(&format!(
                    "{} new machine(s) detected, {} exported",
                    report.detected.len(),
                    report.exported.len()
                ));
            }
        }
    }

    if !report.failures.is_empty() {
        ui::error(&format!(
            "{} machine(s) could not be exported",
            report.failures.len()
        ));
    }
}
