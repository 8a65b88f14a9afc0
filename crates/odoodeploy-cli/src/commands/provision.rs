use crate::privilege;
use anyhow::{Context as _, Result};
use chrono::Utc;
use odoodeploy_core::config::detected_cores;
use odoodeploy_core::resolve::{self, Overrides};
use odoodeploy_core::AppError;
use odoodeploy_provision::host::Host;
use odoodeploy_provision::pipeline::{run_forward, Context, StepOutcome};
use odoodeploy_provision::provision_steps;
use odoodeploy_ui::summary::print_summary;
use odoodeploy_ui::{log, DialoguerPrompter};

pub async fn run() -> Result<()> {
    privilege::require_root()?;

    // Every prompt is answered before the first Step mutates anything.
    let cfg = resolve::resolve(Overrides::from_env(), &DialoguerPrompter, detected_cores())
        .context("Could not resolve the deployment settings")?;
    log::info(&format!(
        "Deploying Odoo {} for {} ({}, {} workers)",
        cfg.version,
        cfg.proxy.host(),
        cfg.proxy.kind(),
        cfg.workers
    ));

    let host = Host::system();
    let steps = provision_steps(&cfg);
    let ctx = Context {
        host: &host,
        config: &cfg,
    };
    let reports = match run_forward(&steps, &ctx).await {
        Ok(reports) => reports,
        Err(e) => {
            if let AppError::ExternalTool { command, .. } = e.root_cause() {
                log::info(&format!("Failed command: {command}"));
            }
            return Err(anyhow::Error::new(e).context(
                "Provisioning aborted; fix the cause and re-run, or run `odoodeploy deprovision`",
            ));
        }
    };

    let skipped = reports
        .iter()
        .filter(|r| r.outcome == StepOutcome::AlreadySatisfied)
        .count();
    if skipped > 0 {
        log::notice(&format!("{skipped} of {} steps were already satisfied", reports.len()));
    }

    print_summary(&cfg, Utc::now());
    Ok(())
}
