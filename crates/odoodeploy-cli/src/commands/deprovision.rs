use crate::privilege;
use anyhow::{Context, Result};
use odoodeploy_core::Layout;
use odoodeploy_provision::host::Host;
use odoodeploy_provision::pipeline::{run_teardown, teardown_summary, TeardownContext};
use odoodeploy_provision::record::load_receipt;
use odoodeploy_provision::teardown;
use odoodeploy_provision::teardown_steps;
use odoodeploy_ui::{log, DialoguerPrompter};

pub async fn run() -> Result<()> {
    privilege::require_root()?;

    let layout = Layout::default();
    let prompter = DialoguerPrompter;
    if !teardown::confirm_teardown(&prompter, &layout)? {
        println!("Aborted. Nothing was changed.");
        return Ok(());
    }

    let host = Host::system();
    let receipt = load_receipt(&host);
    match &receipt {
        Some(r) => log::info(&format!(
            "Found receipt: Odoo {} served for {} ({}) since {}",
            r.version,
            r.host,
            r.proxy,
            r.created_at.format("%Y-%m-%d %H:%M UTC")
        )),
        None => log::info("No deployment receipt found; removing by convention"),
    }

    let plan = teardown::plan(&host, &layout, receipt.as_ref(), &prompter)
        .await
        .context("Teardown cancelled before any removal")?;
    let reports = run_teardown(
        &teardown_steps(),
        &TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        },
    )
    .await;

    println!();
    for line in teardown_summary(&reports) {
        println!("{line}");
    }
    Ok(())
}
