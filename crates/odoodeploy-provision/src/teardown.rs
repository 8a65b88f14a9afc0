//! Teardown gate and plan. Every operator decision is collected here, before the first
//! inverse Step runs.

use crate::database;
use crate::host::Host;
use crate::packages::PackageGroup;
use odoodeploy_core::config::TEARDOWN_TOKEN;
use odoodeploy_core::receipt::Receipt;
use odoodeploy_core::resolve::Prompter;
use odoodeploy_core::{AppError, Layout};
use odoodeploy_ui::log;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CertRemoval {
    #[default]
    Keep,
    Domain(String),
    All,
}

/// Operator choices for the optional, broad-impact removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownPlan {
    /// Databases not owned by the service role that the operator agreed to drop.
    pub other_databases: Vec<String>,
    pub certificates: CertRemoval,
    pub remove_pdf_renderer: bool,
    pub remove_database_engine: bool,
    pub remove_proxy: bool,
    pub remove_firewall_rules: bool,
}

impl TeardownPlan {
    pub fn removes(&self, group: PackageGroup) -> bool {
        match group {
            PackageGroup::PdfRenderer => self.remove_pdf_renderer,
            PackageGroup::DatabaseEngine => self.remove_database_engine,
            PackageGroup::Proxy => self.remove_proxy,
        }
    }
}

/// Byte-for-byte comparison; no trimming, no case folding.
pub fn token_matches(answer: &str, expected: &str) -> bool {
    answer == expected
}

/// Two-part destructive-action gate: a yes/no, then the literal token.
pub fn confirm_teardown(prompter: &dyn Prompter, layout: &Layout) -> Result<bool, AppError> {
    let proceed = prompter.confirm(
        &format!(
            "Remove the '{}' service, account, home directory {} and its databases?",
            layout.service_name,
            layout.home.display()
        ),
        false,
    )?;
    if !proceed {
        return Ok(false);
    }
    let typed = prompter.input(&format!("Type {TEARDOWN_TOKEN} to confirm"), None)?;
    Ok(token_matches(&typed, TEARDOWN_TOKEN))
}

/// Ask about each optional removal. Runs only after the gate passed.
pub async fn plan(
    host: &Host,
    layout: &Layout,
    receipt: Option<&Receipt>,
    prompter: &dyn Prompter,
) -> Result<TeardownPlan, AppError> {
    let mut plan = TeardownPlan::default();

    // Read-only; a stopped or missing database engine just means there is nothing to offer.
    match database::other_databases(host, &layout.user).await {
        Ok(others) if !others.is_empty() => {
            log::warn(&format!(
                "Databases NOT owned by '{}': {}",
                layout.user,
                others.join(", ")
            ));
            if prompter.confirm(
                "Also drop ALL of these databases? They may belong to other applications",
                false,
            )? {
                plan.other_databases = others;
            }
        }
        Ok(_) => {}
        Err(e) => log::warn(&format!("Could not list other databases: {e}")),
    }

    let domain = receipt.and_then(Receipt::certificate_domain);
    let items = vec![
        match domain {
            Some(d) => format!("Remove the certificate for {d}"),
            None => "Remove the certificate for one domain".to_string(),
        },
        "Remove ALL certificates on this host".to_string(),
        "Keep certificates".to_string(),
    ];
    plan.certificates = match prompter.select("TLS certificates", &items, 2)? {
        0 => {
            let d = match domain {
                Some(d) => d.to_string(),
                None => prompter.input("Domain of the certificate to remove", None)?,
            };
            let d = d.trim().to_string();
            if d.is_empty() {
                CertRemoval::Keep
            } else {
                CertRemoval::Domain(d)
            }
        }
        1 => CertRemoval::All,
        _ => CertRemoval::Keep,
    };

    for group in [
        PackageGroup::PdfRenderer,
        PackageGroup::DatabaseEngine,
        PackageGroup::Proxy,
    ] {
        let yes = prompter.confirm(&format!("Uninstall {}?", group.description()), false)?;
        match group {
            PackageGroup::PdfRenderer => plan.remove_pdf_renderer = yes,
            PackageGroup::DatabaseEngine => plan.remove_database_engine = yes,
            PackageGroup::Proxy => plan.remove_proxy = yes,
        }
    }

    plan.remove_firewall_rules =
        prompter.confirm("Delete the HTTP/HTTPS firewall rules (SSH stays open)?", false)?;

    Ok(plan)
}
