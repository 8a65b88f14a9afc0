//! Host-side work for odoodeploy: the forward provisioning Steps, their inverses, and the
//! runners that execute them.

pub mod certificates;
pub mod commands;
pub mod database;
pub mod firewall;
pub mod host;
pub mod nginx;
pub mod odoo_config;
pub mod packages;
pub mod pipeline;
pub mod record;
pub mod service;
pub mod sources;
pub mod teardown;
pub mod user;
pub mod wkhtmltopdf;

use odoodeploy_core::ProvisioningConfig;
use packages::PackageGroup;
use pipeline::{Step, Undo};

/// Forward Steps in execution order. The certificate Step exists only for HTTPS and sits
/// between the service start and the proxy, so a failed issuance aborts before any vhost
/// or firewall change.
pub fn provision_steps(cfg: &ProvisioningConfig) -> Vec<Box<dyn Step>> {
    let mut steps: Vec<Box<dyn Step>> = vec![
        Box::new(packages::InstallPackages),
        Box::new(wkhtmltopdf::InstallPdfRenderer),
        Box::new(database::EnsureDatabaseRole),
        Box::new(user::EnsureAccount),
        Box::new(sources::FetchSources),
        Box::new(sources::BuildRuntime),
        Box::new(odoo_config::RenderConfig),
        Box::new(service::InstallService),
    ];
    if cfg.proxy.is_https() {
        steps.push(Box::new(certificates::IssueCertificate));
    }
    steps.push(Box::new(nginx::ConfigureProxy));
    steps.push(Box::new(firewall::ConfigureFirewall));
    steps.push(Box::new(record::WriteReceipt));
    steps
}

/// Inverse Steps in execution order: stop the service before anything it holds open.
pub fn teardown_steps() -> Vec<Box<dyn Undo>> {
    vec![
        Box::new(service::RemoveService),
        Box::new(database::DropDatabases),
        Box::new(user::RemoveAccount::default()),
        Box::new(odoo_config::RemoveConfig),
        Box::new(odoo_config::RemoveLogs),
        Box::new(nginx::RemoveProxyConfig),
        Box::new(certificates::RemoveCertificates),
        Box::new(packages::RemovePackages(PackageGroup::PdfRenderer)),
        Box::new(packages::RemovePackages(PackageGroup::DatabaseEngine)),
        Box::new(packages::RemovePackages(PackageGroup::Proxy)),
        Box::new(firewall::RemoveFirewallRules),
        Box::new(record::RemoveReceipt),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use odoodeploy_core::config::CORE_REPO;
    use odoodeploy_core::{Layout, ProvisioningConfig, ProxyMode, Secrets};

    pub fn config(proxy: ProxyMode) -> ProvisioningConfig {
        ProvisioningConfig {
            layout: Layout::default(),
            version: "17.0".into(),
            workers: 5,
            core_repo: CORE_REPO.into(),
            enterprise_repo: "git@github.com:odoo/enterprise.git".into(),
            custom_repo: "https://git.example.org/acme/addons.git".into(),
            proxy,
            secrets: Secrets::generate(),
        }
    }
}
