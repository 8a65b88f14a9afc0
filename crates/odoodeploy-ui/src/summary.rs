use chrono::{DateTime, Utc};
use odoodeploy_core::config::RECEIPT_PATH;
use odoodeploy_core::ProvisioningConfig;

/// Lines of the final provisioning report. Includes both generated secrets in clear text.
pub fn summary_lines(cfg: &ProvisioningConfig, finished_at: DateTime<Utc>) -> Vec<String> {
    let divider = "=".repeat(60);
    let layout = &cfg.layout;
    let service = &layout.service_name;
    let mut lines = vec![
        divider.clone(),
        format!("  Odoo {} Deployment Complete", cfg.version),
        divider.clone(),
        format!("  URL:               {}", cfg.proxy.public_url()),
        format!("  Finished:          {}", finished_at.format("%Y-%m-%d %H:%M:%S UTC")),
        format!("  Workers:           {}", cfg.workers),
        format!("  System user:       {}", layout.user),
        format!("  Home:              {}", layout.home.display()),
        format!("  Config file:       {}", layout.config_path.display()),
        format!("  Log file:          {}", layout.log_file().display()),
        format!("  Receipt:           {RECEIPT_PATH}"),
        String::new(),
        "  Generated credentials (shown once, store them now):".into(),
        format!("    Master password:   {}", cfg.secrets.admin_password),
        format!("    Database password: {}", cfg.secrets.db_password),
        String::new(),
        "  Service:".into(),
        format!("    systemctl status {service}"),
        format!("    journalctl -u {service} -f"),
    ];
    if !cfg.proxy.is_https() {
        lines.push(String::new());
        lines.push("  Serving plain HTTP. Point a domain at this host and re-run to enable HTTPS.".into());
    }
    lines.push(divider);
    lines
}

/// Print the provisioning summary.
pub fn print_summary(cfg: &ProvisioningConfig, finished_at: DateTime<Utc>) {
    println!();
    for line in summary_lines(cfg, finished_at) {
        println!("{line}");
    }
    println!();
}
