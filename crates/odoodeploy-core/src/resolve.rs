//! Input resolution: environment overrides first, interactive prompts for the rest.
//!
//! Runs before any Step, so Steps never prompt.

use crate::config::{self, Layout, ProvisioningConfig, ProxyMode};
use crate::error::AppError;
use crate::secrets::Secrets;

/// Interactive question source. The CLI backs this with `dialoguer`.
pub trait Prompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, AppError>;
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, AppError>;
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, AppError>;
}

/// Values pre-seeded from the environment (or a `.env` file).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub domain: Option<String>,
    pub enable_https: Option<bool>,
    pub admin_email: Option<String>,
    pub enterprise_repo: Option<String>,
    pub custom_repo: Option<String>,
    pub version: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            domain: get("ODOO_DOMAIN"),
            enable_https: get("ODOO_ENABLE_HTTPS").and_then(|v| parse_flag(&v)),
            admin_email: get("ODOO_ADMIN_EMAIL"),
            enterprise_repo: get("ODOO_ENTERPRISE_REPO"),
            custom_repo: get("ODOO_CUSTOM_REPO"),
            version: get("ODOO_VERSION"),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn required(
    preset: Option<String>,
    field: &str,
    prompt: &str,
    prompter: &dyn Prompter,
) -> Result<String, AppError> {
    let value = match preset {
        Some(v) => v,
        None => prompter.input(prompt, None)?,
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::MissingInput(field.into()));
    }
    Ok(value)
}

/// Build the immutable configuration for a run on a host with `cores` CPU cores.
pub fn resolve(
    overrides: Overrides,
    prompter: &dyn Prompter,
    cores: usize,
) -> Result<ProvisioningConfig, AppError> {
    let version = overrides
        .version
        .unwrap_or_else(|| config::DEFAULT_VERSION.to_string());

    let host = required(
        overrides.domain,
        "domain or server IP",
        "Domain name or server IP",
        prompter,
    )?;

    let proxy = if config::is_ip_address(&host) {
        ProxyMode::HttpOnly { host }
    } else {
        let https = match overrides.enable_https {
            Some(flag) => flag,
            None => prompter.confirm(
                &format!("Issue a Let's Encrypt certificate and serve {host} over HTTPS?"),
                true,
            )?,
        };
        if https {
            let email = required(
                overrides.admin_email,
                "admin email",
                "Contact email for certificate issuance",
                prompter,
            )?;
            ProxyMode::Https {
                domain: host,
                email,
            }
        } else {
            ProxyMode::HttpOnly { host }
        }
    };

    let enterprise_repo = required(
        overrides.enterprise_repo,
        "enterprise repository URL",
        "Enterprise repository URL",
        prompter,
    )?;
    let custom_repo = required(
        overrides.custom_repo,
        "custom addons repository URL",
        "Custom addons repository URL",
        prompter,
    )?;

    Ok(ProvisioningConfig {
        layout: Layout::default(),
        version,
        workers: config::worker_count(cores.max(1)),
        core_repo: config::CORE_REPO.into(),
        enterprise_repo,
        custom_repo,
        proxy,
        secrets: Secrets::generate(),
    })
}
