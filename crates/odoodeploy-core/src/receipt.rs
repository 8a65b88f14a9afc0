use crate::config::ProvisioningConfig;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a provisioning run left on the host. Carries no secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub version: String,
    pub user: String,
    pub home: String,
    pub config_path: String,
    pub proxy: String,
    pub host: String,
    pub vhost_name: String,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    pub fn from_config(cfg: &ProvisioningConfig, created_at: DateTime<Utc>) -> Self {
        Self {
            version: cfg.version.clone(),
            user: cfg.layout.user.clone(),
            home: cfg.layout.home.display().to_string(),
            config_path: cfg.layout.config_path.display().to_string(),
            proxy: cfg.proxy.kind().to_string(),
            host: cfg.proxy.host().to_string(),
            vhost_name: cfg.vhost_name(),
            created_at,
        }
    }

    /// Domain a certificate was issued for, if the HTTPS variant ran.
    pub fn certificate_domain(&self) -> Option<&str> {
        (self.proxy == "https").then_some(self.host.as_str())
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(text)?)
    }
}
