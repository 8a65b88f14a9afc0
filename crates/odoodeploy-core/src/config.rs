use crate::secrets::Secrets;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub const ODOO_USER: &str = "odoo";
pub const ODOO_HOME: &str = "/opt/odoo";
pub const ODOO_CONFIG: &str = "/etc/odoo.conf";
pub const ODOO_LOG_DIR: &str = "/var/log/odoo";
pub const ODOO_SERVICE: &str = "odoo";
pub const DEFAULT_VERSION: &str = "17.0";
pub const CORE_REPO: &str = "https://github.com/odoo/odoo.git";
pub const HTTP_PORT: u16 = 8069;
pub const REALTIME_PORT: u16 = 8072;

pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const NGINX_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const NGINX_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";
pub const NGINX_LOG_DIR: &str = "/var/log/nginx";
pub const LETSENCRYPT_LIVE: &str = "/etc/letsencrypt/live";
pub const RECEIPT_PATH: &str = "/etc/odoodeploy/receipt.json";

/// Literal token the operator must type before teardown mutates anything.
pub const TEARDOWN_TOKEN: &str = "REMOVE";

/// Fixed on-host locations shared by the forward and teardown pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub user: String,
    pub home: PathBuf,
    pub config_path: PathBuf,
    pub log_dir: PathBuf,
    pub service_name: String,
    pub http_port: u16,
    pub realtime_port: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            user: ODOO_USER.into(),
            home: PathBuf::from(ODOO_HOME),
            config_path: PathBuf::from(ODOO_CONFIG),
            log_dir: PathBuf::from(ODOO_LOG_DIR),
            service_name: ODOO_SERVICE.into(),
            http_port: HTTP_PORT,
            realtime_port: REALTIME_PORT,
        }
    }
}

impl Layout {
    /// Checkout of the core repository.
    pub fn core_dir(&self) -> PathBuf {
        self.home.join("odoo")
    }

    pub fn enterprise_dir(&self) -> PathBuf {
        self.home.join("enterprise")
    }

    pub fn custom_dir(&self) -> PathBuf {
        self.home.join("custom-addons")
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.home.join("venv")
    }

    pub fn python(&self) -> PathBuf {
        self.venv_dir().join("bin/python3")
    }

    pub fn pip(&self) -> PathBuf {
        self.venv_dir().join("bin/pip")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("odoo.log")
    }

    pub fn unit_path(&self) -> PathBuf {
        Path::new(SYSTEMD_UNIT_DIR).join(format!("{}.service", self.service_name))
    }

    /// Proxy access/error logs written by the rendered vhost.
    pub fn proxy_logs(&self) -> [PathBuf; 2] {
        let dir = Path::new(NGINX_LOG_DIR);
        [
            dir.join(format!("{}.access.log", self.service_name)),
            dir.join(format!("{}.error.log", self.service_name)),
        ]
    }

    /// Addon search path: enterprise, then custom, then core addons.
    ///
    /// Earlier entries win module-name conflicts in the application server.
    pub fn addons_path(&self) -> String {
        [
            self.enterprise_dir(),
            self.custom_dir(),
            self.core_dir().join("addons"),
        ]
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Worker processes for a host with `cores` CPU cores.
pub fn worker_count(cores: usize) -> usize {
    2 * cores + 1
}

/// CPU cores visible to this process, never less than one.
pub fn detected_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn is_ip_address(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}

/// The two mutually exclusive reverse-proxy variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    /// Port 80 only, catch-all server name, no certificate.
    HttpOnly { host: String },
    /// Port 80 redirects to 443; certificate issued for `domain`.
    Https { domain: String, email: String },
}

impl ProxyMode {
    pub fn host(&self) -> &str {
        match self {
            ProxyMode::HttpOnly { host } => host,
            ProxyMode::Https { domain, .. } => domain,
        }
    }

    pub fn is_https(&self) -> bool {
        matches!(self, ProxyMode::Https { .. })
    }

    pub fn public_url(&self) -> String {
        match self {
            ProxyMode::HttpOnly { host } => format!("http://{host}"),
            ProxyMode::Https { domain, .. } => format!("https://{domain}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProxyMode::HttpOnly { .. } => "http",
            ProxyMode::Https { .. } => "https",
        }
    }
}

/// Resolved inputs for a provisioning run. Built once, then only borrowed.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub layout: Layout,
    pub version: String,
    pub workers: usize,
    pub core_repo: String,
    pub enterprise_repo: String,
    pub custom_repo: String,
    pub proxy: ProxyMode,
    pub secrets: Secrets,
}

impl ProvisioningConfig {
    /// Major version number, e.g. 17 for "17.0". Unparseable versions count as current.
    pub fn major_version(&self) -> u32 {
        self.version
            .split('.')
            .next()
            .and_then(|m| m.parse().ok())
            .unwrap_or(u32::MAX)
    }

    /// Config key the real-time port is read from; renamed in 16.0.
    pub fn realtime_port_key(&self) -> &'static str {
        if self.major_version() >= 16 {
            "gevent_port"
        } else {
            "longpolling_port"
        }
    }

    /// File name of the vhost under sites-available.
    pub fn vhost_name(&self) -> String {
        match &self.proxy {
            ProxyMode::HttpOnly { .. } => self.layout.service_name.clone(),
            ProxyMode::Https { domain, .. } => domain.clone(),
        }
    }

    pub fn vhost_path(&self) -> PathBuf {
        Path::new(NGINX_SITES_AVAILABLE).join(self.vhost_name())
    }

    pub fn vhost_link(&self) -> PathBuf {
        Path::new(NGINX_SITES_ENABLED).join(self.vhost_name())
    }
}

#[cfg(test)]
pub(crate) fn sample_config(proxy: ProxyMode) -> ProvisioningConfig {
    ProvisioningConfig {
        layout: Layout::default(),
        version: DEFAULT_VERSION.into(),
        workers: worker_count(2),
        core_repo: CORE_REPO.into(),
        enterprise_repo: "git@github.com:odoo/enterprise.git".into(),
        custom_repo: "https://git.example.org/acme/addons.git".into(),
        proxy,
        secrets: Secrets {
            admin_password: "admin-secret".into(),
            db_password: "db-secret".into(),
        },
    }
}
