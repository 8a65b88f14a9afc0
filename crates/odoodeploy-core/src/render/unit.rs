use crate::config::ProvisioningConfig;

/// Seconds systemd waits before restarting a crashed server.
pub const RESTART_SEC: u32 = 5;

/// Render the systemd unit for the application server.
pub fn render(cfg: &ProvisioningConfig) -> String {
    let layout = &cfg.layout;
    format!(
        "[Unit]
Description=Odoo {version}
Requires=postgresql.service
After=network.target postgresql.service

[Service]
Type=simple
SyslogIdentifier={service}
User={user}
Group={user}
WorkingDirectory={home}
ExecStart={python} {odoo_bin} -c {config}
Restart=always
RestartSec={RESTART_SEC}
StandardOutput=journal+console

[Install]
WantedBy=multi-user.target
",
        version = cfg.version,
        service = layout.service_name,
        user = layout.user,
        home = layout.home.display(),
        python = layout.python().display(),
        odoo_bin = layout.core_dir().join("odoo-bin").display(),
        config = layout.config_path.display(),
    )
}
