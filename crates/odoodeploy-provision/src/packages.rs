use crate::commands::Cmd;
use crate::host::Host;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;
use std::path::Path;

/// OS packages the server, its build dependencies and the collaborators need.
pub const BASE_PACKAGES: &[&str] = &[
    "git",
    "wget",
    "build-essential",
    "python3-dev",
    "python3-pip",
    "python3-venv",
    "python3-wheel",
    "libxml2-dev",
    "libxslt1-dev",
    "libzip-dev",
    "libldap2-dev",
    "libsasl2-dev",
    "libpq-dev",
    "libjpeg-dev",
    "zlib1g-dev",
    "libffi-dev",
    "libssl-dev",
    "node-less",
    "npm",
    "fontconfig",
    "xfonts-75dpi",
    "xfonts-base",
    "postgresql",
    "nginx",
    "certbot",
    "python3-certbot-nginx",
    "ufw",
];

pub(crate) fn apt_get(args: &[&str]) -> Cmd {
    Cmd::new("apt-get")
        .args(args.iter().copied())
        .env("DEBIAN_FRONTEND", "noninteractive")
}

pub struct InstallPackages;

#[async_trait]
impl Step for InstallPackages {
    fn label(&self) -> &'static str {
        "Installing system packages"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        let query = Cmd::new("dpkg").arg("-s").args(BASE_PACKAGES.iter().copied());
        Ok(ctx.host.probe(&query).await)
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        ctx.host.exec(&apt_get(&["update"])).await?;
        let mut install = vec!["install", "-y", "--no-install-recommends"];
        install.extend_from_slice(BASE_PACKAGES);
        ctx.host.exec(&apt_get(&install)).await?;
        Ok(())
    }
}

/// Shared packages teardown may remove, each behind its own confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageGroup {
    PdfRenderer,
    DatabaseEngine,
    Proxy,
}

impl PackageGroup {
    fn patterns(self) -> &'static [&'static str] {
        match self {
            PackageGroup::PdfRenderer => &["wkhtmltox", "wkhtmltopdf"],
            PackageGroup::DatabaseEngine => &["postgresql*"],
            PackageGroup::Proxy => &["nginx*", "libnginx-mod-*", "python3-certbot-nginx"],
        }
    }

    /// Directories that hold this group's data or configuration.
    fn leftovers(self) -> &'static [&'static str] {
        match self {
            PackageGroup::PdfRenderer => &[],
            PackageGroup::DatabaseEngine => &["/var/lib/postgresql", "/etc/postgresql"],
            PackageGroup::Proxy => &["/etc/nginx"],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PackageGroup::PdfRenderer => "PDF renderer (wkhtmltopdf)",
            PackageGroup::DatabaseEngine => "PostgreSQL and ALL of its data",
            PackageGroup::Proxy => "nginx",
        }
    }
}

/// Installed package names matching the group's patterns.
async fn installed(host: &Host, group: PackageGroup) -> Result<Vec<String>, AppError> {
    let query = Cmd::new("dpkg-query")
        .args(["-W", "-f", "${Status}\t${Package}\n"])
        .args(group.patterns().iter().copied());
    // dpkg-query exits non-zero when a pattern matches nothing.
    let out = host.output(&query).await?;
    Ok(out
        .stdout
        .lines()
        .filter_map(|l| l.split_once('\t'))
        .filter(|(status, _)| status.ends_with("installed") && !status.contains("not-installed"))
        .map(|(_, name)| name.to_string())
        .collect())
}

pub struct RemovePackages(pub PackageGroup);

#[async_trait]
impl Undo for RemovePackages {
    fn label(&self) -> &'static str {
        match self.0 {
            PackageGroup::PdfRenderer => "Removing PDF renderer",
            PackageGroup::DatabaseEngine => "Removing PostgreSQL",
            PackageGroup::Proxy => "Removing nginx",
        }
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        if !ctx.plan.removes(self.0) {
            return Ok(UndoOutcome::Kept);
        }

        let names = installed(ctx.host, self.0).await?;
        let mut removed_dirs = Vec::new();
        if !names.is_empty() {
            let mut purge = vec!["purge", "-y"];
            purge.extend(names.iter().map(String::as_str));
            ctx.host.exec(&apt_get(&purge)).await?;
        }
        for dir in self.0.leftovers() {
            if ctx.host.remove_dir_all(Path::new(dir))? {
                removed_dirs.push(*dir);
            }
        }

        if names.is_empty() && removed_dirs.is_empty() {
            return Ok(UndoOutcome::NothingToRemove);
        }
        if let Err(e) = ctx.host.exec(&apt_get(&["autoremove", "-y"])).await {
            log::warn(&format!("apt-get autoremove failed: {e}"));
        }

        let mut detail = format!("purged {}", names.join(", "));
        if !removed_dirs.is_empty() {
            detail.push_str(&format!("; deleted {}", removed_dirs.join(", ")));
        }
        Ok(UndoOutcome::Removed(detail))
    }
}
