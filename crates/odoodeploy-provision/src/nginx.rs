use crate::commands::Cmd;
use crate::host::Host;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::config::{NGINX_SITES_AVAILABLE, NGINX_SITES_ENABLED};
use odoodeploy_core::render::vhost;
use odoodeploy_core::{AppError, Layout};
use odoodeploy_ui::log;
use std::path::{Path, PathBuf};

const NGINX_BIN: &str = "/usr/sbin/nginx";

fn available(name: &str) -> PathBuf {
    Path::new(NGINX_SITES_AVAILABLE).join(name)
}

fn enabled(name: &str) -> PathBuf {
    Path::new(NGINX_SITES_ENABLED).join(name)
}

async fn test_and_reload(host: &Host, reload: &str) -> Result<(), AppError> {
    host.exec(&Cmd::new("nginx").arg("-t")).await?;
    host.exec(&Cmd::new("systemctl").args([reload, "nginx"]))
        .await?;
    Ok(())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Site files and enabled entries, other than `default` and `keep`, that reference this
/// deployment's account or ports.
///
/// An enabled entry that cannot be read counts only when it is a link to one of the
/// available sites found here.
fn deployment_sites(
    host: &Host,
    layout: &Layout,
    keep: Option<&str>,
) -> Result<Vec<PathBuf>, AppError> {
    let markers = [
        layout.user.clone(),
        format!(":{}", layout.http_port),
        format!(":{}", layout.realtime_port),
    ];
    let references_us = |text: &str| markers.iter().any(|m| text.contains(m.as_str()));
    let skipped = |name: &str| name == "default" || keep == Some(name);

    let mut sites = Vec::new();
    for site in host.list_dir(Path::new(NGINX_SITES_AVAILABLE))? {
        let Some(name) = file_name(&site) else { continue };
        if !skipped(&name) && host.read(&site).is_some_and(|t| references_us(&t)) {
            sites.push(site);
        }
    }

    let mut links = Vec::new();
    for link in host.list_dir(Path::new(NGINX_SITES_ENABLED))? {
        let Some(name) = file_name(&link) else { continue };
        if skipped(&name) {
            continue;
        }
        let ours = match host.read(&link) {
            Some(text) => references_us(&text),
            None => host.read_link(&link).is_some_and(|target| sites.contains(&target)),
        };
        if ours {
            links.push(link);
        }
    }
    sites.extend(links);
    Ok(sites)
}

/// Removes `paths` and returns their distinct site names, sorted.
fn remove_sites(host: &Host, paths: &[PathBuf]) -> Result<Vec<String>, AppError> {
    let mut names = Vec::new();
    for path in paths {
        host.remove_file(path)?;
        names.extend(file_name(path));
    }
    names.sort();
    names.dedup();
    Ok(names)
}

/// Renders and enables the vhost, disables the distribution default site, reloads nginx.
///
/// Sites left by an earlier run under another name (the HTTP `odoo` site before a switch to
/// HTTPS) are removed first, since two copies of the upstream block fail `nginx -t`.
pub struct ConfigureProxy;

#[async_trait]
impl Step for ConfigureProxy {
    fn label(&self) -> &'static str {
        "Configuring nginx reverse proxy"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        let cfg = ctx.config;
        let host = ctx.host;
        Ok(host.digest_matches(&cfg.vhost_path(), &vhost::render(cfg))
            && host.exists(&cfg.vhost_link())
            && !host.exists(&enabled("default"))
            && deployment_sites(host, &cfg.layout, Some(cfg.vhost_name().as_str()))?.is_empty())
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let host = ctx.host;
        let cfg = ctx.config;

        let stale = deployment_sites(host, &cfg.layout, Some(cfg.vhost_name().as_str()))?;
        let replaced = remove_sites(host, &stale)?;
        if !replaced.is_empty() {
            log::info(&format!("Removed previous site(s) {}", replaced.join(", ")));
        }

        host.write_atomic(&cfg.vhost_path(), &vhost::render(cfg), 0o644)?;
        host.symlink(&cfg.vhost_path(), &cfg.vhost_link())?;
        if host.remove_file(&enabled("default"))? {
            log::info("Disabled the default nginx site");
        }

        host.exec(&Cmd::new("systemctl").args(["enable", "nginx"]))
            .await?;
        test_and_reload(host, "reload-or-restart").await
    }
}

/// Removes every vhost that references this deployment, whatever its file name.
pub struct RemoveProxyConfig;

#[async_trait]
impl Undo for RemoveProxyConfig {
    fn label(&self) -> &'static str {
        "Removing nginx site"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let host = ctx.host;
        let removed = remove_sites(host, &deployment_sites(host, ctx.layout, None)?)?;

        let reenable_default =
            host.exists(&available("default")) && !host.exists(&enabled("default"));
        if reenable_default {
            host.symlink(&available("default"), &enabled("default"))?;
        }

        if removed.is_empty() && !reenable_default {
            return Ok(UndoOutcome::NothingToRemove);
        }
        if host.exists(Path::new(NGINX_BIN)) {
            test_and_reload(host, "try-reload-or-restart").await?;
        }

        let mut detail = if removed.is_empty() {
            "no sites referenced this deployment".to_string()
        } else {
            format!("removed site(s) {}", removed.join(", "))
        };
        if reenable_default {
            detail.push_str("; re-enabled default site");
        }
        Ok(UndoOutcome::Removed(detail))
    }
}
