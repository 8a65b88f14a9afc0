use crate::commands::Cmd;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::render::odoo_conf;
use odoodeploy_core::AppError;

/// Owner read/write, group read: the file holds both secrets.
pub const CONFIG_MODE: u32 = 0o640;

/// Renders the application config with this run's secrets and worker count.
pub struct RenderConfig;

#[async_trait]
impl Step for RenderConfig {
    fn label(&self) -> &'static str {
        "Rendering application config"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        let path = &ctx.config.layout.config_path;
        Ok(ctx.host.digest_matches(path, &odoo_conf::render(ctx.config)))
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let layout = &ctx.config.layout;
        let text = odoo_conf::render(ctx.config);
        ctx.host.write_atomic(&layout.config_path, &text, CONFIG_MODE)?;
        let chown = Cmd::new("chown")
            .arg(format!("{0}:{0}", layout.user))
            .arg(layout.config_path.display().to_string());
        ctx.host.exec(&chown).await?;
        Ok(())
    }
}

pub struct RemoveConfig;

#[async_trait]
impl Undo for RemoveConfig {
    fn label(&self) -> &'static str {
        "Removing application config"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let path = &ctx.layout.config_path;
        if ctx.host.remove_file(path)? {
            Ok(UndoOutcome::Removed(path.display().to_string()))
        } else {
            Ok(UndoOutcome::NothingToRemove)
        }
    }
}

/// Application log directory plus the proxy logs named after the service.
pub struct RemoveLogs;

#[async_trait]
impl Undo for RemoveLogs {
    fn label(&self) -> &'static str {
        "Removing logs"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let mut removed = Vec::new();
        if ctx.host.remove_dir_all(&ctx.layout.log_dir)? {
            removed.push(ctx.layout.log_dir.display().to_string());
        }
        for log in ctx.layout.proxy_logs() {
            if ctx.host.remove_file(&log)? {
                removed.push(log.display().to_string());
            }
        }
        if removed.is_empty() {
            Ok(UndoOutcome::NothingToRemove)
        } else {
            Ok(UndoOutcome::Removed(removed.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::RecordingRunner;
    use crate::host::Host;
    use crate::teardown::TeardownPlan;
    use crate::test_support;
    use odoodeploy_core::{Layout, ProxyMode};
    use std::sync::Arc;

    #[tokio::test]
    async fn writes_config_then_fixes_ownership() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new(dir.path(), runner.clone());
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };

        assert!(!RenderConfig.is_satisfied(&ctx).await.unwrap());
        RenderConfig.apply(&ctx).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("etc/odoo.conf")).unwrap();
        assert!(written.contains(&format!("admin_passwd = {}", cfg.secrets.admin_password)));
        assert_eq!(runner.lines(), vec!["chown odoo:odoo /etc/odoo.conf"]);
        assert!(RenderConfig.is_satisfied(&ctx).await.unwrap());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join("etc/odoo.conf"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, CONFIG_MODE);
        }
    }

    #[tokio::test]
    async fn missing_config_and_logs_are_nothing_to_remove() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(dir.path(), Arc::new(RecordingRunner::new()));
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        assert_eq!(RemoveConfig.undo(&ctx).await.unwrap(), UndoOutcome::NothingToRemove);
        assert_eq!(RemoveLogs.undo(&ctx).await.unwrap(), UndoOutcome::NothingToRemove);
    }

    #[tokio::test]
    async fn removes_log_directory_and_proxy_logs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("var/log/odoo")).unwrap();
        std::fs::create_dir_all(dir.path().join("var/log/nginx")).unwrap();
        std::fs::write(dir.path().join("var/log/nginx/odoo.access.log"), "GET /").unwrap();
        std::fs::write(dir.path().join("var/log/nginx/other.access.log"), "GET /").unwrap();
        let host = Host::new(dir.path(), Arc::new(RecordingRunner::new()));
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        assert_eq!(
            RemoveLogs.undo(&ctx).await.unwrap(),
            UndoOutcome::Removed("/var/log/odoo, /var/log/nginx/odoo.access.log".into())
        );
        assert!(dir.path().join("var/log/nginx/other.access.log").exists());
    }
}
