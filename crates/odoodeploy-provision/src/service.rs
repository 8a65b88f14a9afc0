use crate::commands::Cmd;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::render::unit;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;

fn systemctl(args: &[&str]) -> Cmd {
    Cmd::new("systemctl").args(args.iter().copied())
}

/// Writes the unit, enables it and restarts the service.
///
/// Never reports satisfied: the restart must run every time so a re-rendered config is
/// picked up.
pub struct InstallService;

#[async_trait]
impl Step for InstallService {
    fn label(&self) -> &'static str {
        "Installing and starting systemd service"
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let host = ctx.host;
        let layout = &ctx.config.layout;
        let service = layout.service_name.as_str();
        let text = unit::render(ctx.config);

        if !host.digest_matches(&layout.unit_path(), &text) {
            host.write_atomic(&layout.unit_path(), &text, 0o644)?;
        }
        host.exec(&systemctl(&["daemon-reload"])).await?;
        host.exec(&systemctl(&["enable", service])).await?;
        host.exec(&systemctl(&["restart", service])).await?;
        Ok(())
    }
}

pub struct RemoveService;

#[async_trait]
impl Undo for RemoveService {
    fn label(&self) -> &'static str {
        "Stopping and removing systemd service"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let host = ctx.host;
        let service = ctx.layout.service_name.as_str();
        let unit_path = ctx.layout.unit_path();

        let active = host.probe(&systemctl(&["is-active", "--quiet", service])).await;
        if !active && !host.exists(&unit_path) {
            return Ok(UndoOutcome::NothingToRemove);
        }

        for action in ["stop", "disable"] {
            let out = host.output(&systemctl(&[action, service])).await?;
            if !out.success() {
                log::warn(&format!("systemctl {action} {service}: {}", out.stderr.trim()));
            }
        }
        host.remove_file(&unit_path)?;
        host.exec(&systemctl(&["daemon-reload"])).await?;
        host.output(&systemctl(&["reset-failed", service])).await?;
        Ok(UndoOutcome::Removed(format!(
            "service {service} stopped, unit {} deleted",
            unit_path.display()
        )))
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
    async fn always_restarts_even_when_unit_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new(dir.path(), runner.clone());
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };
        InstallService.apply(&ctx).await.unwrap();
        InstallService.apply(&ctx).await.unwrap();

        assert!(!InstallService.is_satisfied(&ctx).await.unwrap());
        let restarts = runner
            .lines()
            .iter()
            .filter(|l| *l == "systemctl restart odoo")
            .count();
        assert_eq!(restarts, 2);
        assert!(dir.path().join("etc/systemd/system/odoo.service").exists());
    }

    #[tokio::test]
    async fn removal_keeps_going_when_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("etc/systemd/system")).unwrap();
        std::fs::write(dir.path().join("etc/systemd/system/odoo.service"), "[Unit]\n").unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.fail("systemctl is-active");
        runner.fail("systemctl stop");
        let host = Host::new(dir.path(), runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let outcome = RemoveService.undo(&ctx).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Removed(_)));
        assert!(!dir.path().join("etc/systemd/system/odoo.service").exists());
        assert!(runner.ran("systemctl daemon-reload"));
    }
}
