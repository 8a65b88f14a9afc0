use crate::commands::Cmd;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;
use std::time::Duration;

fn id_cmd(user: &str) -> Cmd {
    Cmd::new("id").args(["-u", user])
}

fn chown_cmd(user: &str, path: &std::path::Path) -> Cmd {
    Cmd::new("chown")
        .arg(format!("{user}:{user}"))
        .arg(path.display().to_string())
}

/// Ensures the unprivileged system account, its home and the log directory.
pub struct EnsureAccount;

#[async_trait]
impl Step for EnsureAccount {
    fn label(&self) -> &'static str {
        "Creating system account"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        let layout = &ctx.config.layout;
        Ok(ctx.host.probe(&id_cmd(&layout.user)).await
            && ctx.host.exists(&layout.home)
            && ctx.host.exists(&layout.log_dir))
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let host = ctx.host;
        let layout = &ctx.config.layout;
        let user = layout.user.as_str();
        let home = layout.home.display().to_string();

        if host.probe(&id_cmd(user)).await {
            log::info(&format!("User '{user}' already exists"));
        } else {
            let useradd = Cmd::new("useradd").args([
                "--system",
                "--create-home",
                "--home-dir",
                home.as_str(),
                "--shell",
                "/bin/bash",
                "--user-group",
                user,
            ]);
            host.exec(&useradd).await?;
        }

        for dir in [&layout.home, &layout.log_dir] {
            host.create_dir_all(dir)?;
            host.exec(&chown_cmd(user, dir)).await?;
        }
        Ok(())
    }
}

/// Stops the account's processes, then removes the account and its home.
pub struct RemoveAccount {
    /// Grace period between signalling processes and deleting the account.
    pub settle: Duration,
}

impl Default for RemoveAccount {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
        }
    }
}

#[async_trait]
impl Undo for RemoveAccount {
    fn label(&self) -> &'static str {
        "Removing system account and home directory"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let host = ctx.host;
        let user = ctx.layout.user.as_str();
        let home = &ctx.layout.home;

        let account = host.probe(&id_cmd(user)).await;
        if !account && !host.exists(home) {
            return Ok(UndoOutcome::NothingToRemove);
        }

        let mut removed = Vec::new();
        let mut failure = None;
        if account {
            // pkill exits 1 when nothing matched.
            host.output(&Cmd::new("pkill").args(["-u", user])).await?;
            tokio::time::sleep(self.settle).await;

            let deleted = match host.exec(&Cmd::new("userdel").args(["-r", user])).await {
                Ok(_) => true,
                Err(e) => {
                    log::warn(&format!("userdel -r failed ({e}); retrying without home removal"));
                    match host.exec(&Cmd::new("userdel").arg(user)).await {
                        Ok(_) => true,
                        Err(e) => {
                            log::warn(&format!("userdel failed ({e}); account {user} remains"));
                            failure = Some(e);
                            false
                        }
                    }
                }
            };
            if deleted {
                removed.push(format!("account {user}"));
            }
        }

        // The home goes whether or not the account could be deleted.
        if host.remove_dir_all(home)? || (account && failure.is_none()) {
            removed.push(home.display().to_string());
        }
        match failure {
            Some(cause) if removed.is_empty() => Err(cause),
            Some(cause) => Err(AppError::Incomplete {
                done: format!("removed {}", removed.join(" and ")),
                cause: Box::new(cause),
            }),
            None => Ok(UndoOutcome::Removed(removed.join(" and "))),
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
    async fn creates_account_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.fail("id -u odoo");
        let host = Host::new(dir.path(), runner.clone());
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };
        assert!(!EnsureAccount.is_satisfied(&ctx).await.unwrap());
        EnsureAccount.apply(&ctx).await.unwrap();
        assert!(runner.ran(
            "useradd --system --create-home --home-dir /opt/odoo --shell /bin/bash --user-group odoo"
        ));
        assert!(runner.ran("chown odoo:odoo /var/log/odoo"));
        assert!(dir.path().join("var/log/odoo").is_dir());
    }

    #[tokio::test]
    async fn existing_account_with_directories_is_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("opt/odoo")).unwrap();
        std::fs::create_dir_all(dir.path().join("var/log/odoo")).unwrap();
        let host = Host::new(dir.path(), Arc::new(RecordingRunner::new()));
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };
        assert!(EnsureAccount.is_satisfied(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn userdel_falls_back_and_home_is_force_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("opt/odoo/odoo")).unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.fail("userdel -r");
        let host = Host::new(dir.path(), runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let outcome = RemoveAccount {
            settle: Duration::ZERO,
        }
        .undo(&ctx)
        .await
        .unwrap();

        assert_eq!(
            outcome,
            UndoOutcome::Removed("account odoo and /opt/odoo".into())
        );
        let pkill = runner.position("pkill -u odoo").unwrap();
        let userdel = runner.position("userdel odoo").unwrap();
        assert!(pkill < userdel);
        assert!(!dir.path().join("opt/odoo").exists());
    }

    #[tokio::test]
    async fn absent_account_and_home_is_nothing_to_remove() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.fail("id -u");
        let host = Host::new(dir.path(), runner);
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let outcome = RemoveAccount::default().undo(&ctx).await.unwrap();
        assert_eq!(outcome, UndoOutcome::NothingToRemove);
    }

    #[tokio::test]
    async fn home_is_removed_even_when_the_account_cannot_be() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("opt/odoo/odoo")).unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.fail("userdel");
        let host = Host::new(dir.path(), runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let err = RemoveAccount {
            settle: Duration::ZERO,
        }
        .undo(&ctx)
        .await
        .unwrap_err();

        assert!(runner.ran("userdel -r odoo"));
        assert!(runner.ran("userdel odoo"));
        assert!(!dir.path().join("opt/odoo").exists());
        let AppError::Incomplete { done, cause } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(done, "removed /opt/odoo");
        assert!(matches!(**cause, AppError::ExternalTool { .. }));
        assert!(err.to_string().starts_with("removed /opt/odoo, but `userdel odoo` failed"));
    }
}
