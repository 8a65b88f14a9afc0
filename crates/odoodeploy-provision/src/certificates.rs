use crate::commands::Cmd;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use crate::teardown::CertRemoval;
use async_trait::async_trait;
use odoodeploy_core::config::LETSENCRYPT_LIVE;
use odoodeploy_core::{AppError, ProxyMode};
use odoodeploy_ui::log;
use std::path::{Path, PathBuf};

fn fullchain(domain: &str) -> PathBuf {
    Path::new(LETSENCRYPT_LIVE).join(domain).join("fullchain.pem")
}

/// Obtains a certificate for the HTTPS variant. Failure aborts provisioning, since the
/// vhost would reference a certificate that does not exist.
pub struct IssueCertificate;

#[async_trait]
impl Step for IssueCertificate {
    fn label(&self) -> &'static str {
        "Issuing TLS certificate"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        Ok(match &ctx.config.proxy {
            ProxyMode::Https { domain, .. } => ctx.host.exists(&fullchain(domain)),
            ProxyMode::HttpOnly { .. } => true,
        })
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let ProxyMode::Https { domain, email } = &ctx.config.proxy else {
            return Ok(());
        };
        // The nginx plugin answers the challenge through the running server.
        ctx.host
            .exec(&Cmd::new("systemctl").args(["start", "nginx"]))
            .await?;
        let certbot = Cmd::new("certbot").args([
            "certonly",
            "--nginx",
            "--non-interactive",
            "--agree-tos",
            "--no-eff-email",
            "-m",
            email.as_str(),
            "-d",
            domain.as_str(),
        ]);
        ctx.host.exec(&certbot).await?;
        Ok(())
    }
}

/// Certificate names under the live directory.
fn live_certificates(ctx: &TeardownContext<'_>) -> Result<Vec<String>, AppError> {
    Ok(ctx
        .host
        .list_dir(Path::new(LETSENCRYPT_LIVE))?
        .iter()
        .filter(|p| ctx.host.path(p).is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect())
}

pub struct RemoveCertificates;

#[async_trait]
impl Undo for RemoveCertificates {
    fn label(&self) -> &'static str {
        "Removing TLS certificates"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let names = match &ctx.plan.certificates {
            CertRemoval::Keep => return Ok(UndoOutcome::Kept),
            CertRemoval::Domain(domain) => {
                if ctx.host.exists(&Path::new(LETSENCRYPT_LIVE).join(domain)) {
                    vec![domain.clone()]
                } else {
                    Vec::new()
                }
            }
            CertRemoval::All => live_certificates(ctx)?,
        };
        if names.is_empty() {
            return Ok(UndoOutcome::NothingToRemove);
        }

        let mut deleted = Vec::new();
        let mut last_err = None;
        for name in &names {
            let delete = Cmd::new("certbot").args([
                "delete",
                "--non-interactive",
                "--cert-name",
                name.as_str(),
            ]);
            match ctx.host.exec(&delete).await {
                Ok(_) => deleted.push(name.as_str()),
                Err(e) => {
                    log::warn(&format!("Could not delete certificate {name}: {e}"));
                    last_err = Some(e);
                }
            }
        }
        match (deleted.is_empty(), last_err) {
            (true, Some(e)) => Err(e),
            _ => Ok(UndoOutcome::Removed(format!("deleted {}", deleted.join(", ")))),
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
    use odoodeploy_core::Layout;
    use std::sync::Arc;

    #[tokio::test]
    async fn certbot_gets_exactly_the_domain_and_email() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new(dir.path(), runner.clone());
        let cfg = test_support::config(ProxyMode::Https {
            domain: "example.org".into(),
            email: "ops@example.org".into(),
        });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };
        assert!(!IssueCertificate.is_satisfied(&ctx).await.unwrap());
        IssueCertificate.apply(&ctx).await.unwrap();
        assert!(runner.lines().contains(
            &"certbot certonly --nginx --non-interactive --agree-tos --no-eff-email -m ops@example.org -d example.org"
                .to_string()
        ));
    }

    #[tokio::test]
    async fn existing_certificate_skips_issuance() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("etc/letsencrypt/live/example.org")).unwrap();
        std::fs::write(dir.path().join("etc/letsencrypt/live/example.org/fullchain.pem"), "").unwrap();
        let host = Host::new(dir.path(), Arc::new(RecordingRunner::new()));
        let cfg = test_support::config(ProxyMode::Https {
            domain: "example.org".into(),
            email: "ops@example.org".into(),
        });
        let ctx = Context {
            host: &host,
            config: &cfg,
        };
        assert!(IssueCertificate.is_satisfied(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn all_removes_every_live_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("etc/letsencrypt/live");
        std::fs::create_dir_all(live.join("example.org")).unwrap();
        std::fs::create_dir_all(live.join("shop.example.org")).unwrap();
        std::fs::write(live.join("README"), "").unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new(dir.path(), runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan {
            certificates: CertRemoval::All,
            ..TeardownPlan::default()
        };
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let outcome = RemoveCertificates.undo(&ctx).await.unwrap();
        assert_eq!(
            outcome,
            UndoOutcome::Removed("deleted example.org, shop.example.org".into())
        );
        assert!(!runner.ran("README"));
    }

    #[tokio::test]
    async fn keep_runs_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new("/", runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        assert_eq!(RemoveCertificates.undo(&ctx).await.unwrap(), UndoOutcome::Kept);
        assert!(runner.calls().is_empty());
    }
}
