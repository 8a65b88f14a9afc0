//! Ordered Step execution.
//!
//! Forward runs stop at the first failure and never roll back. Teardown runs turn every
//! failure into a warning and always reach the end.

use crate::host::Host;
use crate::teardown::TeardownPlan;
use async_trait::async_trait;
use odoodeploy_core::{AppError, Layout, ProvisioningConfig};
use odoodeploy_ui::{log, spinner};

/// Everything a forward Step may read.
pub struct Context<'a> {
    pub host: &'a Host,
    pub config: &'a ProvisioningConfig,
}

/// A named, idempotent unit of provisioning work.
#[async_trait]
pub trait Step: Send + Sync {
    fn label(&self) -> &'static str;

    /// Whether the end state already holds, in which case `apply` is skipped.
    async fn is_satisfied(&self, _ctx: &Context<'_>) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    AlreadySatisfied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label: &'static str,
    pub outcome: StepOutcome,
}

/// Run `steps` in order. The first error aborts the run, wrapped in `StepFailed`.
pub async fn run_forward(
    steps: &[Box<dyn Step>],
    ctx: &Context<'_>,
) -> Result<Vec<StepReport>, AppError> {
    let total = steps.len();
    let mut reports = Vec::with_capacity(total);

    for (i, step) in steps.iter().enumerate() {
        let label = step.label();
        log::step(i + 1, total, label);

        let wrap = |e: AppError| AppError::StepFailed {
            step: label.to_string(),
            source: Box::new(e),
        };

        if step.is_satisfied(ctx).await.map_err(wrap)? {
            log::notice("Already satisfied, nothing to change");
            reports.push(StepReport {
                label,
                outcome: StepOutcome::AlreadySatisfied,
            });
            continue;
        }

        let sp = spinner(&format!("{label}..."));
        let result = step.apply(ctx).await;
        sp.finish_and_clear();
        result.map_err(wrap)?;

        log::success(label);
        reports.push(StepReport {
            label,
            outcome: StepOutcome::Applied,
        });
    }

    Ok(reports)
}

/// Everything a teardown Step may read.
pub struct TeardownContext<'a> {
    pub host: &'a Host,
    pub layout: &'a Layout,
    pub plan: &'a TeardownPlan,
}

/// Result of an inverse Step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Something was removed; the detail says what.
    Removed(String),
    /// The existence check found nothing.
    NothingToRemove,
    /// The operator declined this removal.
    Kept,
}

/// A best-effort inverse Step.
#[async_trait]
pub trait Undo: Send + Sync {
    fn label(&self) -> &'static str;

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStatus {
    Done(UndoOutcome),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub label: &'static str,
    pub status: TeardownStatus,
}

/// Run every inverse Step; failures become warnings and the run continues.
pub async fn run_teardown(steps: &[Box<dyn Undo>], ctx: &TeardownContext<'_>) -> Vec<TeardownReport> {
    let total = steps.len();
    let mut reports = Vec::with_capacity(total);

    for (i, step) in steps.iter().enumerate() {
        let label = step.label();
        log::step(i + 1, total, label);

        let status = match step.undo(ctx).await {
            Ok(outcome) => {
                match &outcome {
                    UndoOutcome::Removed(detail) => log::success(detail),
                    UndoOutcome::NothingToRemove => log::notice("Nothing to remove"),
                    UndoOutcome::Kept => log::notice("Kept at operator's request"),
                }
                TeardownStatus::Done(outcome)
            }
            Err(e) => {
                log::warn(&format!("{label}: {e}"));
                TeardownStatus::Failed(e.to_string())
            }
        };
        reports.push(TeardownReport { label, status });
    }

    reports
}

/// Final teardown report lines. Wording comes from each Step's status only.
pub fn teardown_summary(reports: &[TeardownReport]) -> Vec<String> {
    let mut lines = vec!["Teardown complete.".to_string()];
    for r in reports {
        let line = match &r.status {
            TeardownStatus::Done(UndoOutcome::Removed(detail)) => format!("  removed   {}: {detail}", r.label),
            TeardownStatus::Done(UndoOutcome::NothingToRemove) => format!("  absent    {}", r.label),
            TeardownStatus::Done(UndoOutcome::Kept) => format!("  kept      {}", r.label),
            TeardownStatus::Failed(e) => format!("  warning   {}: {e}", r.label),
        };
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::RecordingRunner;
    use crate::test_support;
    use odoodeploy_core::ProxyMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        label: &'static str,
        satisfied: bool,
        fail: bool,
        applied: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Step for Probe {
        fn label(&self) -> &'static str {
            self.label
        }

        async fn is_satisfied(&self, _ctx: &Context<'_>) -> Result<bool, AppError> {
            Ok(self.satisfied)
        }

        async fn apply(&self, _ctx: &Context<'_>) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::MissingInput("scripted".into()));
            }
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn step(label: &'static str, satisfied: bool, fail: bool, n: &Arc<AtomicUsize>) -> Box<dyn Step> {
        Box::new(Probe {
            label,
            satisfied,
            fail,
            applied: n.clone(),
        })
    }

    #[tokio::test]
    async fn satisfied_steps_are_skipped() {
        let host = Host::new("/", Arc::new(RecordingRunner::new()));
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let n = Arc::new(AtomicUsize::new(0));
        let steps = vec![step("a", true, false, &n), step("b", false, false, &n)];
        let reports = run_forward(&steps, &Context { host: &host, config: &cfg }).await.unwrap();
        assert_eq!(reports[0].outcome, StepOutcome::AlreadySatisfied);
        assert_eq!(reports[1].outcome, StepOutcome::Applied);
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_failure_stops_the_forward_run() {
        let host = Host::new("/", Arc::new(RecordingRunner::new()));
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        let n = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            step("a", false, false, &n),
            step("b", false, true, &n),
            step("c", false, false, &n),
        ];
        let err = run_forward(&steps, &Context { host: &host, config: &cfg }).await.unwrap_err();
        assert!(matches!(&err, AppError::StepFailed { step, .. } if step == "b"));
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    struct Scripted(&'static str, Result<UndoOutcome, ()>);

    #[async_trait]
    impl Undo for Scripted {
        fn label(&self) -> &'static str {
            self.0
        }

        async fn undo(&self, _ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
            self.1
                .clone()
                .map_err(|_| AppError::MissingInput("already absent".into()))
        }
    }

    #[tokio::test]
    async fn teardown_continues_past_failures_and_reports_honestly() {
        let host = Host::new("/", Arc::new(RecordingRunner::new()));
        let layout = Layout::default();
        let plan = TeardownPlan::default();
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        let steps: Vec<Box<dyn Undo>> = vec![
            Box::new(Scripted("config file", Err(()))),
            Box::new(Scripted("certificates", Ok(UndoOutcome::Kept))),
            Box::new(Scripted("logs", Ok(UndoOutcome::Removed("/var/log/odoo".into())))),
        ];
        let reports = run_teardown(&steps, &ctx).await;
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0].status, TeardownStatus::Failed(_)));

        let summary = teardown_summary(&reports);
        assert_eq!(summary[0], "Teardown complete.");
        assert!(summary.iter().any(|l| l.starts_with("  warning   config file")));
        assert!(summary.contains(&"  kept      certificates".to_string()));
        assert!(!summary.iter().any(|l| l.contains("removed   certificates")));
        assert!(summary.contains(&"  removed   logs: /var/log/odoo".to_string()));
    }
}
