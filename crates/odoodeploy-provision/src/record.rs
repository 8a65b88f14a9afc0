use crate::host::Host;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use chrono::Utc;
use odoodeploy_core::config::RECEIPT_PATH;
use odoodeploy_core::receipt::Receipt;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;
use std::path::Path;

/// Receipt left by a previous run, if readable.
pub fn load_receipt(host: &Host) -> Option<Receipt> {
    let text = host.read(Path::new(RECEIPT_PATH))?;
    match Receipt::from_json(&text) {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn(&format!("Ignoring unreadable receipt {RECEIPT_PATH}: {e}"));
            None
        }
    }
}

/// Records what this run deployed, without secrets.
pub struct WriteReceipt;

#[async_trait]
impl Step for WriteReceipt {
    fn label(&self) -> &'static str {
        "Recording deployment receipt"
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let receipt = Receipt::from_config(ctx.config, Utc::now());
        ctx.host
            .write_atomic(Path::new(RECEIPT_PATH), &receipt.to_json()?, 0o600)
    }
}

pub struct RemoveReceipt;

#[async_trait]
impl Undo for RemoveReceipt {
    fn label(&self) -> &'static str {
        "Removing deployment receipt"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let path = Path::new(RECEIPT_PATH);
        let mut removed = ctx.host.remove_file(path)?;
        if let Some(dir) = path.parent() {
            if ctx.host.list_dir(dir)?.is_empty() {
                removed |= ctx.host.remove_dir_all(dir)?;
            }
        }
        Ok(if removed {
            UndoOutcome::Removed(RECEIPT_PATH.to_string())
        } else {
            UndoOutcome::NothingToRemove
        })
    }
}
