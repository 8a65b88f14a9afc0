use crate::commands::Cmd;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::{AppError, ProxyMode};
use odoodeploy_ui::log;

pub const SSH_RULE: &str = "22/tcp";
pub const HTTP_RULE: &str = "80/tcp";
pub const HTTPS_RULE: &str = "443/tcp";

/// Inbound rules the deployment needs; HTTPS only for the certificate variant.
pub fn required_rules(proxy: &ProxyMode) -> Vec<&'static str> {
    let mut rules = vec![SSH_RULE, HTTP_RULE];
    if proxy.is_https() {
        rules.push(HTTPS_RULE);
    }
    rules
}

fn ufw(args: &[&str]) -> Cmd {
    Cmd::new("ufw").args(args.iter().copied())
}

/// Opens the minimum inbound ports and enables the firewall.
pub struct ConfigureFirewall;

#[async_trait]
impl Step for ConfigureFirewall {
    fn label(&self) -> &'static str {
        "Configuring firewall"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        let out = ctx.host.output(&ufw(&["status"])).await?;
        if !out.success() || !out.stdout.contains("Status: active") {
            return Ok(false);
        }
        Ok(required_rules(&ctx.config.proxy)
            .iter()
            .all(|rule| out.stdout.lines().any(|l| l.starts_with(rule) && l.contains("ALLOW"))))
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        for rule in required_rules(&ctx.config.proxy) {
            ctx.host.exec(&ufw(&["allow", rule])).await?;
        }
        ctx.host.exec(&ufw(&["--force", "enable"])).await?;
        Ok(())
    }
}

/// True when `ufw show added` lists an allow rule for `rule`. Rules are listed there whether or
/// not the firewall is active.
fn rule_added(added: &str, rule: &str) -> bool {
    let wanted = format!("ufw allow {rule}");
    added.lines().any(|l| l.trim() == wanted)
}

/// Deletes the web rules that are present. SSH stays open so the operator is not locked out.
pub struct RemoveFirewallRules;

#[async_trait]
impl Undo for RemoveFirewallRules {
    fn label(&self) -> &'static str {
        "Removing firewall rules"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        if !ctx.plan.remove_firewall_rules {
            return Ok(UndoOutcome::Kept);
        }
        // A missing ufw exits non-zero with empty stdout, which lists no rules.
        let added = ctx.host.output(&ufw(&["show", "added"])).await?.stdout;
        let present: Vec<&str> = [HTTP_RULE, HTTPS_RULE]
            .into_iter()
            .filter(|rule| rule_added(&added, rule))
            .collect();
        if present.is_empty() {
            return Ok(UndoOutcome::NothingToRemove);
        }

        let mut deleted = Vec::new();
        let mut failure = None;
        for rule in present {
            match ctx.host.exec(&ufw(&["delete", "allow", rule])).await {
                Ok(_) => deleted.push(rule),
                Err(e) => {
                    log::warn(&format!("Could not delete the {rule} rule: {e}"));
                    failure = Some(e);
                }
            }
        }
        match (deleted.is_empty(), failure) {
            (true, Some(e)) => Err(e),
            (_, failure) => {
                let mut detail = format!("deleted {}; {SSH_RULE} left open", deleted.join(" and "));
                if failure.is_some() {
                    detail.push_str("; some rules could not be deleted");
                }
                Ok(UndoOutcome::Removed(detail))
            }
        }
    }
}
