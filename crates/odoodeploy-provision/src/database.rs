use crate::commands::Cmd;
use crate::host::Host;
use crate::pipeline::{Context, Step, TeardownContext, Undo, UndoOutcome};
use async_trait::async_trait;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;

/// `psql` as the postgres superuser, reading SQL from stdin.
fn psql(sql: String) -> Cmd {
    Cmd::new("psql")
        .args(["-X", "-q", "-t", "-A", "-v", "ON_ERROR_STOP=1"])
        .as_user("postgres")
        .stdin(sql)
}

fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

async fn query_rows(host: &Host, sql: String) -> Result<Vec<String>, AppError> {
    let out = host.capture(&psql(sql)).await?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

pub async fn role_exists(host: &Host, role: &str) -> Result<bool, AppError> {
    let rows = query_rows(
        host,
        format!("SELECT 1 FROM pg_roles WHERE rolname = {};", sql_literal(role)),
    )
    .await?;
    Ok(rows.iter().any(|r| r == "1"))
}

/// Databases owned by `role`.
pub async fn owned_databases(host: &Host, role: &str) -> Result<Vec<String>, AppError> {
    query_rows(
        host,
        format!(
            "SELECT d.datname FROM pg_database d JOIN pg_roles r ON r.oid = d.datdba \
             WHERE r.rolname = {} ORDER BY 1;",
            sql_literal(role)
        ),
    )
    .await
}

/// Non-template, non-`postgres` databases *not* owned by `role`.
pub async fn other_databases(host: &Host, role: &str) -> Result<Vec<String>, AppError> {
    query_rows(
        host,
        format!(
            "SELECT d.datname FROM pg_database d JOIN pg_roles r ON r.oid = d.datdba \
             WHERE NOT d.datistemplate AND d.datname <> 'postgres' AND r.rolname <> {} ORDER BY 1;",
            sql_literal(role)
        ),
    )
    .await
}

/// Ensures the application's database role exists and carries this run's password.
pub struct EnsureDatabaseRole;

#[async_trait]
impl Step for EnsureDatabaseRole {
    fn label(&self) -> &'static str {
        "Ensuring database role"
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let host = ctx.host;
        let role = &ctx.config.layout.user;
        let password = &ctx.config.secrets.db_password;

        host.exec(&Cmd::new("systemctl").args(["enable", "--now", "postgresql"]))
            .await?;

        let verb = if role_exists(host, role).await? {
            log::info(&format!("Role '{role}' exists; setting the new password"));
            "ALTER"
        } else {
            "CREATE"
        };
        let sql = format!(
            "{verb} ROLE {} WITH LOGIN CREATEDB NOSUPERUSER PASSWORD {};",
            sql_ident(role),
            sql_literal(password)
        );
        host.exec(&psql(sql).mask(password)).await?;
        Ok(())
    }
}

/// Drops the role's databases, the operator-approved others, then the role.
pub struct DropDatabases;

#[async_trait]
impl Undo for DropDatabases {
    fn label(&self) -> &'static str {
        "Dropping databases and role"
    }

    async fn undo(&self, ctx: &TeardownContext<'_>) -> Result<UndoOutcome, AppError> {
        let host = ctx.host;
        let role = &ctx.layout.user;

        let owned = owned_databases(host, role).await?;
        let mut dropped = Vec::new();
        for db in owned.iter().chain(ctx.plan.other_databases.iter()) {
            let sql = format!("DROP DATABASE IF EXISTS {} WITH (FORCE);", sql_ident(db));
            match host.exec(&psql(sql)).await {
                Ok(_) => dropped.push(db.as_str()),
                Err(e) => log::warn(&format!("Could not drop database '{db}': {e}")),
            }
        }

        let had_role = role_exists(host, role).await?;
        if had_role {
            host.exec(&psql(format!("DROP ROLE IF EXISTS {};", sql_ident(role))))
                .await?;
        }

        if dropped.is_empty() && !had_role {
            return Ok(UndoOutcome::NothingToRemove);
        }
        let mut detail = if dropped.is_empty() {
            "no databases dropped".to_string()
        } else {
            format!("dropped {}", dropped.join(", "))
        };
        if had_role {
            detail.push_str(&format!("; dropped role {role}"));
        }
        Ok(UndoOutcome::Removed(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::RecordingRunner;
    use crate::commands::Output;
    use crate::teardown::TeardownPlan;
    use crate::test_support;
    use odoodeploy_core::{Layout, ProxyMode};
    use std::sync::Arc;

    #[tokio::test]
    async fn new_role_is_created_with_password_over_stdin() {
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new("/", runner.clone());
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        EnsureDatabaseRole
            .apply(&Context {
                host: &host,
                config: &cfg,
            })
            .await
            .unwrap();

        let calls = runner.calls();
        let create = calls
            .iter()
            .find(|c| c.stdin.as_deref().is_some_and(|s| s.starts_with("CREATE ROLE")))
            .expect("CREATE ROLE issued");
        assert!(create.stdin.as_deref().unwrap().contains(&cfg.secrets.db_password));
        assert!(!create.line.contains(&cfg.secrets.db_password));
        assert!(create.line.starts_with("sudo -u postgres -H psql"));
    }

    #[tokio::test]
    async fn existing_role_gets_password_rotated() {
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("psql", Output::ok("1\n"));
        let host = Host::new("/", runner.clone());
        let cfg = test_support::config(ProxyMode::HttpOnly { host: "h".into() });
        EnsureDatabaseRole
            .apply(&Context {
                host: &host,
                config: &cfg,
            })
            .await
            .unwrap();
        assert!(runner
            .calls()
            .iter()
            .any(|c| c.stdin.as_deref().is_some_and(|s| s.starts_with("ALTER ROLE \"odoo\""))));
    }

    #[test]
    fn sql_quoting_doubles_embedded_quotes() {
        assert_eq!(sql_literal("it's"), "'it''s'");
        assert_eq!(sql_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn only_approved_foreign_databases_are_dropped() {
        let runner = Arc::new(RecordingRunner::new());
        let host = Host::new("/", runner.clone());
        let layout = Layout::default();
        let plan = TeardownPlan {
            other_databases: vec!["crm".into()],
            ..TeardownPlan::default()
        };
        let ctx = TeardownContext {
            host: &host,
            layout: &layout,
            plan: &plan,
        };
        DropDatabases.undo(&ctx).await.unwrap();
        let drops: Vec<String> = runner
            .calls()
            .into_iter()
            .filter_map(|c| c.stdin)
            .filter(|s| s.starts_with("DROP DATABASE"))
            .collect();
        assert_eq!(drops, vec!["DROP DATABASE IF EXISTS \"crm\" WITH (FORCE);"]);
    }
}
