use crate::commands::Cmd;
use crate::packages::apt_get;
use crate::pipeline::{Context, Step};
use async_trait::async_trait;
use odoodeploy_core::AppError;
use odoodeploy_ui::log;
use std::path::Path;

/// Upstream build with patched Qt; the distribution package lacks header/footer support.
pub const WKHTMLTOX_URL: &str = "https://github.com/wkhtmltopdf/packaging/releases/download/0.12.6.1-2/wkhtmltox_0.12.6.1-2.jammy_amd64.deb";
const DOWNLOAD_PATH: &str = "/tmp/wkhtmltox.deb";

/// Installs the PDF renderer the application shells out to for reports.
pub struct InstallPdfRenderer;

#[async_trait]
impl Step for InstallPdfRenderer {
    fn label(&self) -> &'static str {
        "Installing PDF renderer"
    }

    async fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool, AppError> {
        Ok(ctx
            .host
            .probe(&Cmd::new("wkhtmltopdf").arg("--version"))
            .await)
    }

    async fn apply(&self, ctx: &Context<'_>) -> Result<(), AppError> {
        let host = ctx.host;
        let download = Cmd::new("wget").args(["-q", "-O", DOWNLOAD_PATH, WKHTMLTOX_URL]);

        let upstream = match host.exec(&download).await {
            Ok(_) => host.exec(&apt_get(&["install", "-y", DOWNLOAD_PATH])).await,
            Err(e) => Err(e),
        };
        host.remove_file(Path::new(DOWNLOAD_PATH))?;

        if let Err(e) = upstream {
            log::warn(&format!(
                "Upstream wkhtmltox package failed ({e}); falling back to the distribution package"
            ));
            host.exec(&apt_get(&["install", "-y", "wkhtmltopdf"])).await?;
        }
        Ok(())
    }
}
