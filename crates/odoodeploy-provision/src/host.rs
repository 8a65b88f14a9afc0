use crate::commands::{Cmd, Output, Runner, SystemRunner};
use odoodeploy_core::AppError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The machine being provisioned: a filesystem root plus a command runner.
///
/// Paths passed in are absolute host paths (`/etc/odoo.conf`) and are resolved under `root`,
/// which is `/` in production.
#[derive(Clone)]
pub struct Host {
    root: PathBuf,
    runner: Arc<dyn Runner>,
}

impl Host {
    pub fn system() -> Self {
        Self::new("/", Arc::new(SystemRunner))
    }

    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn Runner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// Where `abs` lives on the local filesystem.
    pub fn path(&self, abs: &Path) -> PathBuf {
        self.root.join(abs.strip_prefix("/").unwrap_or(abs))
    }

    /// Run and return the raw output, whatever the exit status.
    pub async fn output(&self, cmd: &Cmd) -> Result<Output, AppError> {
        self.runner.run(cmd).await
    }

    /// Run and fail with `ExternalTool` on a non-zero exit.
    pub async fn exec(&self, cmd: &Cmd) -> Result<Output, AppError> {
        let out = self.runner.run(cmd).await?;
        if !out.success() {
            return Err(AppError::ExternalTool {
                command: cmd.command_line(),
                code: Some(out.code),
                stderr: cmd.redact(out.stderr.trim()),
            });
        }
        Ok(out)
    }

    /// Stdout of a successful run, trimmed.
    pub async fn capture(&self, cmd: &Cmd) -> Result<String, AppError> {
        Ok(self.exec(cmd).await?.stdout.trim().to_string())
    }

    /// True when the command ran and exited zero.
    pub async fn probe(&self, cmd: &Cmd) -> bool {
        matches!(self.runner.run(cmd).await, Ok(out) if out.success())
    }

    /// Exists as a file, directory or (possibly dangling) symlink.
    pub fn exists(&self, abs: &Path) -> bool {
        self.path(abs).symlink_metadata().is_ok()
    }

    pub fn read(&self, abs: &Path) -> Option<String> {
        std::fs::read_to_string(self.path(abs)).ok()
    }

    /// Target of the symlink at `abs`, as written in the link.
    pub fn read_link(&self, abs: &Path) -> Option<PathBuf> {
        std::fs::read_link(self.path(abs)).ok()
    }

    /// Write via a sibling temp file and rename, so readers never see a partial file.
    pub fn write_atomic(&self, abs: &Path, contents: &str, mode: u32) -> Result<(), AppError> {
        let dest = self.path(abs);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dest.with_file_name(format!(".{file_name}.tmp"));
        std::fs::write(&tmp, contents)?;
        set_mode(&tmp, mode)?;
        std::fs::rename(&tmp, &dest)?;
        Ok(())
    }

    /// True when `abs` already holds exactly `contents`.
    pub fn digest_matches(&self, abs: &Path, contents: &str) -> bool {
        match std::fs::read(self.path(abs)) {
            Ok(existing) => digest(&existing) == digest(contents.as_bytes()),
            Err(_) => false,
        }
    }

    /// Returns whether anything was removed.
    pub fn remove_file(&self, abs: &Path) -> Result<bool, AppError> {
        if !self.exists(abs) {
            return Ok(false);
        }
        std::fs::remove_file(self.path(abs))?;
        Ok(true)
    }

    /// Returns whether anything was removed.
    pub fn remove_dir_all(&self, abs: &Path) -> Result<bool, AppError> {
        if !self.exists(abs) {
            return Ok(false);
        }
        std::fs::remove_dir_all(self.path(abs))?;
        Ok(true)
    }

    pub fn create_dir_all(&self, abs: &Path) -> Result<(), AppError> {
        std::fs::create_dir_all(self.path(abs))?;
        Ok(())
    }

    /// Point `link` at the host path `target`, replacing any existing link.
    pub fn symlink(&self, target: &Path, link: &Path) -> Result<(), AppError> {
        self.remove_file(link)?;
        let link = self.path(link);
        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent)?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &link)?;
        #[cfg(not(unix))]
        std::fs::copy(self.path(target), &link).map(|_| ())?;
        Ok(())
    }

    /// Entries of a host directory as host paths, sorted. Missing directory yields nothing.
    pub fn list_dir(&self, abs: &Path) -> Result<Vec<PathBuf>, AppError> {
        let dir = self.path(abs);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            entries.push(abs.join(entry?.file_name()));
        }
        entries.sort();
        Ok(entries)
    }
}

/// Hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), AppError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), AppError> {
    Ok(())
}
