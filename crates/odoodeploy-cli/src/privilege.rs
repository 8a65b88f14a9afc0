use odoodeploy_core::AppError;

/// Both pipelines write system paths and manage services; checked once at entry.
pub fn require_root() -> Result<(), AppError> {
    let euid = effective_uid();
    if euid == 0 {
        Ok(())
    } else {
        Err(AppError::Privilege { euid })
    }
}

#[cfg(unix)]
fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

#[cfg(not(unix))]
fn effective_uid() -> u32 {
    u32::MAX
}
