use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// Bytes of entropy behind each generated secret.
pub const SECRET_BYTES: usize = 16;

/// Credentials generated for a single provisioning run.
///
/// Held only in memory. They reach the rendered config file, the role manager and the final
/// summary, nothing else. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    pub admin_password: String,
    pub db_password: String,
}

impl Secrets {
    /// Two independent fresh values. Every call regenerates.
    pub fn generate() -> Self {
        Self {
            admin_password: random_secret(),
            db_password: random_secret(),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("admin_password", &"<redacted>")
            .field("db_password", &"<redacted>")
            .finish()
    }
}

/// 16 random bytes from the OS generator, base64-encoded.
pub fn random_secret() -> String {
    let mut buf = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut buf);
    STANDARD.encode(buf)
}
