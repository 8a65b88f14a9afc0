//! Core types, configuration, rendering and error handling for odoodeploy.

pub mod config;
pub mod error;
pub mod receipt;
pub mod render;
pub mod resolve;
pub mod secrets;

pub use config::{Layout, ProvisioningConfig, ProxyMode};
pub use error::AppError;
pub use secrets::Secrets;
