//! Pure renderers: fixed template + `ProvisioningConfig` -> artifact text.

pub mod odoo_conf;
pub mod unit;
pub mod vhost;
