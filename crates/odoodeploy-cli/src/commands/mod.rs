pub mod deprovision;
pub mod provision;
