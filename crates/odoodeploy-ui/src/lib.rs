//! Terminal output and interactive prompts for odoodeploy.

pub mod log;
pub mod prompt;
pub mod summary;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub use prompt::DialoguerPrompter;

/// Create a spinner with a message.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
