//! Labeled terminal messages. Errors and warnings go to stderr, the rest to stdout.

use console::style;

/// `[Step i/N] label...`
pub fn step(index: usize, total: usize, label: &str) {
    println!("\n{} {label}...", style(format!("[Step {index}/{total}]")).bold().cyan());
}

pub fn info(msg: &str) {
    println!("  {msg}");
}

pub fn success(msg: &str) {
    println!("  {} {msg}", style("[ OK ]").green().bold());
}

/// A precondition already held; nothing was changed.
pub fn notice(msg: &str) {
    println!("  {} {msg}", style("[SKIP]").dim());
}

pub fn warn(msg: &str) {
    eprintln!("  {} {msg}", style("[WARN]").yellow().bold());
}

pub fn error(msg: &str) {
    eprintln!("{} {msg}", style("[ERROR]").red().bold());
}
