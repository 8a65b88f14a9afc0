mod commands;
mod privilege;

use clap::{Parser, Subcommand};
use odoodeploy_ui::log;

#[derive(Parser)]
#[command(
    name = "odoodeploy",
    version,
    about = "Provision or tear down a single-host Odoo deployment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install Odoo with PostgreSQL, systemd, nginx and an optional Let's Encrypt certificate
    Provision,

    /// Remove everything `provision` created, asking before each shared component
    Deprovision,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Optional .env in the working directory pre-answers prompts.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Provision => commands::provision::run().await,
        Commands::Deprovision => commands::deprovision::run().await,
    };

    if let Err(e) = result {
        log::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
