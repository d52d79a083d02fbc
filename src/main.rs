//! ticketdesk - command-line client for the ticketdesk REST API

use clap::Parser;

use ticketdesk::cli::{self, Cli};
use ticketdesk::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match logging::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {}", e);
            None
        }
    };

    let code = match cli::run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            if e.is_critical() {
                tracing::error!("Command failed: {}", e);
            } else {
                tracing::warn!("Command failed: {}", e);
            }
            eprintln!("Error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("{}", action);
            }
            e.exit_code()
        }
    };

    // flush buffered log lines before exiting
    drop(log_guard);
    std::process::exit(code);
}
