//! arrdesk CLI entry point

use arrdesk::{logging, Cli, ExitCode};
use clap::Parser;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // The stored log_level replaces "info" once settings load, unless pinned
    let (directive, pinned) = logging::startup_directive(cli.log_override(), "info");
    let logging = match logging::init(&directive, pinned) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        }
    };

    match cli.execute(logging).await {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::GeneralError.to_exit_code()
        }
    }
}
