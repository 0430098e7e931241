use shardfetch_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; fall back to stderr.
    if let Err(err) = logging::init_logging() {
        eprintln!("shardfetch: file logging unavailable ({:#}), logging to stderr", err);
        logging::init_logging_stderr();
    }

    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("shardfetch error: {:#}", err);
            std::process::exit(cli::EXIT_FAILURE);
        }
    }
}
