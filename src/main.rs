//! ChopNow command-line interface

use std::process::ExitCode;

use chopnow::observability::init_subscriber;
use tracing::debug;

use crate::cli::Cli;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = init_subscriber(&cli.config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialise, so stderr is the only channel"
        )]
        {
            eprintln!("{error}");
        }
    }

    debug!("configuration loaded");

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            #[expect(
                clippy::print_stderr,
                reason = "command errors are reported to the user on stderr"
            )]
            {
                eprintln!("{message}");
            }

            ExitCode::FAILURE
        }
    }
}
