use sidecar_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse_args();

    // Initialize logging as early as possible; fall back to stderr if the log file is unusable.
    if let Err(err) = logging::init_logging(cli.log_file.as_deref()) {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = cli.run() {
        tracing::error!("{:#}", err);
        eprintln!("sidecar error: {:#}", err);
        std::process::exit(1);
    }
}
