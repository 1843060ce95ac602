use backtidy::cli::{Cli, load_config, run_cli};
use backtidy::logging::init_logging;
use backtidy::output::OutputFormatter;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(cli.verbose, config.log_file.as_deref()) {
        OutputFormatter::error(&e.to_string());
        return ExitCode::FAILURE;
    }

    match run_cli(&cli, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
