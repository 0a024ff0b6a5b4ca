//! aid-ctl entry point

use aid_ctl::{commands, Cli, Config, ExitCode};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    let config = match Config::load_from(cli.config.as_deref()).and_then(|config| {
        let config = config.with_overrides(&overrides);
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::InvalidInput.to_exit_code();
        }
    };

    let filter = if cli.verbose || cli.debug {
        EnvFilter::try_new(&config.logging.level)
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.logging.level))
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match commands::execute(cli.command, config).await {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::GeneralError.to_exit_code()
        }
    }
}
