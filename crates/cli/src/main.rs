use anyhow::Result;
use clap::Parser;
use popsig_cli::args::{CliArgs, LogLevel};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.log_level);

    match execute(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!(target: "popsig", error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: &CliArgs) -> Result<bool> {
    let config = popsig_cli::load_config(args.config.as_deref())?;
    debug!(target: "popsig", version = popsig_cli::VERSION, command = ?args.command, "running");

    let outcome = popsig_cli::run(&args.command, &config, &mut std::io::stdin().lock())?;
    println!("{}", outcome.output);
    Ok(outcome.success)
}

fn init_tracing(level: Option<LogLevel>) {
    let env_filter = match level {
        Some(level) => EnvFilter::new(tracing::Level::from(level).as_str().to_ascii_lowercase()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
