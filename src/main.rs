use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use sales_schema::Settings;
use sales_schema::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let env = env_logger::Env::default().default_filter_or(settings.app.log_filter());
    env_logger::Builder::from_env(env).init();
    info!("{} ({:?})", settings.app.app_name, settings.app.environment);

    match cli::run(cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
