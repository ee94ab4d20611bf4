use clap::Parser;
use std::process::ExitCode;

mod error;
mod logging;
mod pipeline;
mod report;
mod settings;

use settings::Settings;

fn main() -> ExitCode {
    let settings = Settings::parse();
    logging::init(settings.verbose);
    tracing::debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match pipeline::run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
