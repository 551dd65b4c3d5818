//! corrpt - Main Entry Point
//!
//! Headless command line front end: loads an image, applies an effect
//! chain on the GPU and writes the export.

use std::process::ExitCode;

use clap::Parser;

use corrpt::cli::{self, CliArgs};
use corrpt::settings::CompositorSettings;
use corrpt::telemetry::{init_logging, LogConfig};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let settings = CompositorSettings::load();

    let log_config = LogConfig {
        file_path: args.log_file.clone(),
        default_level: if args.verbose {
            "debug".to_string()
        } else {
            settings.log_level.clone()
        },
        ..Default::default()
    };
    // Keep the guard alive so buffered file logs flush on exit
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    tracing::debug!("Starting corrpt v{}", env!("CARGO_PKG_VERSION"));

    cli::run(args, &settings)
}
