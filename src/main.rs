//! drake CLI entry point.

use std::process::ExitCode;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::Parser;
use drake::cli::{self, Cli};
use drake::error::DrakeError;
use drake::options::Options;
use drake::ui::Ui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// With `--logfile`, log lines additionally go to the given file.
fn init_tracing(options: &Options) -> std::io::Result<()> {
    let filter = if options.debug {
        EnvFilter::new("drake=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drake=info"))
    };

    let file_layer = match &options.logfile {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

fn fail(error: &DrakeError) -> ExitCode {
    let ui = Ui::new(false);
    match error {
        DrakeError::Aborted => eprintln!("{}", error),
        DrakeError::InvalidTarget { .. } | DrakeError::InvalidArgument { .. } => {
            ui.error(&format!("Error: {}", error));
            eprintln!("Run with --help for usage.");
        }
        _ => ui.error(&format!("Error: {}", error)),
    }
    ExitCode::from(error.exit_code() as u8)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            if e.kind() == ErrorKind::UnknownArgument {
                eprintln!(
                    "hint: to exclude a target, place its '-name' form after the first target expression"
                );
            }
            return ExitCode::from(255);
        }
    };

    let options = match cli::build_options(&cli) {
        Ok(options) => options,
        Err(e) => return fail(&e),
    };

    if let Err(e) = init_tracing(&options) {
        return fail(&e.into());
    }

    tracing::debug!("drake starting with options: {:?}", options);

    match cli::run(&options, &cli.targets) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}
