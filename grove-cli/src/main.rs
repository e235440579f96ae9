//! Entry point of the `grove` binary.
//!
//! Parses arguments with clap, runs one index command, and prints its report
//! to stdout. Diagnostics go to stderr through `tracing`.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use grove_cli::{
    cli::{Cli, CliError, render_report, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let report = run_cli(cli).context("failed to execute command")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_report(&report, &mut writer).context("failed to render report")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let (code, object_code) = err
            .downcast_ref::<CliError>()
            .and_then(|cli_error| match cli_error {
                CliError::Core(core) => Some((Some(core.code()), core.object_code())),
                _ => None,
            })
            .unwrap_or((None, None));

        error!(
            error = %err,
            code = code.map(|code| field::display(code.as_str())),
            object_code = object_code.map(|code| field::display(code.as_str())),
            "command failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[allow(clippy::print_stderr, reason = "tracing is not installed when this runs")]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialise logging: {err}");
}
