//! `kartoshka-backend`: run one command and exit.
//!
//! Exit codes: 0 when the terminal record is a success, 1 when a failure
//! record was written, 2 for argument errors (also reported as a record).

use std::io;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use kartoshka_core::{Command, FailureKind};
use kartoshka_dispatch::logging::init_logging;
use kartoshka_dispatch::{BackendArgs, Dispatcher, RecordWriter, YtDlpSource};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match BackendArgs::try_parse() {
        Ok(args) => args,
        Err(e) => return usage_error(&e),
    };
    init_logging(args.verbose);

    let mut out = RecordWriter::new(io::stdout());

    let command = match Command::from_parts(args.into_parts()) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected command line");
            if out.failure(FailureKind::InvalidRequest, e.to_string()).is_err() {
                return ExitCode::from(EXIT_FAILURE);
            }
            let _ = out.finish();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let dispatcher = Dispatcher::new(YtDlpSource::from_env());
    if let Err(e) = dispatcher.run(&command, &mut out).await {
        tracing::error!(error = %e, "Lost the output stream");
        return ExitCode::from(EXIT_FAILURE);
    }

    match out.finish() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            tracing::error!(error = %e, "Failed to flush output");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Help and version go to stdout as usual. Anything else is reported as a
/// failure record.
fn usage_error(err: &clap::Error) -> ExitCode {
    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        let _ = err.print();
        return ExitCode::SUCCESS;
    }

    let _ = err.print();
    let message = err
        .to_string()
        .lines()
        .next()
        .unwrap_or("Invalid arguments")
        .trim_start_matches("error: ")
        .to_string();

    let mut out = RecordWriter::new(io::stdout());
    let _ = out.failure(FailureKind::InvalidRequest, message);
    let _ = out.finish();
    ExitCode::from(EXIT_USAGE)
}
