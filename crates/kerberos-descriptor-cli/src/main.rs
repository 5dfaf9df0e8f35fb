use clap::Parser;
use snafu::{ResultExt, Snafu};

mod cli;
mod logging;

const APP_NAME: &str = "kerberos-descriptor";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to resolve descriptor"))]
    Run { source: cli::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let opts = cli::Opts::parse();
    logging::initialize_logging("KERBEROS_DESCRIPTOR_LOG", APP_NAME)
        .context(InitializeLoggingSnafu)?;

    let stdout = std::io::stdout();
    cli::run(&opts, &mut stdout.lock()).context(RunSnafu)
}
