mod commands;
mod helpers;

use clap::Parser;
use spectra_core::SpectraError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let spectra_error = error.as_spectra_error();
            eprintln!("{}", spectra_error.diagnostic_line());
            eprintln!("{}", spectra_error.fatal_exit_line());
            spectra_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("spectra".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Log to stderr so stdout stays parseable. `RUST_LOG` wins unless `-v` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when `run` is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "spectra",
    about = "Recompute and rescale spectral quantities stored in spectrum JSON files"
)]
struct Cli {
    /// Log planner decisions and recomputed quantities
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compute every requested quantity derivable from the stored ones
    Update(commands::UpdateArgs),
    /// Rescale every stored quantity to a new path length
    RescalePathLength(commands::PathLengthArgs),
    /// Rescale every stored quantity to a new mole fraction
    RescaleMoleFraction(commands::MoleFractionArgs),
    /// Report which quantities can be derived from the stored ones
    Reachable(commands::ReachableArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Update(args) => commands::run_update_command(args),
        CliCommand::RescalePathLength(args) => commands::run_path_length_command(args),
        CliCommand::RescaleMoleFraction(args) => commands::run_mole_fraction_command(args),
        CliCommand::Reachable(args) => commands::run_reachable_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SpectraError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_spectra_error(&self) -> SpectraError {
        match self {
            Self::Usage(message) => {
                SpectraError::configuration("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SpectraError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<SpectraError> for CliError {
    fn from(error: SpectraError) -> Self {
        Self::Compute(error)
    }
}
