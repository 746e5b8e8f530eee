use super::CliError;
use super::helpers::*;
use spectra_core::rescale::{
    QuantityRequest, get_reachable, rescale_mole_fraction, rescale_path_length, update,
};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct UpdateArgs {
    /// Spectrum JSON file
    input: PathBuf,

    /// Quantity to compute: `all`, `same`, or a quantity name
    #[arg(long, default_value = "all")]
    quantity: QuantityRequest,

    /// Override the optical thickness recorded in the spectrum conditions
    #[arg(long)]
    optically_thin: Option<bool>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
pub(super) struct PathLengthArgs {
    /// Spectrum JSON file
    input: PathBuf,

    /// Target path length (cm)
    #[arg(long = "to", allow_negative_numbers = true)]
    new_path_length: f64,

    /// Path length the spectrum was computed for, when not recorded in it (cm)
    #[arg(long = "from", allow_negative_numbers = true)]
    old_path_length: Option<f64>,

    /// Accept non-positive targets and drop convolved quantities without their raw sibling
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
pub(super) struct MoleFractionArgs {
    /// Spectrum JSON file
    input: PathBuf,

    /// Target mole fraction
    #[arg(long = "to", allow_negative_numbers = true)]
    new_mole_fraction: f64,

    /// Mole fraction the spectrum was computed for, when not recorded in it
    #[arg(long = "from", allow_negative_numbers = true)]
    old_mole_fraction: Option<f64>,

    /// Report a stated-vs-recorded mole fraction mismatch at debug level only
    #[arg(long)]
    ignore_warnings: bool,

    /// Accept non-positive targets and drop convolved quantities without their raw sibling
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
pub(super) struct ReachableArgs {
    /// Spectrum JSON file
    input: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct OutputArgs {
    /// Write the resulting spectrum here instead of printing it to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub(super) fn run_update_command(args: UpdateArgs) -> Result<i32, CliError> {
    let mut spectrum = load_input(&args.input)?;
    let report = update(&mut spectrum, args.quantity, args.optically_thin)?;
    emit_spectrum(&spectrum, &report, args.output.output.as_deref())?;
    Ok(0)
}

pub(super) fn run_path_length_command(args: PathLengthArgs) -> Result<i32, CliError> {
    let mut spectrum = load_input(&args.input)?;
    let report = rescale_path_length(
        &mut spectrum,
        args.new_path_length,
        args.old_path_length,
        args.force,
    )?;
    emit_spectrum(&spectrum, &report, args.output.output.as_deref())?;
    Ok(0)
}

pub(super) fn run_mole_fraction_command(args: MoleFractionArgs) -> Result<i32, CliError> {
    let mut spectrum = load_input(&args.input)?;
    let report = rescale_mole_fraction(
        &mut spectrum,
        args.new_mole_fraction,
        args.old_mole_fraction,
        args.ignore_warnings,
        args.force,
    )?;
    emit_spectrum(&spectrum, &report, args.output.output.as_deref())?;
    Ok(0)
}

pub(super) fn run_reachable_command(args: ReachableArgs) -> Result<i32, CliError> {
    let spectrum = load_input(&args.input)?;
    print_json(&get_reachable(&spectrum))?;
    Ok(0)
}
