use super::CliError;
use anyhow::Context;
use serde::Serialize;
use spectra_core::rescale::RecalculationReport;
use spectra_core::spectrum::{Spectrum, load_spectrum, save_spectrum};
use std::io::Write;
use std::path::Path;

pub(super) fn load_input(path: &Path) -> Result<Spectrum, CliError> {
    load_spectrum(path).map_err(|error| CliError::Compute(error.into()))
}

/// With an output path the spectrum is saved and a summary printed;
/// otherwise the spectrum JSON itself goes to stdout.
pub(super) fn emit_spectrum(
    spectrum: &Spectrum,
    report: &RecalculationReport,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let Some(path) = output else {
        return print_json(spectrum);
    };
    save_spectrum(spectrum, path).map_err(|error| CliError::Compute(error.into()))?;
    println!("{}", render_report(report));
    println!("Spectrum: {}", path.display());
    Ok(())
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to serialize command output")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write command output")?;
    Ok(())
}

pub(super) fn render_report(report: &RecalculationReport) -> String {
    format!(
        "Wanted: {}\nRecomputed: {}\nAdded: {}\nSlit reapplied: {}",
        report.wanted, report.recompute, report.added, report.slit_reapplied
    )
}
