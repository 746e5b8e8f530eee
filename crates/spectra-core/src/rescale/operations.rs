//! Entry points: fill in derivable quantities, or rescale a spectrum to a
//! new path length or mole fraction.

use super::orchestrator::{QuantityRequest, Recalculation, RecalculationReport, recalculate};
use crate::domain::{QuantitySet, SpectraError, SpectraResult};
use crate::spectrum::{Spectrum, VarScope};
use tracing::{debug, warn};

/// Compute every requested quantity that can be derived from what the
/// spectrum holds, without changing path length or mole fraction.
///
/// `optically_thin` defaults to the `self_absorption` condition; the
/// condition is updated to match.
pub fn update(
    spectrum: &mut Spectrum,
    quantity: QuantityRequest,
    optically_thin: Option<bool>,
) -> SpectraResult<RecalculationReport> {
    let optically_thin = optically_thin.unwrap_or_else(|| spectrum.is_optically_thin());
    let self_absorption = !optically_thin;
    match spectrum.conditions.self_absorption {
        Some(current) if current != self_absorption => warn!(
            "self_absorption changes from {current} to {self_absorption}; stored quantities were \
             computed under the previous assumption"
        ),
        _ => {}
    }
    spectrum.conditions.self_absorption = Some(self_absorption);

    let path_length = spectrum.conditions.path_length;
    let mole_fraction = spectrum.conditions.mole_fraction.unwrap_or(1.0);
    let report = recalculate(
        spectrum,
        &Recalculation {
            quantity,
            old_mole_fraction: mole_fraction,
            new_mole_fraction: mole_fraction,
            old_path_length: path_length.unwrap_or(1.0),
            new_path_length: path_length.unwrap_or(1.0),
            path_length_known: path_length.is_some(),
            optically_thin: Some(optically_thin),
        },
    )?;

    let without_unit: QuantitySet = report
        .added
        .iter()
        .filter(|quantity| spectrum.unit(*quantity).is_none())
        .collect();
    if !without_unit.is_empty() {
        return Err(SpectraError::consistency(
            "RESCALE.MISSING_UNIT",
            format!("no unit was recorded for {without_unit}"),
        ));
    }
    Ok(report)
}

pub fn rescale_path_length(
    spectrum: &mut Spectrum,
    new_path_length: f64,
    old_path_length: Option<f64>,
    force: bool,
) -> SpectraResult<RecalculationReport> {
    let stored = spectrum.conditions.path_length;
    let old_path_length = match (old_path_length, stored) {
        (Some(old), Some(stored)) => {
            if old != stored {
                warn!(
                    "path_length given as {old} cm but the spectrum records {stored} cm; using {old} cm"
                );
            }
            old
        }
        (Some(old), None) => old,
        (None, Some(stored)) => stored,
        (None, None) => {
            return Err(SpectraError::configuration(
                "RESCALE.PATH_LENGTH_UNKNOWN",
                "spectrum has no path_length condition; give the old path length explicitly",
            ));
        }
    };
    if !old_path_length.is_finite() || old_path_length <= 0.0 {
        return Err(SpectraError::configuration(
            "RESCALE.INVALID_OLD_PATH_LENGTH",
            format!("old path length must be finite and > 0, got {old_path_length}"),
        ));
    }
    check_target("path length", new_path_length, force, "RESCALE.INVALID_PATH_LENGTH")?;

    let mole_fraction = spectrum.conditions.mole_fraction.unwrap_or(1.0);
    let report = recalculate_dropping_orphans(
        spectrum,
        force,
        &Recalculation {
            quantity: QuantityRequest::Same,
            old_mole_fraction: mole_fraction,
            new_mole_fraction: mole_fraction,
            old_path_length,
            new_path_length,
            path_length_known: true,
            optically_thin: None,
        },
    )?;
    spectrum.conditions.path_length = Some(new_path_length);
    Ok(report)
}

/// `ignore_warnings` only lowers the stated-vs-stored mismatch message to
/// debug level.
pub fn rescale_mole_fraction(
    spectrum: &mut Spectrum,
    new_mole_fraction: f64,
    old_mole_fraction: Option<f64>,
    ignore_warnings: bool,
    force: bool,
) -> SpectraResult<RecalculationReport> {
    let stored = spectrum.conditions.mole_fraction;
    let old_mole_fraction = match (old_mole_fraction, stored) {
        (Some(old), Some(stored)) => {
            if old != stored {
                if ignore_warnings {
                    debug!("mole_fraction given as {old} but the spectrum records {stored}");
                } else {
                    warn!(
                        "mole_fraction given as {old} but the spectrum records {stored}; using {old}"
                    );
                }
            }
            old
        }
        (Some(old), None) => old,
        (None, Some(stored)) => stored,
        (None, None) => {
            return Err(SpectraError::configuration(
                "RESCALE.MOLE_FRACTION_UNKNOWN",
                "spectrum has no mole_fraction condition; give the old mole fraction explicitly",
            ));
        }
    };
    if !old_mole_fraction.is_finite() || old_mole_fraction <= 0.0 {
        return Err(SpectraError::configuration(
            "RESCALE.INVALID_OLD_MOLE_FRACTION",
            format!("old mole fraction must be finite and > 0, got {old_mole_fraction}"),
        ));
    }
    check_target("mole fraction", new_mole_fraction, force, "RESCALE.INVALID_MOLE_FRACTION")?;
    if new_mole_fraction > 1.0 {
        warn!("mole fraction {new_mole_fraction} is above 1");
    }

    let path_length = spectrum.conditions.path_length;
    let report = recalculate_dropping_orphans(
        spectrum,
        force,
        &Recalculation {
            quantity: QuantityRequest::Same,
            old_mole_fraction,
            new_mole_fraction,
            old_path_length: path_length.unwrap_or(1.0),
            new_path_length: path_length.unwrap_or(1.0),
            path_length_known: path_length.is_some(),
            optically_thin: None,
        },
    )?;
    spectrum.conditions.mole_fraction = Some(new_mole_fraction);
    Ok(report)
}

fn check_target(
    label: &str,
    value: f64,
    force: bool,
    placeholder: &'static str,
) -> SpectraResult<()> {
    if !value.is_finite() {
        return Err(SpectraError::configuration(
            placeholder,
            format!("new {label} must be finite, got {value}"),
        ));
    }
    if value > 0.0 {
        return Ok(());
    }
    if force {
        warn!("rescaling to a non-positive {label} ({value}) because force is set");
        return Ok(());
    }
    Err(SpectraError::configuration(
        placeholder,
        format!("new {label} must be > 0, got {value}; use force to override"),
    ))
}

/// A convolved quantity can only be rescaled through its raw sibling. With
/// `force` such orphans are dropped, but only from a spectrum whose
/// recalculation succeeded.
fn recalculate_dropping_orphans(
    spectrum: &mut Spectrum,
    force: bool,
    request: &Recalculation,
) -> SpectraResult<RecalculationReport> {
    let held = spectrum.get_vars(VarScope::All);
    let orphans: QuantitySet = spectrum
        .get_vars(VarScope::Convoluted)
        .iter()
        .filter(|quantity| {
            quantity
                .noslit_sibling()
                .is_some_and(|sibling| !held.contains(sibling))
        })
        .collect();
    if orphans.is_empty() {
        return recalculate(spectrum, request);
    }
    if !force {
        return Err(SpectraError::configuration(
            "RESCALE.CONVOLVED_WITHOUT_NOSLIT",
            format!(
                "{orphans} cannot be rescaled without the matching _noslit quantities; \
                 use force to drop them"
            ),
        ));
    }

    let mut working = spectrum.clone();
    for quantity in orphans.iter() {
        working.remove(quantity);
    }
    let report = recalculate(&mut working, request)?;
    warn!("dropped {orphans}: cannot be rescaled without the matching _noslit quantities");
    *spectrum = working;
    Ok(report)
}
