//! One rescaler per quantity. Each tries its sources in a fixed order, first
//! satisfied source wins, and records the result in a [`Rescaled`]
//! accumulator. The spectrum itself is never modified here.

use crate::domain::{Quantity, QuantitySet, SpectraError, SpectraResult, units};
use crate::numerics::{
    PlanckError, absorbance_from_transmittance, calc_radiance, has_exact_zero, scaled, select,
    transmittance_from_absorbance,
};
use crate::spectrum::{Spectrum, VarScope};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Computed,
    AlreadyRescaled,
    /// No source was available and the quantity is not strictly required.
    Skipped,
    /// The `_noslit` sibling is rescaled; the slit has to be applied again.
    SlitRequired,
}

/// Quantities computed during one recalculation, with their units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rescaled {
    values: BTreeMap<Quantity, Vec<f64>>,
    units: BTreeMap<Quantity, String>,
}

impl Rescaled {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, quantity: Quantity) -> bool {
        self.values.contains_key(&quantity)
    }

    pub fn get(&self, quantity: Quantity) -> Option<&[f64]> {
        self.values.get(&quantity).map(Vec::as_slice)
    }

    pub fn unit(&self, quantity: Quantity) -> Option<&str> {
        self.units.get(&quantity).map(String::as_str)
    }

    pub fn insert(&mut self, quantity: Quantity, values: Vec<f64>, unit: impl Into<String>) {
        self.values.insert(quantity, values);
        self.units.insert(quantity, unit.into());
    }

    /// Returns `false` and keeps the existing entry when the quantity is
    /// already rescaled.
    pub fn insert_if_absent(
        &mut self,
        quantity: Quantity,
        values: Vec<f64>,
        unit: impl Into<String>,
    ) -> bool {
        if self.contains(quantity) {
            return false;
        }
        self.insert(quantity, values, unit);
        true
    }

    pub fn quantities(&self) -> QuantitySet {
        self.values.keys().copied().collect()
    }

    pub fn into_entries(mut self) -> Vec<(Quantity, Vec<f64>, String)> {
        let values = std::mem::take(&mut self.values);
        values
            .into_iter()
            .map(|(quantity, values)| {
                let unit = self.units.remove(&quantity).unwrap_or_default();
                (quantity, values, unit)
            })
            .collect()
    }
}

/// Everything a rescaler reads: the spectrum as it was before the run and
/// the scaling being applied.
#[derive(Debug, Clone, Copy)]
pub struct RescaleContext<'a> {
    pub spectrum: &'a Spectrum,
    /// Quantities the spectrum held when the run started.
    pub initial: QuantitySet,
    pub old_mole_fraction: f64,
    pub new_mole_fraction: f64,
    pub old_path_length: f64,
    pub new_path_length: f64,
    pub optically_thin: bool,
    pub path_length_known: bool,
    pub equilibrium: bool,
    /// Quantities that may be skipped when no source is available.
    pub extra: QuantitySet,
}

impl<'a> RescaleContext<'a> {
    /// Unchanged path length and mole fraction, flags read from the spectrum.
    pub fn new(spectrum: &'a Spectrum) -> Self {
        let mole_fraction = spectrum.conditions.mole_fraction.unwrap_or(1.0);
        let path_length = spectrum.conditions.path_length.unwrap_or(1.0);
        Self {
            spectrum,
            initial: spectrum.get_vars(VarScope::All),
            old_mole_fraction: mole_fraction,
            new_mole_fraction: mole_fraction,
            old_path_length: path_length,
            new_path_length: path_length,
            optically_thin: spectrum.is_optically_thin(),
            path_length_known: spectrum.conditions.path_length.is_some(),
            equilibrium: spectrum.is_at_equilibrium(),
            extra: QuantitySet::empty(),
        }
    }

    pub fn mole_fraction_ratio(&self) -> f64 {
        self.new_mole_fraction / self.old_mole_fraction
    }

    pub fn path_length_ratio(&self) -> f64 {
        self.new_path_length / self.old_path_length
    }

    pub fn flags(&self) -> String {
        format!(
            "optically_thin={}, equilibrium={}, path_length_known={}",
            self.optically_thin, self.equilibrium, self.path_length_known
        )
    }

    fn held(&self, quantity: Quantity) -> Option<&'a [f64]> {
        if self.initial.contains(quantity) {
            self.spectrum.get(quantity)
        } else {
            None
        }
    }

    fn held_unit(&self, quantity: Quantity) -> String {
        self.spectrum
            .unit(quantity)
            .unwrap_or(quantity.default_unit(self.spectrum.get_waveunit()))
            .to_string()
    }

    fn unavailable(&self, quantity: Quantity, requirement: &str) -> SpectraResult<Derivation> {
        if self.extra.contains(quantity) {
            debug!("skipping {quantity}: requires {requirement}");
            return Ok(Derivation::Skipped);
        }
        Err(SpectraError::derivation(
            "RESCALE.MISSING_SOURCE",
            format!(
                "cannot compute {quantity}: requires {requirement} ({}); available: {}",
                self.flags(),
                self.initial
            ),
        ))
    }

    fn saturated(&self, quantity: Quantity, detail: &str) -> SpectraResult<Derivation> {
        if self.extra.contains(quantity) {
            debug!("skipping {quantity}: {detail}");
            return Ok(Derivation::Skipped);
        }
        Err(SpectraError::saturation(
            "RESCALE.SATURATED_TRANSMITTANCE",
            format!("cannot compute {quantity}: {detail}"),
        ))
    }
}

/// Run the rescaler of `quantity`.
pub fn rescale(
    quantity: Quantity,
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    match quantity {
        Quantity::Abscoeff => rescale_abscoeff(ctx, rescaled),
        Quantity::Emisscoeff => rescale_emisscoeff(ctx, rescaled),
        Quantity::Absorbance => rescale_absorbance(ctx, rescaled),
        Quantity::TransmittanceNoslit => rescale_transmittance_noslit(ctx, rescaled),
        Quantity::RadianceNoslit => rescale_radiance_noslit(ctx, rescaled),
        Quantity::EmissivityNoslit => rescale_emissivity_noslit(ctx, rescaled),
        Quantity::Radiance | Quantity::Transmittance | Quantity::Emissivity => {
            rescale_convolved(quantity, ctx, rescaled)
        }
        Quantity::AbscoeffContinuum => Err(SpectraError::configuration(
            "RESCALE.NON_RESCALABLE_QUANTITY",
            format!("{quantity} cannot be rescaled"),
        )),
    }
}

pub fn rescale_abscoeff(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::Abscoeff;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let length = ctx.old_path_length;
    let abscoeff = if let Some(abscoeff) = ctx.held(quantity) {
        abscoeff.to_vec()
    } else if let (Some(absorbance), true) =
        (ctx.held(Quantity::Absorbance), ctx.path_length_known)
    {
        divided(absorbance, length)
    } else if let (Some(transmittance), true) =
        (ctx.held(Quantity::TransmittanceNoslit), ctx.path_length_known)
    {
        if has_exact_zero(transmittance) {
            return ctx.saturated(
                quantity,
                "transmittance_noslit is saturated (T = 0), the absorption coefficient is unbounded",
            );
        }
        divided(&absorbance_from_transmittance(transmittance), length)
    } else if let Some(abscoeff) = kirchhoff_abscoeff(ctx)? {
        abscoeff
    } else {
        return ctx.unavailable(
            quantity,
            "absorbance or transmittance_noslit and a known path_length",
        );
    };

    rescaled.insert(
        quantity,
        scaled(&abscoeff, ctx.mole_fraction_ratio()),
        ctx.held_unit(quantity),
    );
    Ok(Derivation::Computed)
}

/// At equilibrium `j = k B`, and `eps = I / B = 1 - exp(-k L)`.
fn kirchhoff_abscoeff(ctx: &RescaleContext<'_>) -> SpectraResult<Option<Vec<f64>>> {
    if !ctx.equilibrium {
        return Ok(None);
    }
    let Some(tgas) = ctx.spectrum.conditions.tgas else {
        return Ok(None);
    };

    let source = blackbody(ctx.spectrum, tgas)?;
    if let Some(emisscoeff) = ctx.held(Quantity::Emisscoeff) {
        return Ok(Some(ratio_or_zero(emisscoeff, &source)));
    }
    if !ctx.path_length_known {
        return Ok(None);
    }

    let emissivity = match (
        ctx.held(Quantity::EmissivityNoslit),
        ctx.held(Quantity::RadianceNoslit),
    ) {
        (Some(emissivity), _) => emissivity.to_vec(),
        (None, Some(radiance)) => ratio_or_zero(radiance, &source),
        (None, None) => return Ok(None),
    };
    Ok(Some(
        emissivity
            .iter()
            .map(|eps| -(-eps).ln_1p() / ctx.old_path_length)
            .collect(),
    ))
}

pub fn rescale_emisscoeff(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::Emisscoeff;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let length = ctx.old_path_length;
    let (emisscoeff, unit) = if let Some(emisscoeff) = ctx.held(quantity) {
        (emisscoeff.to_vec(), ctx.held_unit(quantity))
    } else if let (Some(radiance), true) =
        (ctx.held(Quantity::RadianceNoslit), ctx.path_length_known)
    {
        let unit = units::emisscoeff_from_radiance(&ctx.held_unit(Quantity::RadianceNoslit));
        let thin = divided(radiance, length);
        if ctx.optically_thin {
            (thin, unit)
        } else if let Some(abscoeff) = old_abscoeff(ctx, rescaled) {
            let transmittance: Vec<f64> =
                abscoeff.iter().map(|k| (-k * length).exp()).collect();
            let mask: Vec<bool> = transmittance.iter().map(|t| *t == 1.0).collect();
            let thick = emisscoeff_from_transfer(radiance, &abscoeff, &transmittance);
            (select(&mask, &thin, &thick), unit)
        } else if let Some(transmittance) = ctx.held(Quantity::TransmittanceNoslit) {
            if has_exact_zero(transmittance) {
                return ctx.saturated(
                    quantity,
                    "transmittance_noslit is saturated (T = 0), the emission coefficient is unbounded",
                );
            }
            let abscoeff = divided(&absorbance_from_transmittance(transmittance), length);
            let mask: Vec<bool> = transmittance.iter().map(|t| *t == 1.0).collect();
            let thick = emisscoeff_from_transfer(radiance, &abscoeff, transmittance);
            (select(&mask, &thin, &thick), unit)
        } else {
            return ctx.unavailable(
                quantity,
                "abscoeff or transmittance_noslit next to radiance_noslit when not optically thin",
            );
        }
    } else {
        return ctx.unavailable(quantity, "radiance_noslit and a known path_length");
    };

    rescaled.insert(
        quantity,
        scaled(&emisscoeff, ctx.mole_fraction_ratio()),
        unit,
    );
    Ok(Derivation::Computed)
}

/// Absorption coefficient at the old mole fraction.
fn old_abscoeff(ctx: &RescaleContext<'_>, rescaled: &Rescaled) -> Option<Vec<f64>> {
    if let Some(abscoeff) = ctx.held(Quantity::Abscoeff) {
        return Some(abscoeff.to_vec());
    }
    let ratio = ctx.mole_fraction_ratio();
    if ratio == 0.0 {
        return None;
    }
    rescaled
        .get(Quantity::Abscoeff)
        .map(|abscoeff| divided(abscoeff, ratio))
}

pub fn rescale_absorbance(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::Absorbance;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let ratio = ctx.mole_fraction_ratio() * ctx.path_length_ratio();
    let absorbance = if let Some(absorbance) = ctx.held(quantity) {
        scale_optical_depth(absorbance, ratio)
    } else if let (Some(abscoeff), true) =
        (rescaled.get(Quantity::Abscoeff), ctx.path_length_known)
    {
        scaled(abscoeff, ctx.new_path_length)
    } else if let Some(transmittance) = ctx.held(Quantity::TransmittanceNoslit) {
        if has_exact_zero(transmittance) && ratio < 1.0 {
            return ctx.saturated(
                quantity,
                "transmittance_noslit is saturated (T = 0) and the column shrinks",
            );
        }
        scale_optical_depth(&absorbance_from_transmittance(transmittance), ratio)
    } else {
        return ctx.unavailable(
            quantity,
            "abscoeff and a known path_length, or transmittance_noslit",
        );
    };

    rescaled.insert(quantity, absorbance, ctx.held_unit(quantity));
    Ok(Derivation::Computed)
}

pub fn rescale_transmittance_noslit(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::TransmittanceNoslit;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let transmittance = if let Some(absorbance) = rescaled.get(Quantity::Absorbance) {
        transmittance_from_absorbance(absorbance)
    } else if let Some(initial) = ctx.held(quantity) {
        let ratio = ctx.mole_fraction_ratio() * ctx.path_length_ratio();
        if has_exact_zero(initial) && ratio < 1.0 {
            return ctx.saturated(
                quantity,
                "transmittance_noslit is saturated (T = 0) and cannot shrink the column",
            );
        }
        let absorbance = absorbance_from_transmittance(initial);
        transmittance_from_absorbance(&scale_optical_depth(&absorbance, ratio))
    } else {
        return ctx.unavailable(quantity, "absorbance, or transmittance_noslit to rescale");
    };

    rescaled.insert(quantity, transmittance, units::TRANSMITTANCE);
    Ok(Derivation::Computed)
}

pub fn rescale_radiance_noslit(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::RadianceNoslit;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let unit = match (ctx.initial.contains(quantity), rescaled.unit(Quantity::Emisscoeff)) {
        (false, Some(emisscoeff_unit)) => units::radiance_from_emisscoeff(emisscoeff_unit),
        _ => ctx.held_unit(quantity),
    };
    let length = ctx.new_path_length;
    let emisscoeff = rescaled
        .get(Quantity::Emisscoeff)
        .filter(|_| ctx.path_length_known);
    let abscoeff = rescaled.get(Quantity::Abscoeff);

    let radiance = if let (Some(emisscoeff), true) = (emisscoeff, ctx.optically_thin) {
        scaled(emisscoeff, length)
    } else if let (Some(emisscoeff), Some(abscoeff), Some(transmittance)) = (
        emisscoeff,
        abscoeff,
        rescaled.get(Quantity::TransmittanceNoslit),
    ) {
        radiance_from_transfer(emisscoeff, abscoeff, transmittance, length)
    } else if let (Some(emisscoeff), Some(abscoeff)) = (emisscoeff, abscoeff) {
        let transmittance: Vec<f64> = abscoeff.iter().map(|k| (-k * length).exp()).collect();
        radiance_from_transfer(emisscoeff, abscoeff, &transmittance, length)
    } else if let (Some(radiance), true) = (ctx.held(quantity), ctx.optically_thin) {
        scaled(
            radiance,
            ctx.mole_fraction_ratio() * ctx.path_length_ratio(),
        )
    } else {
        return ctx.unavailable(
            quantity,
            "emisscoeff and a known path_length, plus abscoeff when not optically thin",
        );
    };

    rescaled.insert(quantity, radiance, unit);
    Ok(Derivation::Computed)
}

pub fn rescale_emissivity_noslit(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
) -> SpectraResult<Derivation> {
    let quantity = Quantity::EmissivityNoslit;
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }

    let Some(transmittance) = rescaled.get(Quantity::TransmittanceNoslit) else {
        return ctx.unavailable(quantity, "transmittance_noslit");
    };
    let emissivity = transmittance.iter().map(|t| 1.0 - t).collect();
    rescaled.insert(quantity, emissivity, units::EMISSIVITY);
    Ok(Derivation::Computed)
}

/// Convolved quantities are never rescaled directly: once their raw sibling
/// is rescaled, the slit is applied again.
fn rescale_convolved(
    quantity: Quantity,
    ctx: &RescaleContext<'_>,
    rescaled: &Rescaled,
) -> SpectraResult<Derivation> {
    if rescaled.contains(quantity) {
        return Ok(Derivation::AlreadyRescaled);
    }
    match quantity.noslit_sibling() {
        Some(raw) if rescaled.contains(raw) => Ok(Derivation::SlitRequired),
        Some(raw) => ctx.unavailable(quantity, &format!("{raw} to be rescaled first")),
        None => Err(SpectraError::consistency(
            "RESCALE.NOT_CONVOLVED",
            format!("{quantity} is not a convolved quantity"),
        )),
    }
}

/// Unit blackbody radiance on the spectrum axis, in the axis intensity unit.
pub(crate) fn blackbody(spectrum: &Spectrum, tgas: f64) -> SpectraResult<Vec<f64>> {
    let wavenumber = spectrum.get_wavenumber();
    let unity = vec![1.0; wavenumber.len()];
    calc_radiance(&wavenumber, &unity, tgas, spectrum.get_waveunit()).map_err(planck_failure)
}

pub(crate) fn planck_failure(error: PlanckError) -> SpectraError {
    SpectraError::configuration("RESCALE.PLANCK_INPUT", error.to_string())
}

fn divided(values: &[f64], divisor: f64) -> Vec<f64> {
    values.iter().map(|value| value / divisor).collect()
}

/// `numerator / denominator`, zero where the denominator vanishes.
fn ratio_or_zero(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| if *d == 0.0 { 0.0 } else { n / d })
        .collect()
}

/// A zero ratio empties the column even where the optical depth is infinite.
fn scale_optical_depth(values: &[f64], ratio: f64) -> Vec<f64> {
    if ratio == 0.0 {
        vec![0.0; values.len()]
    } else {
        scaled(values, ratio)
    }
}

/// `j = k I / (1 - T)`; undefined where `T == 1`.
fn emisscoeff_from_transfer(radiance: &[f64], abscoeff: &[f64], transmittance: &[f64]) -> Vec<f64> {
    radiance
        .iter()
        .zip(abscoeff)
        .zip(transmittance)
        .map(|((i, k), t)| k * i / (1.0 - t))
        .collect()
}

/// Single-layer solution `I = j / k (1 - T)`, falling back to `j L` where
/// `k == 0`.
fn radiance_from_transfer(
    emisscoeff: &[f64],
    abscoeff: &[f64],
    transmittance: &[f64],
    length: f64,
) -> Vec<f64> {
    let mask: Vec<bool> = abscoeff.iter().map(|k| *k == 0.0).collect();
    let thin = scaled(emisscoeff, length);
    let thick: Vec<f64> = emisscoeff
        .iter()
        .zip(abscoeff)
        .zip(transmittance)
        .map(|((j, k), t)| j / k * (1.0 - t))
        .collect();
    select(&mask, &thin, &thick)
}
