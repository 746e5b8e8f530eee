//! Planck law radiance for a medium of given emissivity.

use crate::domain::WaveUnit;

/// Planck constant (J s).
pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;
/// Speed of light in vacuum (cm/s).
pub const SPEED_OF_LIGHT_CM: f64 = 2.997_924_58e10;
/// Second radiation constant `h c / k` (cm K).
pub const SECOND_RADIATION_CONSTANT: f64 = 1.438_776_877;

const WATT_TO_MILLIWATT: f64 = 1.0e3;
const NM_PER_CM: f64 = 1.0e7;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanckError {
    #[error("gas temperature must be finite and > 0 K, got {value}")]
    InvalidTemperature { value: f64 },
    #[error("wavenumber must be finite and > 0 cm-1 at index {index}, got {value}")]
    InvalidWavenumber { index: usize, value: f64 },
    #[error("radiance input length mismatch: wavenumber={wavenumber}, emissivity={emissivity}")]
    LengthMismatch { wavenumber: usize, emissivity: usize },
}

/// Blackbody spectral radiance at `wavenumber` (cm-1), in `mW/cm2/sr/cm-1`
/// or `mW/cm2/sr/nm` depending on `unit`.
pub fn planck(wavenumber: f64, temperature: f64, unit: WaveUnit) -> f64 {
    let exponent = SECOND_RADIATION_CONSTANT * wavenumber / temperature;
    let per_wavenumber = 2.0 * PLANCK_CONSTANT * SPEED_OF_LIGHT_CM.powi(2) * wavenumber.powi(3)
        / exponent.exp_m1()
        * WATT_TO_MILLIWATT;

    match unit {
        WaveUnit::Wavenumber => per_wavenumber,
        // |d(wavenumber) / d(wavelength_nm)| = wavenumber^2 / 1e7
        WaveUnit::Nanometer => per_wavenumber * wavenumber.powi(2) / NM_PER_CM,
    }
}

/// Radiance of a uniform medium at temperature `tgas` with the given
/// per-element emissivity.
pub fn calc_radiance(
    wavenumber: &[f64],
    emissivity: &[f64],
    tgas: f64,
    unit: WaveUnit,
) -> Result<Vec<f64>, PlanckError> {
    if !tgas.is_finite() || tgas <= 0.0 {
        return Err(PlanckError::InvalidTemperature { value: tgas });
    }
    if wavenumber.len() != emissivity.len() {
        return Err(PlanckError::LengthMismatch {
            wavenumber: wavenumber.len(),
            emissivity: emissivity.len(),
        });
    }
    if let Some((index, value)) = wavenumber
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite() || *value <= 0.0)
    {
        return Err(PlanckError::InvalidWavenumber { index, value });
    }

    Ok(wavenumber
        .iter()
        .zip(emissivity)
        .map(|(nu, eps)| eps * planck(*nu, tgas, unit))
        .collect())
}
