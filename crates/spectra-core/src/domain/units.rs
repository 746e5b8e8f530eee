//! Unit strings attached to spectral quantities.

use super::WaveUnit;

pub const ABSCOEFF: &str = "cm-1";
pub const ABSORBANCE: &str = "";
pub const TRANSMITTANCE: &str = "I/I0";
pub const EMISSIVITY: &str = "eps";

pub const fn default_radiance(waveunit: WaveUnit) -> &'static str {
    match waveunit {
        WaveUnit::Nanometer => "mW/cm2/sr/nm",
        WaveUnit::Wavenumber => "mW/cm2/sr/cm-1",
    }
}

pub const fn default_emisscoeff(waveunit: WaveUnit) -> &'static str {
    match waveunit {
        WaveUnit::Nanometer => "mW/cm3/sr/nm",
        WaveUnit::Wavenumber => "mW/cm3/sr/cm-1",
    }
}

/// Unit of `emisscoeff × path_length` given the unit of `emisscoeff`.
pub fn radiance_from_emisscoeff(emisscoeff_unit: &str) -> String {
    if emisscoeff_unit.contains("/cm3") {
        emisscoeff_unit.replacen("/cm3", "/cm2", 1)
    } else {
        format!("{emisscoeff_unit}*cm")
    }
}

/// Unit of `radiance / path_length` given the unit of the radiance.
pub fn emisscoeff_from_radiance(radiance_unit: &str) -> String {
    if radiance_unit.contains("/cm2") {
        radiance_unit.replacen("/cm2", "/cm3", 1)
    } else {
        format!("{radiance_unit}/cm")
    }
}

/// Unit of a quantity convolved with a slit normalized to a unit peak: the
/// result is integrated over the slit unit.
pub fn integrated_over(unit: &str, slit_unit: WaveUnit) -> String {
    let suffix = format!("/{}", slit_unit.as_str());
    match unit.strip_suffix(suffix.as_str()) {
        Some(stripped) => stripped.to_string(),
        None if unit.is_empty() => slit_unit.as_str().to_string(),
        None => format!("{unit}*{}", slit_unit.as_str()),
    }
}
