use crate::domain::WaveUnit;
use crate::numerics::{NormBy, SlitSettings, SlitShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Physical conditions a spectrum was produced under.
///
/// Keys this crate does not interpret are kept in `extra` so that a
/// load/save cycle does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Path length in cm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mole_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_absorption: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_equilibrium: Option<bool>,
    #[serde(rename = "Tgas", default, skip_serializing_if = "Option::is_none")]
    pub tgas: Option<f64>,
    #[serde(rename = "Tvib", default, skip_serializing_if = "Option::is_none")]
    pub tvib: Option<f64>,
    #[serde(rename = "Trot", default, skip_serializing_if = "Option::is_none")]
    pub trot: Option<f64>,
    /// Slit FWHM, in `slit_unit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slit_function: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slit_unit: Option<WaveUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_by: Option<NormBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<SlitShape>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Conditions {
    pub fn is_optically_thin(&self) -> bool {
        !self.self_absorption.unwrap_or(true)
    }

    /// An explicit `thermal_equilibrium` flag wins; otherwise the medium is
    /// at equilibrium when `Tgas` is known and the vibrational and
    /// rotational temperatures are absent or equal to it.
    pub fn is_at_equilibrium(&self) -> bool {
        if let Some(flag) = self.thermal_equilibrium {
            return flag;
        }
        let Some(tgas) = self.tgas else {
            return false;
        };
        [self.tvib, self.trot]
            .into_iter()
            .flatten()
            .all(|temperature| temperature == tgas)
    }

    /// Names of the slit-defining conditions that are not set.
    pub fn missing_slit_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.slit_function.is_none() {
            missing.push("slit_function");
        }
        if self.slit_unit.is_none() {
            missing.push("slit_unit");
        }
        if self.norm_by.is_none() {
            missing.push("norm_by");
        }
        missing
    }

    pub fn slit_available(&self) -> bool {
        self.slit_settings().is_some()
    }

    pub fn slit_settings(&self) -> Option<SlitSettings> {
        Some(SlitSettings::new(
            self.slit_function?,
            self.slit_unit?,
            self.shape.unwrap_or_default(),
            self.norm_by?,
        ))
    }

    pub fn record_slit(&mut self, slit: &SlitSettings) {
        self.slit_function = Some(slit.fwhm);
        self.slit_unit = Some(slit.unit);
        self.shape = Some(slit.shape);
        self.norm_by = Some(slit.norm_by);
    }
}

#[cfg(test)]
mod tests {
    use super::Conditions;
    use crate::domain::WaveUnit;
    use crate::numerics::{NormBy, SlitShape};

    #[test]
    fn missing_self_absorption_means_self_absorbing() {
        let mut conditions = Conditions::default();
        assert!(!conditions.is_optically_thin());
        conditions.self_absorption = Some(false);
        assert!(conditions.is_optically_thin());
    }

    #[test]
    fn equilibrium_is_inferred_from_temperatures() {
        let mut conditions = Conditions {
            tgas: Some(1500.0),
            ..Conditions::default()
        };
        assert!(conditions.is_at_equilibrium());

        conditions.tvib = Some(1500.0);
        conditions.trot = Some(1500.0);
        assert!(conditions.is_at_equilibrium());

        conditions.tvib = Some(2500.0);
        assert!(!conditions.is_at_equilibrium());

        conditions.thermal_equilibrium = Some(true);
        assert!(conditions.is_at_equilibrium());

        assert!(!Conditions::default().is_at_equilibrium());
    }

    #[test]
    fn slit_requires_function_unit_and_normalization() {
        let mut conditions = Conditions {
            slit_function: Some(0.5),
            ..Conditions::default()
        };
        assert_eq!(conditions.missing_slit_keys(), vec!["slit_unit", "norm_by"]);
        assert!(!conditions.slit_available());

        conditions.slit_unit = Some(WaveUnit::Nanometer);
        conditions.norm_by = Some(NormBy::Area);
        let slit = conditions.slit_settings().expect("slit is complete");
        assert_eq!(slit.shape, SlitShape::Triangular);
        assert!(conditions.missing_slit_keys().is_empty());
    }

    #[test]
    fn unknown_keys_survive_serialization() {
        let json = r#"{"path_length": 10.0, "Tgas": 300.0, "molecule": "CO2", "pressure_mbar": 1013.25}"#;
        let conditions: Conditions = serde_json::from_str(json).unwrap();
        assert_eq!(conditions.path_length, Some(10.0));
        assert_eq!(conditions.tgas, Some(300.0));
        assert_eq!(conditions.extra["molecule"], "CO2");

        let rendered = serde_json::to_value(&conditions).unwrap();
        assert_eq!(rendered["pressure_mbar"], 1013.25);
        assert!(rendered.get("mole_fraction").is_none());
    }
}
