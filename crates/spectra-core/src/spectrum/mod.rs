//! Spectrum container: a spectral axis, the quantities sampled on it, their
//! units and the conditions the spectrum was produced under.

mod conditions;
mod io;

pub use conditions::Conditions;
pub use io::{SpectrumIoError, load_spectrum, save_spectrum};

use crate::domain::{
    CONVOLUTED_QUANTITIES, Quantity, QuantitySet, SpectraError, SpectraResult, WaveUnit, units,
};
use crate::numerics::{NormBy, SlitSettings, convolve_slit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NM_PER_CM: f64 = 1.0e7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarScope {
    #[default]
    All,
    Convoluted,
    NonConvoluted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpectrumRecord", into = "SpectrumRecord")]
pub struct Spectrum {
    waveunit: WaveUnit,
    wavespace: Vec<f64>,
    noslit: BTreeMap<Quantity, Vec<f64>>,
    convolved: BTreeMap<Quantity, Vec<f64>>,
    units: BTreeMap<Quantity, String>,
    pub conditions: Conditions,
}

/// A convolved quantity computed from its `_noslit` sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolvedQuantity {
    pub quantity: Quantity,
    pub values: Vec<f64>,
    pub unit: String,
}

impl Spectrum {
    pub fn new(waveunit: WaveUnit, wavespace: Vec<f64>) -> SpectraResult<Self> {
        if wavespace.is_empty() {
            return Err(SpectraError::configuration(
                "SPECTRUM.EMPTY_AXIS",
                "spectral axis must contain at least one point",
            ));
        }
        if let Some((index, value)) = wavespace
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || *value <= 0.0)
        {
            return Err(SpectraError::configuration(
                "SPECTRUM.INVALID_AXIS",
                format!("spectral axis must be finite and > 0, index {index} has {value}"),
            ));
        }

        Ok(Self {
            waveunit,
            wavespace,
            noslit: BTreeMap::new(),
            convolved: BTreeMap::new(),
            units: BTreeMap::new(),
            conditions: Conditions::default(),
        })
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_quantity(
        mut self,
        quantity: Quantity,
        values: Vec<f64>,
        unit: impl Into<String>,
    ) -> SpectraResult<Self> {
        self.set(quantity, values, unit)?;
        Ok(self)
    }

    pub fn get_waveunit(&self) -> WaveUnit {
        self.waveunit
    }

    /// Spectral axis in cm-1, whatever unit the spectrum is stored in.
    pub fn get_wavenumber(&self) -> Vec<f64> {
        match self.waveunit {
            WaveUnit::Wavenumber => self.wavespace.clone(),
            WaveUnit::Nanometer => self
                .wavespace
                .iter()
                .map(|wavelength| NM_PER_CM / wavelength)
                .collect(),
        }
    }

    pub fn get_vars(&self, scope: VarScope) -> QuantitySet {
        let convolved = self.convolved.keys().copied();
        let noslit = self.noslit.keys().copied();
        match scope {
            VarScope::All => convolved.chain(noslit).collect(),
            VarScope::Convoluted => convolved.collect(),
            VarScope::NonConvoluted => noslit.collect(),
        }
    }

    pub fn get(&self, quantity: Quantity) -> Option<&[f64]> {
        self.store(quantity).get(&quantity).map(Vec::as_slice)
    }

    pub fn unit(&self, quantity: Quantity) -> Option<&str> {
        self.units.get(&quantity).map(String::as_str)
    }

    pub fn set(
        &mut self,
        quantity: Quantity,
        values: Vec<f64>,
        unit: impl Into<String>,
    ) -> SpectraResult<()> {
        if values.len() != self.wavespace.len() {
            return Err(SpectraError::configuration(
                "SPECTRUM.LENGTH_MISMATCH",
                format!(
                    "{quantity} has {} points but the spectral axis has {}",
                    values.len(),
                    self.wavespace.len()
                ),
            ));
        }
        self.store_mut(quantity).insert(quantity, values);
        self.units.insert(quantity, unit.into());
        Ok(())
    }

    /// Replace the values of a held quantity, keeping its unit.
    pub fn set_values(&mut self, quantity: Quantity, values: Vec<f64>) -> SpectraResult<()> {
        let unit = self
            .unit(quantity)
            .map(str::to_string)
            .unwrap_or_else(|| quantity.default_unit(self.waveunit).to_string());
        self.set(quantity, values, unit)
    }

    pub fn remove(&mut self, quantity: Quantity) -> Option<Vec<f64>> {
        self.units.remove(&quantity);
        self.store_mut(quantity).remove(&quantity)
    }

    pub fn is_optically_thin(&self) -> bool {
        self.conditions.is_optically_thin()
    }

    pub fn is_at_equilibrium(&self) -> bool {
        self.conditions.is_at_equilibrium()
    }

    /// Convolve the given raw quantities with the slit, without touching the
    /// spectrum. Convolved units follow the slit normalization.
    pub fn convolve_noslit<'a>(
        &self,
        sources: impl IntoIterator<Item = (Quantity, &'a [f64], &'a str)>,
        slit: &SlitSettings,
    ) -> SpectraResult<Vec<ConvolvedQuantity>> {
        let mut convolved = Vec::new();
        for (raw, values, unit) in sources {
            let Some(quantity) = raw.convolved_sibling() else {
                continue;
            };
            let values = convolve_slit(&self.wavespace, values, self.waveunit, slit).map_err(
                |source| {
                    SpectraError::configuration(
                        "SLIT.CONVOLUTION",
                        format!("failed to convolve {raw} with the slit: {source}"),
                    )
                },
            )?;
            let unit = match slit.norm_by {
                NormBy::Area => unit.to_string(),
                NormBy::Max => units::integrated_over(unit, slit.unit),
            };
            convolved.push(ConvolvedQuantity {
                quantity,
                values,
                unit,
            });
        }
        Ok(convolved)
    }

    /// Convolve every held raw quantity that has a convolved counterpart and
    /// store the results; records the slit in the conditions.
    pub fn apply_slit(&mut self, slit: &SlitSettings) -> SpectraResult<QuantitySet> {
        let sources: Vec<(Quantity, Vec<f64>, String)> = CONVOLUTED_QUANTITIES
            .iter()
            .filter_map(|quantity| quantity.noslit_sibling())
            .filter_map(|raw| {
                let values = self.get(raw)?.to_vec();
                let unit = self
                    .unit(raw)
                    .unwrap_or(raw.default_unit(self.waveunit))
                    .to_string();
                Some((raw, values, unit))
            })
            .collect();

        let convolved = self.convolve_noslit(
            sources
                .iter()
                .map(|(raw, values, unit)| (*raw, values.as_slice(), unit.as_str())),
            slit,
        )?;

        let mut added = QuantitySet::empty();
        for item in convolved {
            added.insert(item.quantity);
            self.set(item.quantity, item.values, item.unit)?;
        }
        self.conditions.record_slit(slit);
        Ok(added)
    }

    fn store(&self, quantity: Quantity) -> &BTreeMap<Quantity, Vec<f64>> {
        if quantity.is_convolved() {
            &self.convolved
        } else {
            &self.noslit
        }
    }

    fn store_mut(&mut self, quantity: Quantity) -> &mut BTreeMap<Quantity, Vec<f64>> {
        if quantity.is_convolved() {
            &mut self.convolved
        } else {
            &mut self.noslit
        }
    }
}

/// On-disk layout: convolved and raw quantities share one map.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpectrumRecord {
    waveunit: WaveUnit,
    wavespace: Vec<f64>,
    #[serde(default, with = "labelled_floats")]
    quantities: BTreeMap<Quantity, Vec<f64>>,
    #[serde(default)]
    units: BTreeMap<Quantity, String>,
    #[serde(default)]
    conditions: Conditions,
}

/// JSON has no literal for non-finite floats (a saturated column gives an
/// infinite absorbance), so those values are written as `"inf"`, `"-inf"`
/// or `"nan"`.
mod labelled_floats {
    use crate::domain::Quantity;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum StoredValue {
        Number(f64),
        Label(String),
    }

    impl From<f64> for StoredValue {
        fn from(value: f64) -> Self {
            if value.is_finite() {
                Self::Number(value)
            } else if value.is_nan() {
                Self::Label("nan".to_string())
            } else if value > 0.0 {
                Self::Label("inf".to_string())
            } else {
                Self::Label("-inf".to_string())
            }
        }
    }

    impl TryFrom<StoredValue> for f64 {
        type Error = String;

        fn try_from(value: StoredValue) -> Result<Self, Self::Error> {
            match value {
                StoredValue::Number(value) => Ok(value),
                StoredValue::Label(label) => match label.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "nan" => Ok(f64::NAN),
                    _ => Err(format!(
                        "unknown value '{label}', expected a number, inf, -inf or nan"
                    )),
                },
            }
        }
    }

    pub(super) fn serialize<S: Serializer>(
        quantities: &BTreeMap<Quantity, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let stored: BTreeMap<Quantity, Vec<StoredValue>> = quantities
            .iter()
            .map(|(quantity, values)| {
                (*quantity, values.iter().copied().map(StoredValue::from).collect())
            })
            .collect();
        stored.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Quantity, Vec<f64>>, D::Error> {
        BTreeMap::<Quantity, Vec<StoredValue>>::deserialize(deserializer)?
            .into_iter()
            .map(|(quantity, values)| {
                let values = values
                    .into_iter()
                    .map(f64::try_from)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(D::Error::custom)?;
                Ok((quantity, values))
            })
            .collect()
    }
}

impl TryFrom<SpectrumRecord> for Spectrum {
    type Error = SpectraError;

    fn try_from(record: SpectrumRecord) -> Result<Self, Self::Error> {
        let mut spectrum =
            Spectrum::new(record.waveunit, record.wavespace)?.with_conditions(record.conditions);
        let mut units = record.units;
        for (quantity, values) in record.quantities {
            let unit = units
                .remove(&quantity)
                .unwrap_or_else(|| quantity.default_unit(spectrum.waveunit).to_string());
            spectrum.set(quantity, values, unit)?;
        }
        Ok(spectrum)
    }
}

impl From<Spectrum> for SpectrumRecord {
    fn from(spectrum: Spectrum) -> Self {
        let mut quantities = spectrum.noslit;
        quantities.extend(spectrum.convolved);
        Self {
            waveunit: spectrum.waveunit,
            wavespace: spectrum.wavespace,
            quantities,
            units: spectrum.units,
            conditions: spectrum.conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Spectrum, VarScope};
    use crate::domain::{Quantity, WaveUnit};
    use crate::numerics::{NormBy, SlitSettings, SlitShape};

    fn sample() -> Spectrum {
        Spectrum::new(WaveUnit::Nanometer, vec![500.0, 500.5, 501.0, 501.5, 502.0])
            .unwrap()
            .with_quantity(Quantity::RadianceNoslit, vec![1.0; 5], "mW/cm2/sr/nm")
            .unwrap()
            .with_quantity(Quantity::Abscoeff, vec![0.1; 5], "cm-1")
            .unwrap()
    }

    #[test]
    fn quantities_are_routed_to_their_store() {
        let mut spectrum = sample();
        spectrum
            .set(Quantity::Radiance, vec![2.0; 5], "mW/cm2/sr/nm")
            .unwrap();

        let convolved: Vec<Quantity> = spectrum.get_vars(VarScope::Convoluted).iter().collect();
        assert_eq!(convolved, vec![Quantity::Radiance]);
        assert_eq!(spectrum.get_vars(VarScope::NonConvoluted).len(), 2);
        assert_eq!(spectrum.get_vars(VarScope::All).len(), 3);

        assert_eq!(spectrum.remove(Quantity::Radiance), Some(vec![2.0; 5]));
        assert_eq!(spectrum.unit(Quantity::Radiance), None);
    }

    #[test]
    fn set_rejects_arrays_of_the_wrong_length() {
        let mut spectrum = sample();
        let error = spectrum
            .set(Quantity::Absorbance, vec![1.0; 3], "")
            .expect_err("length mismatch");
        assert_eq!(error.placeholder(), "SPECTRUM.LENGTH_MISMATCH");
    }

    #[test]
    fn axis_must_be_positive() {
        let error = Spectrum::new(WaveUnit::Wavenumber, vec![1.0, 0.0]).expect_err("zero");
        assert_eq!(error.placeholder(), "SPECTRUM.INVALID_AXIS");
        let error = Spectrum::new(WaveUnit::Wavenumber, Vec::new()).expect_err("empty");
        assert_eq!(error.placeholder(), "SPECTRUM.EMPTY_AXIS");
    }

    #[test]
    fn wavenumber_is_derived_from_wavelength() {
        let spectrum = Spectrum::new(WaveUnit::Nanometer, vec![500.0, 1000.0]).unwrap();
        assert_eq!(spectrum.get_wavenumber(), vec![20_000.0, 10_000.0]);
    }

    #[test]
    fn apply_slit_convolves_raw_quantities_and_records_slit() {
        let mut spectrum = sample();
        let slit = SlitSettings::new(1.0, WaveUnit::Nanometer, SlitShape::Triangular, NormBy::Max);

        let added = spectrum.apply_slit(&slit).unwrap();
        assert_eq!(added.iter().collect::<Vec<_>>(), vec![Quantity::Radiance]);
        assert_eq!(spectrum.unit(Quantity::Radiance), Some("mW/cm2/sr"));
        assert_eq!(spectrum.conditions.slit_function, Some(1.0));
        assert_eq!(spectrum.conditions.norm_by, Some(NormBy::Max));
        // unit peak triangle of half-width 1 nm over a flat spectrum: area 1
        let radiance = spectrum.get(Quantity::Radiance).unwrap();
        assert!((radiance[2] - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn json_layout_merges_convolved_and_raw_quantities() {
        let mut spectrum = sample();
        spectrum.set(Quantity::Transmittance, vec![0.5; 5], "I/I0").unwrap();
        spectrum.conditions.path_length = Some(10.0);

        let json = serde_json::to_value(&spectrum).unwrap();
        assert_eq!(json["waveunit"], "nm");
        assert_eq!(json["quantities"]["transmittance"][0], 0.5);
        assert_eq!(json["units"]["abscoeff"], "cm-1");
        assert_eq!(json["conditions"]["path_length"], 10.0);

        let parsed: Spectrum = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, spectrum);
    }

    #[test]
    fn json_without_units_gets_default_units() {
        let parsed: Spectrum = serde_json::from_str(
            r#"{"waveunit": "cm-1", "wavespace": [2000.0, 2001.0], "quantities": {"emisscoeff": [1.0, 2.0]}}"#,
        )
        .unwrap();
        assert_eq!(parsed.unit(Quantity::Emisscoeff), Some("mW/cm3/sr/cm-1"));
    }
}
