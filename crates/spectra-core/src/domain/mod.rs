pub mod errors;
pub mod quantity;
pub mod units;

pub use errors::{ExitDescriptor, SpectraError, SpectraErrorCategory, SpectraResult};
pub use quantity::{
    CONVOLUTED_QUANTITIES, NON_CONVOLUTED_QUANTITIES, NON_RESCALABLE_KEYS, ORDERED_KEYS, Quantity,
    QuantitySet,
};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Unit of a spectrum's spectral axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveUnit {
    #[serde(rename = "nm")]
    Nanometer,
    #[serde(rename = "cm-1")]
    Wavenumber,
}

impl WaveUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nanometer => "nm",
            Self::Wavenumber => "cm-1",
        }
    }
}

impl Display for WaveUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for WaveUnit {
    type Err = SpectraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "nm" => Ok(Self::Nanometer),
            "cm-1" | "cm_1" => Ok(Self::Wavenumber),
            other => Err(SpectraError::configuration(
                "INPUT.UNKNOWN_WAVEUNIT",
                format!("unknown wave unit '{other}', expected 'nm' or 'cm-1'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WaveUnit;

    #[test]
    fn wave_unit_parses_both_spellings() {
        assert_eq!("nm".parse::<WaveUnit>().unwrap(), WaveUnit::Nanometer);
        assert_eq!("cm-1".parse::<WaveUnit>().unwrap(), WaveUnit::Wavenumber);
        assert_eq!(" cm_1 ".parse::<WaveUnit>().unwrap(), WaveUnit::Wavenumber);

        let error = "angstrom".parse::<WaveUnit>().expect_err("unknown unit");
        assert_eq!(error.placeholder(), "INPUT.UNKNOWN_WAVEUNIT");
    }

    #[test]
    fn wave_unit_serializes_with_physical_names() {
        let json = serde_json::to_string(&WaveUnit::Wavenumber).unwrap();
        assert_eq!(json, "\"cm-1\"");
        let parsed: WaveUnit = serde_json::from_str("\"nm\"").unwrap();
        assert_eq!(parsed, WaveUnit::Nanometer);
    }
}
