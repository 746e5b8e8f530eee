//! Closed catalog of spectral quantities and their computation priority.
//!
//! The enum declaration order is the priority order used when quantities are
//! recomputed, followed by the quantities that cannot be rescaled at all.

use super::units;
use super::{SpectraError, WaveUnit};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Abscoeff,
    Emisscoeff,
    Absorbance,
    RadianceNoslit,
    TransmittanceNoslit,
    Emissivity,
    EmissivityNoslit,
    Radiance,
    Transmittance,
    AbscoeffContinuum,
}

/// Quantities obtained by convolving a `_noslit` sibling with the instrument slit.
pub const CONVOLUTED_QUANTITIES: [Quantity; 3] = [
    Quantity::Radiance,
    Quantity::Transmittance,
    Quantity::Emissivity,
];

pub const NON_CONVOLUTED_QUANTITIES: [Quantity; 7] = [
    Quantity::Abscoeff,
    Quantity::Absorbance,
    Quantity::Emisscoeff,
    Quantity::EmissivityNoslit,
    Quantity::RadianceNoslit,
    Quantity::TransmittanceNoslit,
    Quantity::AbscoeffContinuum,
];

/// Priority order in which rescalable quantities are computed.
pub const ORDERED_KEYS: [Quantity; 9] = [
    Quantity::Abscoeff,
    Quantity::Emisscoeff,
    Quantity::Absorbance,
    Quantity::RadianceNoslit,
    Quantity::TransmittanceNoslit,
    Quantity::Emissivity,
    Quantity::EmissivityNoslit,
    Quantity::Radiance,
    Quantity::Transmittance,
];

pub const NON_RESCALABLE_KEYS: [Quantity; 1] = [Quantity::AbscoeffContinuum];

const _: () = assert!(
    catalog_is_consistent(),
    "ORDERED_KEYS and NON_RESCALABLE_KEYS must partition the convoluted and non-convoluted quantities"
);

const fn catalog_is_consistent() -> bool {
    let known = QuantitySet::from_slice(&CONVOLUTED_QUANTITIES)
        .union(QuantitySet::from_slice(&NON_CONVOLUTED_QUANTITIES));
    let ordered = QuantitySet::from_slice(&ORDERED_KEYS);
    let non_rescalable = QuantitySet::from_slice(&NON_RESCALABLE_KEYS);

    ordered.len() == ORDERED_KEYS.len()
        && non_rescalable.len() == NON_RESCALABLE_KEYS.len()
        && ordered.intersection(non_rescalable).is_empty()
        && ordered.union(non_rescalable).bits() == known.bits()
        && known.len() == Quantity::ALL.len()
}

impl Quantity {
    pub const ALL: [Quantity; 10] = [
        Self::Abscoeff,
        Self::Emisscoeff,
        Self::Absorbance,
        Self::RadianceNoslit,
        Self::TransmittanceNoslit,
        Self::Emissivity,
        Self::EmissivityNoslit,
        Self::Radiance,
        Self::Transmittance,
        Self::AbscoeffContinuum,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abscoeff => "abscoeff",
            Self::Emisscoeff => "emisscoeff",
            Self::Absorbance => "absorbance",
            Self::RadianceNoslit => "radiance_noslit",
            Self::TransmittanceNoslit => "transmittance_noslit",
            Self::Emissivity => "emissivity",
            Self::EmissivityNoslit => "emissivity_noslit",
            Self::Radiance => "radiance",
            Self::Transmittance => "transmittance",
            Self::AbscoeffContinuum => "abscoeff_continuum",
        }
    }

    const fn index(self) -> u32 {
        self as u32
    }

    pub const fn is_convolved(self) -> bool {
        matches!(self, Self::Radiance | Self::Transmittance | Self::Emissivity)
    }

    pub const fn is_rescalable(self) -> bool {
        !matches!(self, Self::AbscoeffContinuum)
    }

    /// Raw quantity a convolved quantity is obtained from.
    pub const fn noslit_sibling(self) -> Option<Quantity> {
        match self {
            Self::Radiance => Some(Self::RadianceNoslit),
            Self::Transmittance => Some(Self::TransmittanceNoslit),
            Self::Emissivity => Some(Self::EmissivityNoslit),
            _ => None,
        }
    }

    pub const fn convolved_sibling(self) -> Option<Quantity> {
        match self {
            Self::RadianceNoslit => Some(Self::Radiance),
            Self::TransmittanceNoslit => Some(Self::Transmittance),
            Self::EmissivityNoslit => Some(Self::Emissivity),
            _ => None,
        }
    }

    pub const fn default_unit(self, waveunit: WaveUnit) -> &'static str {
        match self {
            Self::Abscoeff | Self::AbscoeffContinuum => units::ABSCOEFF,
            Self::Absorbance => units::ABSORBANCE,
            Self::Transmittance | Self::TransmittanceNoslit => units::TRANSMITTANCE,
            Self::Emissivity | Self::EmissivityNoslit => units::EMISSIVITY,
            Self::Radiance | Self::RadianceNoslit => units::default_radiance(waveunit),
            Self::Emisscoeff => units::default_emisscoeff(waveunit),
        }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for Quantity {
    type Err = SpectraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|quantity| quantity.as_str() == normalized)
            .ok_or_else(|| {
                SpectraError::configuration(
                    "INPUT.UNKNOWN_QUANTITY",
                    format!("unknown spectral quantity '{normalized}'"),
                )
            })
    }
}

/// Set of quantities, iterated in catalog priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuantitySet(u16);

impl QuantitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_slice(quantities: &[Quantity]) -> Self {
        let mut set = Self::empty();
        let mut index = 0;
        while index < quantities.len() {
            set = set.with(quantities[index]);
            index += 1;
        }
        set
    }

    pub const fn with(self, quantity: Quantity) -> Self {
        Self(self.0 | (1 << quantity.index()))
    }

    const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` when the quantity was not yet in the set.
    pub fn insert(&mut self, quantity: Quantity) -> bool {
        let inserted = !self.contains(quantity);
        *self = self.with(quantity);
        inserted
    }

    pub fn remove(&mut self, quantity: Quantity) -> bool {
        let present = self.contains(quantity);
        self.0 &= !(1 << quantity.index());
        present
    }

    pub const fn contains(self, quantity: Quantity) -> bool {
        self.0 & (1 << quantity.index()) != 0
    }

    pub const fn is_subset(self, other: QuantitySet) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn union(self, other: QuantitySet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: QuantitySet) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn difference(self, other: QuantitySet) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Quantity> {
        Quantity::ALL
            .into_iter()
            .filter(move |quantity| self.contains(*quantity))
    }
}

impl FromIterator<Quantity> for QuantitySet {
    fn from_iter<I: IntoIterator<Item = Quantity>>(iter: I) -> Self {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl Extend<Quantity> for QuantitySet {
    fn extend<I: IntoIterator<Item = Quantity>>(&mut self, iter: I) {
        for quantity in iter {
            self.insert(quantity);
        }
    }
}

impl Display for QuantitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (position, quantity) in self.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            f.write_str(quantity.as_str())?;
        }
        f.write_str("}")
    }
}
