//! Derivation graph: for every quantity, the alternative sets of quantities
//! it can be computed from under the current conditions.

use crate::domain::{NON_CONVOLUTED_QUANTITIES, ORDERED_KEYS, Quantity, QuantitySet};
use crate::spectrum::Spectrum;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphFlags {
    pub optically_thin: bool,
    pub equilibrium: bool,
    pub path_length_known: bool,
    pub slit_available: bool,
    /// Neither path length nor mole fraction changes: every held quantity
    /// stays valid as is.
    pub no_change: bool,
}

impl GraphFlags {
    pub fn from_spectrum(spectrum: &Spectrum) -> Self {
        Self {
            optically_thin: spectrum.is_optically_thin(),
            equilibrium: spectrum.is_at_equilibrium(),
            path_length_known: spectrum.conditions.path_length.is_some(),
            slit_available: spectrum.conditions.slit_available(),
            no_change: false,
        }
    }
}

impl Display for GraphFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "optically_thin={}, equilibrium={}, path_length_known={}",
            self.optically_thin, self.equilibrium, self.path_length_known
        )
    }
}

/// Overrides for the flags otherwise read from the spectrum. The slit is
/// always taken from the spectrum conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphOptions {
    pub optically_thin: Option<bool>,
    pub equilibrium: Option<bool>,
    pub path_length_known: Option<bool>,
    pub no_change: bool,
}

impl GraphOptions {
    pub fn resolve(self, spectrum: &Spectrum) -> GraphFlags {
        let inferred = GraphFlags::from_spectrum(spectrum);
        GraphFlags {
            optically_thin: self.optically_thin.unwrap_or(inferred.optically_thin),
            equilibrium: self.equilibrium.unwrap_or(inferred.equilibrium),
            path_length_known: self.path_length_known.unwrap_or(inferred.path_length_known),
            slit_available: inferred.slit_available,
            no_change: self.no_change,
        }
    }
}

/// Built fresh for every operation; conditions may change between calls on
/// the same spectrum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationGraph {
    flags: GraphFlags,
    recipes: BTreeMap<Quantity, Vec<QuantitySet>>,
}

pub fn build_update_graph(spectrum: &Spectrum, options: GraphOptions) -> DerivationGraph {
    DerivationGraph::build(options.resolve(spectrum))
}

impl DerivationGraph {
    pub fn build(flags: GraphFlags) -> Self {
        use Quantity::*;

        let mut graph = Self {
            flags,
            recipes: BTreeMap::new(),
        };

        // Beer-Lambert, independent of any condition
        graph.add(TransmittanceNoslit, &[Absorbance]);
        graph.add(Absorbance, &[TransmittanceNoslit]);
        graph.add(EmissivityNoslit, &[TransmittanceNoslit]);

        if flags.no_change {
            for quantity in ORDERED_KEYS {
                graph.add(quantity, &[quantity]);
            }
        }

        if flags.path_length_known {
            graph.add(Abscoeff, &[Absorbance]);
            graph.add(Absorbance, &[Abscoeff]);
            if flags.optically_thin {
                graph.add(RadianceNoslit, &[Emisscoeff]);
                graph.add(Emisscoeff, &[RadianceNoslit]);
            } else {
                graph.add(RadianceNoslit, &[Emisscoeff, Abscoeff]);
                graph.add(Emisscoeff, &[RadianceNoslit, Abscoeff]);
            }
        }

        if flags.slit_available {
            graph.add(Radiance, &[RadianceNoslit]);
            graph.add(Transmittance, &[TransmittanceNoslit]);
            graph.add(Emissivity, &[EmissivityNoslit]);
        }

        if flags.equilibrium {
            let interconvertible = NON_CONVOLUTED_QUANTITIES
                .into_iter()
                .filter(|quantity| quantity.is_rescalable());
            for target in interconvertible.clone() {
                for source in interconvertible.clone().filter(|source| *source != target) {
                    graph.add(target, &[source]);
                }
            }
        }

        graph
    }

    pub fn flags(&self) -> GraphFlags {
        self.flags
    }

    /// Alternative recipes for `quantity`, in the order they were added.
    pub fn recipes(&self, quantity: Quantity) -> &[QuantitySet] {
        self.recipes
            .get(&quantity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_satisfied(&self, quantity: Quantity, available: QuantitySet) -> bool {
        self.recipes(quantity)
            .iter()
            .any(|recipe| recipe.is_subset(available))
    }

    fn add(&mut self, quantity: Quantity, sources: &[Quantity]) {
        let recipe = QuantitySet::from_slice(sources);
        let recipes = self.recipes.entry(quantity).or_default();
        if !recipes.contains(&recipe) {
            recipes.push(recipe);
        }
    }
}
