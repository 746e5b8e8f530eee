use super::equilibrium::{PATH_DEPENDENT, rescale_at_equilibrium};
use super::graph::{GraphOptions, build_update_graph};
use super::planner::plan_recompute;
use super::reachability::reachable_from;
use super::rescalers::{Derivation, RescaleContext, Rescaled, rescale};
use crate::domain::{
    CONVOLUTED_QUANTITIES, NON_RESCALABLE_KEYS, ORDERED_KEYS, Quantity, QuantitySet,
    SpectraError, SpectraResult,
};
use crate::spectrum::{ConvolvedQuantity, Spectrum, VarScope};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::debug;

/// Order in which rescalers run after `abscoeff` when the medium is not at
/// equilibrium.
const GENERAL_ORDER: [Quantity; 8] = [
    Quantity::Emisscoeff,
    Quantity::Absorbance,
    Quantity::TransmittanceNoslit,
    Quantity::RadianceNoslit,
    Quantity::EmissivityNoslit,
    Quantity::Radiance,
    Quantity::Transmittance,
    Quantity::Emissivity,
];

/// Which quantities a recalculation has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityRequest {
    /// Everything held plus everything reachable from it.
    #[default]
    All,
    /// Exactly what the spectrum holds.
    Same,
    Only(Quantity),
}

impl Display for QuantityRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Same => f.write_str("same"),
            Self::Only(quantity) => Display::fmt(quantity, f),
        }
    }
}

impl FromStr for QuantityRequest {
    type Err = SpectraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => Ok(Self::All),
            "same" => Ok(Self::Same),
            name => name.parse().map(Self::Only),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recalculation {
    pub quantity: QuantityRequest,
    pub old_mole_fraction: f64,
    pub new_mole_fraction: f64,
    pub old_path_length: f64,
    pub new_path_length: f64,
    pub path_length_known: bool,
    /// Defaults to the spectrum's own `self_absorption` condition.
    pub optically_thin: Option<bool>,
}

impl Recalculation {
    pub fn no_change(&self) -> bool {
        self.new_mole_fraction == self.old_mole_fraction
            && self.new_path_length == self.old_path_length
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalculationReport {
    pub wanted: QuantitySet,
    pub recompute: QuantitySet,
    /// Quantities the spectrum did not hold before the run.
    pub added: QuantitySet,
    pub slit_reapplied: QuantitySet,
}

pub fn recalculate(
    spectrum: &mut Spectrum,
    request: &Recalculation,
) -> SpectraResult<RecalculationReport> {
    let optically_thin = request
        .optically_thin
        .unwrap_or_else(|| spectrum.is_optically_thin());
    let initial = spectrum.get_vars(VarScope::All);

    let non_rescalable = initial.intersection(QuantitySet::from_slice(&NON_RESCALABLE_KEYS));
    if !non_rescalable.is_empty() {
        return Err(SpectraError::configuration(
            "RESCALE.NON_RESCALABLE_QUANTITY",
            format!("spectrum holds {non_rescalable}, which cannot be rescaled"),
        ));
    }

    let no_change = request.no_change();
    let graph = build_update_graph(
        spectrum,
        GraphOptions {
            optically_thin: Some(optically_thin),
            path_length_known: Some(request.path_length_known),
            no_change,
            ..GraphOptions::default()
        },
    );
    let equilibrium = graph.flags().equilibrium;
    let reachable = reachable_from(&graph, initial);
    let wanted = match request.quantity {
        QuantityRequest::All => {
            let mut wanted =
                initial.union(reachable.intersection(QuantitySet::from_slice(&ORDERED_KEYS)));
            if equilibrium && !request.path_length_known {
                wanted = wanted.difference(needs_path_length(initial));
            }
            wanted
        }
        QuantityRequest::Same => initial,
        QuantityRequest::Only(quantity) => QuantitySet::empty().with(quantity),
    };

    let recompute = plan_recompute(&graph, initial, wanted);
    let unreachable = wanted.difference(reachable);
    if !unreachable.is_empty() {
        return Err(SpectraError::derivation(
            "RESCALE.UNREACHABLE_QUANTITY",
            format!(
                "cannot compute {unreachable} ({}); available: {initial}",
                graph.flags()
            ),
        ));
    }
    debug!("wanted {wanted}, recomputing {recompute}");

    let mut ctx = RescaleContext {
        spectrum: &*spectrum,
        initial,
        old_mole_fraction: request.old_mole_fraction,
        new_mole_fraction: request.new_mole_fraction,
        old_path_length: request.old_path_length,
        new_path_length: request.new_path_length,
        optically_thin,
        path_length_known: request.path_length_known,
        equilibrium,
        extra: recompute.difference(wanted),
    };

    let mut rescaled = Rescaled::new();
    if no_change {
        for quantity in initial.iter() {
            // A requested convolved quantity is rebuilt from its held raw sibling.
            let reconvolved = request.quantity == QuantityRequest::Only(quantity)
                && quantity.noslit_sibling().is_some_and(|raw| initial.contains(raw));
            if reconvolved {
                continue;
            }
            if let Some(values) = spectrum.get(quantity) {
                let unit = spectrum
                    .unit(quantity)
                    .unwrap_or(quantity.default_unit(spectrum.get_waveunit()));
                rescaled.insert(quantity, values.to_vec(), unit);
            }
        }
    }

    if equilibrium && !recompute.contains(Quantity::Abscoeff) {
        ctx.extra.insert(Quantity::Abscoeff);
    }
    if equilibrium || recompute.contains(Quantity::Abscoeff) {
        rescale(Quantity::Abscoeff, &ctx, &mut rescaled)?;
    }

    let mut needs_slit = QuantitySet::empty();
    if equilibrium {
        rescale_at_equilibrium(&ctx, &mut rescaled, wanted)?;
        for quantity in CONVOLUTED_QUANTITIES {
            if recompute.contains(quantity)
                && rescale(quantity, &ctx, &mut rescaled)? == Derivation::SlitRequired
            {
                needs_slit.insert(quantity);
            }
        }
    } else {
        for quantity in GENERAL_ORDER {
            if recompute.contains(quantity)
                && rescale(quantity, &ctx, &mut rescaled)? == Derivation::SlitRequired
            {
                needs_slit.insert(quantity);
            }
        }
    }

    let keep = wanted.union(initial);
    let convolved = if needs_slit.is_empty() {
        Vec::new()
    } else {
        reconvolve(spectrum, &rescaled, keep)?
    };

    let rescaled_set = rescaled.quantities();
    commit(spectrum, rescaled, keep, &convolved)?;

    let slit_added: QuantitySet = convolved.iter().map(|item| item.quantity).collect();
    let produced = rescaled_set.union(slit_added);
    let held = spectrum.get_vars(VarScope::All);
    if !wanted.is_subset(produced) || !wanted.is_subset(held) || !initial.is_subset(produced) {
        return Err(SpectraError::consistency(
            "RESCALE.CONSISTENCY",
            format!(
                "recalculation lost track of quantities: wanted={wanted}, rescaled={rescaled_set}, \
                 slit={slit_added}, spectrum={held}, initial={initial}"
            ),
        ));
    }

    Ok(RecalculationReport {
        wanted,
        recompute,
        added: held.difference(initial),
        slit_reapplied: slit_added,
    })
}

/// Quantities the equilibrium fast path cannot produce without a path
/// length, unless the spectrum already holds them.
fn needs_path_length(initial: QuantitySet) -> QuantitySet {
    let raw = PATH_DEPENDENT.difference(initial);
    let convolved = CONVOLUTED_QUANTITIES.into_iter().filter(|quantity| {
        quantity
            .noslit_sibling()
            .is_some_and(|sibling| raw.contains(sibling))
    });
    raw.union(convolved.collect()).difference(initial)
}

/// Convolve the raw siblings that will be kept, taking rescaled values over
/// stored ones. Nothing is written to the spectrum here.
fn reconvolve(
    spectrum: &Spectrum,
    rescaled: &Rescaled,
    keep: QuantitySet,
) -> SpectraResult<Vec<ConvolvedQuantity>> {
    let Some(slit) = spectrum.conditions.slit_settings() else {
        return Err(SpectraError::configuration(
            "RESCALE.SLIT_CONDITIONS_MISSING",
            format!(
                "slit must be applied again but conditions lack {}",
                spectrum.conditions.missing_slit_keys().join(", ")
            ),
        ));
    };

    let waveunit = spectrum.get_waveunit();
    let sources = CONVOLUTED_QUANTITIES
        .iter()
        .filter_map(|quantity| quantity.noslit_sibling())
        .filter(|raw| keep.contains(*raw))
        .filter_map(|raw| {
            let values = rescaled.get(raw).or_else(|| spectrum.get(raw))?;
            let unit = rescaled
                .unit(raw)
                .or_else(|| spectrum.unit(raw))
                .unwrap_or(raw.default_unit(waveunit));
            Some((raw, values, unit))
        });
    spectrum.convolve_noslit(sources, &slit)
}

/// Stale convolved quantities are dropped only once their replacements are
/// computed.
fn commit(
    spectrum: &mut Spectrum,
    rescaled: Rescaled,
    keep: QuantitySet,
    convolved: &[ConvolvedQuantity],
) -> SpectraResult<()> {
    if !convolved.is_empty() {
        for quantity in CONVOLUTED_QUANTITIES {
            spectrum.remove(quantity);
        }
    }
    for (quantity, values, unit) in rescaled.into_entries() {
        if keep.contains(quantity) {
            spectrum.set(quantity, values, unit)?;
        }
    }
    for item in convolved {
        spectrum.set(item.quantity, item.values.clone(), item.unit.clone())?;
    }
    Ok(())
}
