use super::graph::{DerivationGraph, GraphOptions, build_update_graph};
use crate::domain::{ORDERED_KEYS, Quantity, QuantitySet};
use crate::spectrum::{Spectrum, VarScope};
use std::collections::BTreeMap;

/// Every quantity transitively computable from `start`.
pub fn reachable_from(graph: &DerivationGraph, start: QuantitySet) -> QuantitySet {
    let mut reachable = start;
    loop {
        let mut changed = false;
        for quantity in ORDERED_KEYS.into_iter().rev() {
            if !reachable.contains(quantity) && graph.is_satisfied(quantity, reachable) {
                reachable.insert(quantity);
                changed = true;
            }
        }
        if !changed {
            return reachable;
        }
    }
}

/// Which catalog quantities can be obtained from what the spectrum holds,
/// under its own conditions.
pub fn get_reachable(spectrum: &Spectrum) -> BTreeMap<Quantity, bool> {
    let graph = build_update_graph(spectrum, GraphOptions::default());
    let reachable = reachable_from(&graph, spectrum.get_vars(VarScope::All));
    Quantity::ALL
        .into_iter()
        .map(|quantity| (quantity, reachable.contains(quantity)))
        .collect()
}
