use super::graph::{DerivationGraph, GraphOptions, build_update_graph};
use crate::domain::{ORDERED_KEYS, QuantitySet};
use crate::spectrum::{Spectrum, VarScope};
use tracing::debug;

/// Quantities to compute so that every wanted quantity has a satisfied
/// recipe.
///
/// Targets are the wanted quantities plus anything pulled in along the way.
/// A target with no satisfied recipe pulls in the members of the recipe with
/// the fewest unmarked prerequisites; on a tie the earliest recipe wins. The
/// plan may still leave wanted quantities unreachable: callers check that.
pub fn plan_recompute(
    graph: &DerivationGraph,
    held: QuantitySet,
    wanted: QuantitySet,
) -> QuantitySet {
    let mut marked = held.union(wanted);

    'scan: loop {
        for quantity in ORDERED_KEYS {
            let pulled = marked.contains(quantity) && !held.contains(quantity);
            if !(wanted.contains(quantity) || pulled) {
                continue;
            }

            let recipes = graph.recipes(quantity);
            if recipes.is_empty() || graph.is_satisfied(quantity, marked) {
                continue;
            }
            let Some(cheapest) = recipes
                .iter()
                .copied()
                .min_by_key(|recipe| recipe.difference(marked).len())
            else {
                continue;
            };

            debug!(
                "pulling {} into the recompute set to obtain {quantity}",
                cheapest.difference(marked)
            );
            marked = marked.union(cheapest);
            continue 'scan;
        }
        return marked;
    }
}

pub fn get_recompute(
    spectrum: &Spectrum,
    wanted: QuantitySet,
    no_change: bool,
    path_length_known: Option<bool>,
) -> QuantitySet {
    let graph = build_update_graph(
        spectrum,
        GraphOptions {
            path_length_known,
            no_change,
            ..GraphOptions::default()
        },
    );
    plan_recompute(&graph, spectrum.get_vars(VarScope::All), wanted)
}
