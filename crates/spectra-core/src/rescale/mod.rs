//! Recomputation engine: decides which quantities can be derived from the
//! ones a spectrum holds, computes them, and rescales a spectrum to a new
//! path length or mole fraction.

pub mod equilibrium;
pub mod graph;
pub mod operations;
pub mod orchestrator;
pub mod planner;
pub mod reachability;
pub mod rescalers;

pub use graph::{DerivationGraph, GraphFlags, GraphOptions, build_update_graph};
pub use operations::{rescale_mole_fraction, rescale_path_length, update};
pub use orchestrator::{QuantityRequest, Recalculation, RecalculationReport, recalculate};
pub use planner::{get_recompute, plan_recompute};
pub use reachability::{get_reachable, reachable_from};
pub use rescalers::{Derivation, RescaleContext, Rescaled};
