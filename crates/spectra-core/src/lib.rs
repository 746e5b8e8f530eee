pub mod domain;
pub mod numerics;
pub mod rescale;
pub mod spectrum;

pub use domain::{
    Quantity, QuantitySet, SpectraError, SpectraErrorCategory, SpectraResult, WaveUnit,
};
pub use rescale::{
    QuantityRequest, RecalculationReport, get_reachable, rescale_mole_fraction,
    rescale_path_length, update,
};
pub use spectrum::{Conditions, Spectrum, VarScope};
