//! Instrument slit convolution on a (possibly non-uniform) spectral axis.

use crate::domain::WaveUnit;
use serde::{Deserialize, Serialize};

const NM_PER_CM: f64 = 1.0e7;
/// Gaussian kernels are truncated beyond this many FWHM from the centre.
const GAUSSIAN_TRUNCATION_FWHM: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlitShape {
    #[default]
    Triangular,
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormBy {
    /// Kernel integrates to one; the quantity keeps its unit.
    Area,
    /// Kernel peak is one; the quantity gets integrated over the slit unit.
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlitSettings {
    /// Full width at half maximum, in `unit`.
    pub fwhm: f64,
    pub unit: WaveUnit,
    pub shape: SlitShape,
    pub norm_by: NormBy,
}

impl SlitSettings {
    pub fn new(fwhm: f64, unit: WaveUnit, shape: SlitShape, norm_by: NormBy) -> Self {
        Self {
            fwhm,
            unit,
            shape,
            norm_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlitError {
    #[error("slit convolution requires at least 2 spectral points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("slit convolution length mismatch: axis={axis}, values={values}")]
    LengthMismatch { axis: usize, values: usize },
    #[error("slit FWHM must be finite and > 0, got {value}")]
    InvalidWidth { value: f64 },
    #[error("spectral axis must be finite and strictly monotonic, index {index} has {current} after {previous}")]
    NonMonotonicAxis {
        index: usize,
        previous: f64,
        current: f64,
    },
}

impl SlitShape {
    fn weight(self, offset: f64, fwhm: f64) -> f64 {
        match self {
            Self::Triangular => (1.0 - offset.abs() / fwhm).max(0.0),
            Self::Gaussian => (-4.0 * std::f64::consts::LN_2 * (offset / fwhm).powi(2)).exp(),
        }
    }

    fn half_support(self, fwhm: f64) -> f64 {
        match self {
            Self::Triangular => fwhm,
            Self::Gaussian => GAUSSIAN_TRUNCATION_FWHM * fwhm,
        }
    }
}

/// Express the slit FWHM in the axis unit. When the units differ the width
/// is converted at the centre of the axis.
pub fn convert_slit_width(slit: &SlitSettings, axis: &[f64], waveunit: WaveUnit) -> f64 {
    if slit.unit == waveunit || axis.is_empty() {
        return slit.fwhm;
    }
    let centre = 0.5 * (axis[0] + axis[axis.len() - 1]);
    // |d(nu)| = |d(lambda)| * nu^2 / 1e7 and |d(lambda)| = |d(nu)| * lambda^2 / 1e7
    slit.fwhm * centre.powi(2) / NM_PER_CM
}

/// Convolve `values` sampled on `axis` with the slit. Integration weights
/// follow the trapezoidal rule, so non-uniform axes are handled; with
/// `NormBy::Area` the kernel is renormalized on the points it covers, which
/// keeps a flat spectrum flat up to the edges.
pub fn convolve_slit(
    axis: &[f64],
    values: &[f64],
    waveunit: WaveUnit,
    slit: &SlitSettings,
) -> Result<Vec<f64>, SlitError> {
    validate_axis(axis, values)?;
    if !slit.fwhm.is_finite() || slit.fwhm <= 0.0 {
        return Err(SlitError::InvalidWidth { value: slit.fwhm });
    }

    let fwhm = convert_slit_width(slit, axis, waveunit);
    let half_support = slit.shape.half_support(fwhm);
    let steps = trapezoid_steps(axis);

    let mut output = Vec::with_capacity(axis.len());
    for (target, centre) in axis.iter().copied().enumerate() {
        let mut lower = target;
        while lower > 0 && (axis[lower - 1] - centre).abs() <= half_support {
            lower -= 1;
        }
        let mut upper = target;
        while upper + 1 < axis.len() && (axis[upper + 1] - centre).abs() <= half_support {
            upper += 1;
        }

        let mut convolved = 0.0;
        let mut kernel_area = 0.0;
        for index in lower..=upper {
            let weight = slit.shape.weight(axis[index] - centre, fwhm) * steps[index];
            convolved += weight * values[index];
            kernel_area += weight;
        }

        output.push(match slit.norm_by {
            NormBy::Area => convolved / kernel_area,
            NormBy::Max => convolved,
        });
    }

    Ok(output)
}

fn validate_axis(axis: &[f64], values: &[f64]) -> Result<(), SlitError> {
    if axis.len() < 2 {
        return Err(SlitError::InsufficientPoints { actual: axis.len() });
    }
    if axis.len() != values.len() {
        return Err(SlitError::LengthMismatch {
            axis: axis.len(),
            values: values.len(),
        });
    }

    let increasing = axis[1] > axis[0];
    for index in 1..axis.len() {
        let previous = axis[index - 1];
        let current = axis[index];
        let ordered = if increasing {
            current > previous
        } else {
            current < previous
        };
        if !current.is_finite() || !previous.is_finite() || !ordered {
            return Err(SlitError::NonMonotonicAxis {
                index,
                previous,
                current,
            });
        }
    }
    Ok(())
}

fn trapezoid_steps(axis: &[f64]) -> Vec<f64> {
    let last = axis.len() - 1;
    (0..axis.len())
        .map(|index| {
            let left = if index == 0 { axis[0] } else { axis[index - 1] };
            let right = if index == last { axis[last] } else { axis[index + 1] };
            0.5 * (right - left).abs()
        })
        .collect()
}
