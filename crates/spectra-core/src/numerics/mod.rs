pub mod planck;
pub mod slit;

pub use planck::{PlanckError, calc_radiance, planck};
pub use slit::{NormBy, SlitError, SlitSettings, SlitShape, convert_slit_width, convolve_slit};

/// Elementwise select: `on_true[i]` where `mask[i]`, else `on_false[i]`.
///
/// Both branches are evaluated over the whole array first; values computed
/// for masked-out elements (infinities, NaN from 0/0) are discarded.
pub fn select(mask: &[bool], on_true: &[f64], on_false: &[f64]) -> Vec<f64> {
    mask.iter()
        .zip(on_true.iter().zip(on_false))
        .map(|(keep, (when_true, when_false))| if *keep { *when_true } else { *when_false })
        .collect()
}

pub fn scaled(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|value| value * factor).collect()
}

pub fn has_exact_zero(values: &[f64]) -> bool {
    values.iter().any(|value| *value == 0.0)
}

/// `-ln(T)`; saturated elements (`T == 0`) become `+inf`.
pub fn absorbance_from_transmittance(transmittance: &[f64]) -> Vec<f64> {
    transmittance.iter().map(|value| -value.ln()).collect()
}

pub fn transmittance_from_absorbance(absorbance: &[f64]) -> Vec<f64> {
    absorbance.iter().map(|value| (-value).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        absorbance_from_transmittance, has_exact_zero, scaled, select,
        transmittance_from_absorbance,
    };

    #[test]
    fn select_discards_masked_out_singularities() {
        let numerator = [1.0, 2.0, 3.0];
        let denominator = [0.0, 4.0, 0.0];
        let ratio: Vec<f64> = numerator
            .iter()
            .zip(&denominator)
            .map(|(n, d)| n / d)
            .collect();
        let mask: Vec<bool> = denominator.iter().map(|d| *d == 0.0).collect();

        let combined = select(&mask, &[-1.0, -1.0, -1.0], &ratio);
        assert_eq!(combined, vec![-1.0, 0.5, -1.0]);
    }

    #[test]
    fn beer_lambert_helpers_are_inverse() {
        let transmittance = [1.0, 0.5, 0.25];
        let absorbance = absorbance_from_transmittance(&transmittance);
        assert_eq!(absorbance[0], 0.0);
        assert!((absorbance[1] - std::f64::consts::LN_2).abs() < 1.0e-15);
        let back = transmittance_from_absorbance(&absorbance);
        for (expected, actual) in transmittance.iter().zip(&back) {
            assert!((expected - actual).abs() < 1.0e-15);
        }
    }

    #[test]
    fn saturated_transmittance_maps_to_infinite_absorbance() {
        let absorbance = absorbance_from_transmittance(&[0.0]);
        assert!(absorbance[0].is_infinite() && absorbance[0] > 0.0);
        assert!(has_exact_zero(&[0.3, 0.0]));
        assert!(!has_exact_zero(&[0.3, 1.0e-300]));
        assert_eq!(scaled(&[1.0, -2.0], 0.5), vec![0.5, -1.0]);
    }
}
