//! At local thermodynamic equilibrium every raw quantity follows from the
//! absorption coefficient, the path length and the gas temperature.

use super::rescalers::{RescaleContext, Rescaled, blackbody, planck_failure};
use crate::domain::{Quantity, QuantitySet, SpectraError, SpectraResult, units};
use crate::numerics::{calc_radiance, scaled, select, transmittance_from_absorbance};
use tracing::debug;

pub(super) const PATH_DEPENDENT: QuantitySet = QuantitySet::from_slice(&[
    Quantity::Absorbance,
    Quantity::TransmittanceNoslit,
    Quantity::EmissivityNoslit,
    Quantity::RadianceNoslit,
]);

/// Fill every raw quantity from the rescaled absorption coefficient.
/// Quantities already in `rescaled` are kept.
pub fn rescale_at_equilibrium(
    ctx: &RescaleContext<'_>,
    rescaled: &mut Rescaled,
    wanted: QuantitySet,
) -> SpectraResult<()> {
    let Some(abscoeff) = rescaled.get(Quantity::Abscoeff).map(<[f64]>::to_vec) else {
        return Err(SpectraError::derivation(
            "RESCALE.EQUILIBRIUM_WITHOUT_ABSCOEFF",
            format!(
                "equilibrium recalculation requires abscoeff ({}); available: {}",
                ctx.flags(),
                ctx.initial
            ),
        ));
    };
    let Some(tgas) = ctx.spectrum.conditions.tgas else {
        return Err(SpectraError::configuration(
            "RESCALE.MISSING_TGAS",
            "equilibrium recalculation requires the Tgas condition",
        ));
    };
    let waveunit = ctx.spectrum.get_waveunit();

    if !ctx.path_length_known {
        // Kirchhoff: j = k B
        let source = blackbody(ctx.spectrum, tgas)?;
        let emisscoeff = abscoeff.iter().zip(&source).map(|(k, b)| k * b).collect();
        rescaled.insert_if_absent(
            Quantity::Emisscoeff,
            emisscoeff,
            units::default_emisscoeff(waveunit),
        );

        let missing = wanted
            .intersection(PATH_DEPENDENT)
            .difference(rescaled.quantities());
        if !missing.is_empty() {
            return Err(SpectraError::derivation(
                "RESCALE.EQUILIBRIUM_WITHOUT_PATH_LENGTH",
                format!(
                    "cannot compute {missing} at equilibrium without a known path_length ({})",
                    ctx.flags()
                ),
            ));
        }
        return Ok(());
    }

    let length = ctx.new_path_length;
    let absorbance = scaled(&abscoeff, length);
    let transmittance = transmittance_from_absorbance(&absorbance);
    let emissivity: Vec<f64> = absorbance.iter().map(|a| -(-a).exp_m1()).collect();
    let radiance = calc_radiance(
        &ctx.spectrum.get_wavenumber(),
        &emissivity,
        tgas,
        waveunit,
    )
    .map_err(planck_failure)?;

    let mask: Vec<bool> = abscoeff.iter().map(|k| *k == 0.0).collect();
    let thin: Vec<f64> = radiance.iter().map(|i| i / length).collect();
    let thick: Vec<f64> = radiance
        .iter()
        .zip(&emissivity)
        .zip(&abscoeff)
        .map(|((i, eps), k)| i / eps * k)
        .collect();
    let emisscoeff = select(&mask, &thin, &thick);

    let filled = [
        (Quantity::Absorbance, absorbance, units::ABSORBANCE),
        (Quantity::TransmittanceNoslit, transmittance, units::TRANSMITTANCE),
        (Quantity::EmissivityNoslit, emissivity, units::EMISSIVITY),
        (
            Quantity::RadianceNoslit,
            radiance,
            units::default_radiance(waveunit),
        ),
        (
            Quantity::Emisscoeff,
            emisscoeff,
            units::default_emisscoeff(waveunit),
        ),
    ];
    for (quantity, values, unit) in filled {
        if !rescaled.insert_if_absent(quantity, values, unit) {
            debug!("keeping already rescaled {quantity} at equilibrium");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::rescale_at_equilibrium;
    use crate::domain::{Quantity, QuantitySet, SpectraErrorCategory, WaveUnit};
    use crate::numerics::planck;
    use crate::rescale::rescalers::{RescaleContext, Rescaled};
    use crate::spectrum::{Conditions, Spectrum};

    fn assert_close(label: &str, expected: f64, actual: f64) {
        let scale = expected.abs().max(f64::MIN_POSITIVE);
        assert!(
            (actual - expected).abs() <= 1.0e-12 * scale,
            "{label} expected={expected:.15e} actual={actual:.15e}"
        );
    }

    fn hot_gas(path_length: Option<f64>) -> Spectrum {
        Spectrum::new(WaveUnit::Wavenumber, vec![2000.0, 2100.0, 2200.0])
            .unwrap()
            .with_quantity(Quantity::Abscoeff, vec![0.0, 0.1, 1.0], "cm-1")
            .unwrap()
            .with_conditions(Conditions {
                tgas: Some(1000.0),
                path_length,
                ..Conditions::default()
            })
    }

    #[test]
    fn kirchhoff_closes_all_raw_quantities() {
        let spectrum = hot_gas(Some(2.0));
        let ctx = RescaleContext::new(&spectrum);
        let mut rescaled = Rescaled::new();
        rescaled.insert(Quantity::Abscoeff, vec![0.0, 0.1, 1.0], "cm-1");

        rescale_at_equilibrium(&ctx, &mut rescaled, QuantitySet::empty()).unwrap();

        let absorbance = rescaled.get(Quantity::Absorbance).unwrap();
        let transmittance = rescaled.get(Quantity::TransmittanceNoslit).unwrap();
        let emissivity = rescaled.get(Quantity::EmissivityNoslit).unwrap();
        let radiance = rescaled.get(Quantity::RadianceNoslit).unwrap();
        let emisscoeff = rescaled.get(Quantity::Emisscoeff).unwrap();

        assert_eq!(absorbance, [0.0, 0.2, 2.0]);
        assert_eq!(radiance[0], 0.0);
        assert_eq!(emisscoeff[0], 0.0);
        for (index, (nu, k)) in [(2100.0, 0.1), (2200.0, 1.0)].into_iter().enumerate() {
            let index = index + 1;
            let source = planck(nu, 1000.0, WaveUnit::Wavenumber);
            assert_close("closure", 1.0, transmittance[index] + emissivity[index]);
            assert_close("radiance", emissivity[index] * source, radiance[index]);
            assert_close("emisscoeff", k * source, emisscoeff[index]);
        }
        assert_eq!(rescaled.unit(Quantity::RadianceNoslit), Some("mW/cm2/sr/cm-1"));
        assert_eq!(rescaled.unit(Quantity::EmissivityNoslit), Some("eps"));
    }

    #[test]
    fn seeded_quantities_are_kept() {
        let spectrum = hot_gas(Some(1.0));
        let ctx = RescaleContext::new(&spectrum);
        let mut rescaled = Rescaled::new();
        rescaled.insert(Quantity::Abscoeff, vec![0.0, 0.1, 1.0], "cm-1");
        rescaled.insert(Quantity::Absorbance, vec![7.0, 7.0, 7.0], "");

        rescale_at_equilibrium(&ctx, &mut rescaled, QuantitySet::empty()).unwrap();
        assert_eq!(rescaled.get(Quantity::Absorbance).unwrap(), [7.0, 7.0, 7.0]);
    }

    #[test]
    fn without_path_length_only_emisscoeff_is_available() {
        let spectrum = hot_gas(None);
        let ctx = RescaleContext::new(&spectrum);
        let mut rescaled = Rescaled::new();
        rescaled.insert(Quantity::Abscoeff, vec![0.0, 0.1, 1.0], "cm-1");

        let wanted = QuantitySet::from_slice(&[Quantity::Abscoeff, Quantity::Emisscoeff]);
        rescale_at_equilibrium(&ctx, &mut rescaled, wanted).unwrap();
        let emisscoeff = rescaled.get(Quantity::Emisscoeff).unwrap();
        assert_close(
            "emisscoeff",
            planck(2200.0, 1000.0, WaveUnit::Wavenumber),
            emisscoeff[2],
        );
        assert!(!rescaled.contains(Quantity::RadianceNoslit));

        let wanted = wanted.with(Quantity::RadianceNoslit);
        let error = rescale_at_equilibrium(&ctx, &mut rescaled, wanted).expect_err("no path");
        assert_eq!(error.category(), SpectraErrorCategory::Derivation);
    }

    #[test]
    fn abscoeff_must_be_rescaled_first() {
        let spectrum = hot_gas(Some(1.0));
        let ctx = RescaleContext::new(&spectrum);
        let error = rescale_at_equilibrium(&ctx, &mut Rescaled::new(), QuantitySet::empty())
            .expect_err("no abscoeff");
        assert_eq!(error.placeholder(), "RESCALE.EQUILIBRIUM_WITHOUT_ABSCOEFF");
    }
}
