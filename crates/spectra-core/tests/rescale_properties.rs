use spectra_core::domain::{NON_CONVOLUTED_QUANTITIES, ORDERED_KEYS};
use spectra_core::numerics::NormBy;
use spectra_core::rescale::{
    QuantityRequest, RescaleContext, Rescaled, get_reachable, rescale_path_length, rescalers,
    update,
};
use spectra_core::spectrum::{Conditions, Spectrum, VarScope};
use spectra_core::{Quantity, QuantitySet, SpectraErrorCategory, WaveUnit};

const AXIS: [f64; 4] = [2000.0, 2000.5, 2001.0, 2001.5];

fn assert_close(label: &str, expected: f64, actual: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= 1.0e-12 * scale,
        "{label} expected={expected:.15e} actual={actual:.15e}"
    );
}

fn sample_values(quantity: Quantity) -> Vec<f64> {
    match quantity {
        Quantity::Abscoeff => vec![0.0, 0.05, 0.4, 1.5],
        Quantity::Absorbance => vec![0.0, 0.1, 0.8, 3.0],
        Quantity::TransmittanceNoslit => vec![1.0, 0.9, 0.45, 0.05],
        Quantity::EmissivityNoslit => vec![0.0, 0.1, 0.55, 0.95],
        Quantity::Transmittance => vec![0.98, 0.85, 0.5, 0.1],
        Quantity::Emissivity => vec![0.02, 0.15, 0.5, 0.9],
        _ => vec![1.0e-3, 2.0e-3, 4.0e-3, 8.0e-3],
    }
}

fn spectrum_holding(held: QuantitySet, conditions: &Conditions) -> Spectrum {
    let mut spectrum = Spectrum::new(WaveUnit::Wavenumber, AXIS.to_vec())
        .unwrap()
        .with_conditions(conditions.clone());
    for quantity in held.iter() {
        let unit = quantity.default_unit(WaveUnit::Wavenumber);
        spectrum.set(quantity, sample_values(quantity), unit).unwrap();
    }
    spectrum
}

fn reachable_set(spectrum: &Spectrum) -> QuantitySet {
    get_reachable(spectrum)
        .into_iter()
        .filter_map(|(quantity, reachable)| reachable.then_some(quantity))
        .collect()
}

fn condition_variants() -> Vec<Conditions> {
    let mut variants = Vec::new();
    for path_length in [None, Some(2.0)] {
        for self_absorption in [Some(true), Some(false)] {
            for slit in [false, true] {
                variants.push(Conditions {
                    path_length,
                    self_absorption,
                    slit_function: slit.then_some(0.5),
                    slit_unit: slit.then_some(WaveUnit::Wavenumber),
                    norm_by: slit.then_some(NormBy::Area),
                    ..Conditions::default()
                });
            }
        }
    }
    variants
}

#[test]
fn update_all_is_idempotent() {
    let conditions = Conditions {
        path_length: Some(1.5),
        mole_fraction: Some(0.2),
        self_absorption: Some(true),
        slit_function: Some(1.0),
        slit_unit: Some(WaveUnit::Wavenumber),
        norm_by: Some(NormBy::Area),
        ..Conditions::default()
    };
    let held = QuantitySet::from_slice(&[Quantity::Abscoeff, Quantity::Emisscoeff]);
    let mut spectrum = spectrum_holding(held, &conditions);

    let first = update(&mut spectrum, QuantityRequest::All, None).expect("first update");
    assert!(first.added.contains(Quantity::Radiance));
    assert!(first.added.contains(Quantity::Emissivity));
    let snapshot = spectrum.clone();

    let second = update(&mut spectrum, QuantityRequest::All, None).expect("second update");
    assert!(second.added.is_empty());
    assert!(second.slit_reapplied.is_empty());
    assert_eq!(spectrum, snapshot);
}

#[test]
fn path_length_round_trip_restores_beer_lambert_quantities() {
    let held = QuantitySet::from_slice(&[
        Quantity::Abscoeff,
        Quantity::Absorbance,
        Quantity::TransmittanceNoslit,
    ]);
    let conditions = Conditions {
        path_length: Some(1.5),
        ..Conditions::default()
    };

    let abscoeff = sample_values(Quantity::Abscoeff);
    let absorbance: Vec<f64> = abscoeff.iter().map(|k| k * 1.5).collect();
    let transmittance: Vec<f64> = absorbance.iter().map(|a| (-a).exp()).collect();
    let mut original = spectrum_holding(held, &conditions);
    original.set_values(Quantity::Absorbance, absorbance).unwrap();
    original
        .set_values(Quantity::TransmittanceNoslit, transmittance)
        .unwrap();

    for target in [0.1, 0.75, 4.0, 120.0] {
        let mut spectrum = original.clone();
        rescale_path_length(&mut spectrum, target, None, false).expect("forward rescale");
        assert_eq!(spectrum.conditions.path_length, Some(target));
        rescale_path_length(&mut spectrum, 1.5, None, false).expect("backward rescale");

        for quantity in held.iter() {
            let expected = original.get(quantity).unwrap();
            let actual = spectrum.get(quantity).unwrap();
            for (index, (expected, actual)) in expected.iter().zip(actual).enumerate() {
                assert_close(&format!("{quantity}[{index}] via {target}"), *expected, *actual);
            }
        }
    }
}

#[test]
fn reachability_grows_with_the_held_set() {
    let rescalable: Vec<Quantity> = NON_CONVOLUTED_QUANTITIES
        .into_iter()
        .filter(|quantity| quantity.is_rescalable())
        .collect();
    let subsets: Vec<QuantitySet> = (0u32..1 << rescalable.len())
        .map(|mask| {
            rescalable
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, quantity)| *quantity)
                .collect()
        })
        .collect();

    for conditions in condition_variants() {
        let reachable: Vec<QuantitySet> = subsets
            .iter()
            .map(|held| reachable_set(&spectrum_holding(*held, &conditions)))
            .collect();
        for (small, small_reachable) in subsets.iter().zip(&reachable) {
            assert!(small.is_subset(*small_reachable));
            for (large, large_reachable) in subsets.iter().zip(&reachable) {
                if small.is_subset(*large) {
                    assert!(
                        small_reachable.is_subset(*large_reachable),
                        "{small} reaches {small_reachable} but {large} only {large_reachable}"
                    );
                }
            }
        }
    }
}

#[test]
fn equilibrium_makes_every_raw_quantity_reachable_from_any_one() {
    let raw: QuantitySet = NON_CONVOLUTED_QUANTITIES
        .into_iter()
        .filter(|quantity| quantity.is_rescalable())
        .collect();

    for path_length in [None, Some(1.0)] {
        let conditions = Conditions {
            tgas: Some(1800.0),
            path_length,
            ..Conditions::default()
        };
        for quantity in raw.iter() {
            let spectrum = spectrum_holding(QuantitySet::empty().with(quantity), &conditions);
            let reachable = reachable_set(&spectrum);
            assert!(raw.is_subset(reachable), "{quantity} only reaches {reachable}");
        }
    }
}

#[test]
fn saturated_transmittance_cannot_be_rescaled_to_a_shorter_path() {
    let conditions = Conditions {
        path_length: Some(2.0),
        ..Conditions::default()
    };
    let held = QuantitySet::empty().with(Quantity::TransmittanceNoslit);
    let mut saturated = spectrum_holding(held, &conditions);
    saturated
        .set_values(Quantity::TransmittanceNoslit, vec![1.0, 0.5, 0.0, 0.0])
        .unwrap();

    let mut shorter = saturated.clone();
    let error = rescale_path_length(&mut shorter, 1.0, None, false).expect_err("saturated");
    assert_eq!(error.category(), SpectraErrorCategory::Saturation);
    assert_eq!(shorter.conditions.path_length, Some(2.0));
    assert_eq!(shorter.get_vars(VarScope::All), held);

    let mut longer = saturated.clone();
    rescale_path_length(&mut longer, 4.0, None, false).expect("longer path keeps saturation");
    let transmittance = longer.get(Quantity::TransmittanceNoslit).unwrap();
    assert_eq!(transmittance[0], 1.0);
    assert_close("T^2", 0.25, transmittance[1]);
    assert_eq!(transmittance[2], 0.0);

    let mut ctx = RescaleContext::new(&saturated);
    ctx.new_path_length = 1.0;
    ctx.extra = QuantitySet::empty().with(Quantity::Abscoeff);
    let mut rescaled = Rescaled::new();
    let outcome = rescalers::rescale_abscoeff(&ctx, &mut rescaled).expect("skipped, not raised");
    assert_eq!(outcome, rescalers::Derivation::Skipped);
    assert!(!rescaled.contains(Quantity::Abscoeff));
}

#[test]
fn same_request_keeps_every_held_quantity() {
    let conditions = Conditions {
        path_length: Some(1.0),
        self_absorption: Some(false),
        ..Conditions::default()
    };
    let held: QuantitySet = ORDERED_KEYS
        .into_iter()
        .filter(|quantity| !quantity.is_convolved())
        .collect();
    let mut spectrum = spectrum_holding(held, &conditions);

    let report = update(&mut spectrum, QuantityRequest::Same, None).expect("update same");
    assert_eq!(report.wanted, held);
    assert_eq!(spectrum.get_vars(VarScope::All), held);
    for quantity in held.iter() {
        assert_eq!(
            spectrum.get(quantity).unwrap(),
            sample_values(quantity).as_slice()
        );
    }
}
