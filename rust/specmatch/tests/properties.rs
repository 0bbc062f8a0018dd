use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use specmatch::{
    Normalization,
    Signal,
    SimilarityParams,
    SpecMatchError,
    Spectrum,
    ToleranceWindow,
    UnmatchedSignalPolicy,
    Weights,
    normalize,
    score,
};

const POLICIES: [UnmatchedSignalPolicy; 4] = [
    UnmatchedSignalPolicy::KeepAll,
    UnmatchedSignalPolicy::KeepQueryOnly,
    UnmatchedSignalPolicy::KeepLibraryOnly,
    UnmatchedSignalPolicy::DropUnmatched,
];

/// Signals spaced at least 1 Da apart, so every match is unambiguous.
fn random_spectrum(rng: &mut ChaCha8Rng, n: usize) -> Spectrum {
    let mut mz = 50.0;
    (0..n)
        .map(|_| {
            mz += rng.gen_range(1.0..20.0);
            Signal::new(mz, rng.gen_range(1.0..1000.0))
        })
        .collect()
}

fn scale(spec: &Spectrum, k: f64) -> Spectrum {
    spec.signals()
        .iter()
        .map(|s| Signal::new(s.mz, s.intensity * k))
        .collect()
}

fn params() -> SimilarityParams {
    SimilarityParams::default().with_tolerance(ToleranceWindow::absolute(0.01))
}

#[test]
fn test_scale_invariance() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..50 {
        let n = rng.gen_range(1..40);
        let a = random_spectrum(&mut rng, n);
        let k = rng.gen_range(0.01..100.0);
        let b = scale(&a, k);

        for weights in [Weights::NONE, Weights::SQRT, Weights::MASSBANK, Weights::NIST11] {
            let p = params().with_weights(weights);
            let res = score(&a, &b, &p).unwrap().unwrap();
            assert!((res.score - 1.0).abs() < 1e-6, "k = {}, {:?}", k, res);
            assert!(res.score <= 1.0);
            assert_eq!(res.matched_signals, n);
        }
    }
}

#[test]
fn test_equal_subset_scaling_invariance() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..30 {
        let a = random_spectrum(&mut rng, 20);
        let b = scale(&a, rng.gen_range(0.1..10.0));
        let mut subset: Vec<bool> = (0..20).map(|_| rng.gen_bool(0.5)).collect();
        subset[0] = true;
        subset[1] = false;
        let k = rng.gen_range(2.0..10.0);
        let scale_subset = |spec: &Spectrum| -> Spectrum {
            spec.signals()
                .iter()
                .zip(subset.iter())
                .map(|(s, &x)| Signal::new(s.mz, if x { s.intensity * k } else { s.intensity }))
                .collect()
        };
        let (a2, b2) = (scale_subset(&a), scale_subset(&b));

        for policy in POLICIES {
            let p = params().with_weights(Weights::NONE).with_unmatched(policy);
            let base = score(&a, &b, &p).unwrap().unwrap().score;
            let both = score(&a2, &b2, &p).unwrap().unwrap().score;
            let one_sided = score(&a2, &b, &p).unwrap().unwrap().score;
            assert!((base - both).abs() < 1e-6);
            assert!((base - one_sided).abs() > 1e-9);
        }
    }
}

#[test]
fn test_uniform_scaling_of_both_sides() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..30 {
        let a = random_spectrum(&mut rng, 25);
        let b: Spectrum = a
            .signals()
            .iter()
            .map(|s| Signal::new(s.mz + 0.002, s.intensity * rng.gen_range(0.5..2.0)))
            .collect();
        let (ka, kb) = (rng.gen_range(0.1..10.0), rng.gen_range(0.1..10.0));

        for policy in POLICIES {
            let p = params().with_unmatched(policy);
            let base = score(&a, &b, &p).unwrap().unwrap().score;
            let scaled = score(&scale(&a, ka), &scale(&b, kb), &p)
                .unwrap()
                .unwrap()
                .score;
            assert!((base - scaled).abs() < 1e-9);
        }
    }
}

#[test]
fn test_one_sided_subset_scaling_changes_score() {
    let q = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![10.0, 20.0, 30.0]).unwrap();
    let l = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![30.0, 20.0, 10.0]).unwrap();
    let p = params().with_weights(Weights::NONE);
    let base = score(&q, &l, &p).unwrap().unwrap().score;

    let q2 = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![50.0, 20.0, 30.0]).unwrap();
    let changed = score(&q2, &l, &p).unwrap().unwrap().score;
    assert!((base - changed).abs() > 1e-3);
}

#[test]
fn test_symmetric_zeroing() {
    // Zeroing the same signal on both sides equals removing it
    let q = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![10.0, 20.0, 30.0]).unwrap();
    let l = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![15.0, 5.0, 40.0]).unwrap();
    let q0 = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![10.0, 0.0, 30.0]).unwrap();
    let l0 = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![15.0, 0.0, 40.0]).unwrap();
    let q_removed = Spectrum::from_arrays(vec![100.0, 300.0], vec![10.0, 30.0]).unwrap();
    let l_removed = Spectrum::from_arrays(vec![100.0, 300.0], vec![15.0, 40.0]).unwrap();

    for weights in [Weights::NONE, Weights::SQRT, Weights::NIST11] {
        let p = params().with_weights(weights);
        let zeroed = score(&q0, &l0, &p).unwrap().unwrap().score;
        let removed = score(&q_removed, &l_removed, &p).unwrap().unwrap().score;
        let full = score(&q, &l, &p).unwrap().unwrap().score;
        assert!((zeroed - removed).abs() < 1e-12);
        assert!((zeroed - full).abs() > 1e-6);
    }
}

#[test]
fn test_tolerance_boundary() {
    let l = Spectrum::from_arrays(vec![500.0], vec![1.0]).unwrap();
    let p = SimilarityParams::default().with_tolerance(ToleranceWindow::new(0.005, 10.0));

    let inside = Spectrum::from_arrays(vec![500.0049], vec![1.0]).unwrap();
    let res = score(&inside, &l, &p).unwrap().unwrap();
    assert_eq!(res.matched_signals, 1);

    let outside = Spectrum::from_arrays(vec![500.006], vec![1.0]).unwrap();
    assert!(score(&outside, &l, &p).unwrap().is_none());
    let res = score(&outside, &l, &p.with_min_matched_signals(0))
        .unwrap()
        .unwrap();
    assert_eq!(res.matched_signals, 0);
    assert_eq!(res.score, 0.0);
}

#[test]
fn test_min_matched_gating() {
    let q = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![1.0, 2.0, 3.0]).unwrap();
    let l = Spectrum::from_arrays(vec![100.0, 200.0, 300.0], vec![3.0, 2.0, 1.0]).unwrap();
    assert!(score(&q, &l, &params().with_min_matched_signals(4))
        .unwrap()
        .is_none());
    let res = score(&q, &l, &params().with_min_matched_signals(3))
        .unwrap()
        .unwrap();
    assert_eq!(res.matched_signals, 3);
}

#[test]
fn test_normalization_targets() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let values: Vec<f64> = (0..100).map(|_| rng.gen_range(0.0..1e6)).collect();

    let sum_100: f64 = normalize(&values, Normalization::SumAs100).iter().sum();
    let sum_1: f64 = normalize(&values, Normalization::SumAs1).iter().sum();
    let max_100 = normalize(&values, Normalization::HighestAs100)
        .into_iter()
        .fold(0.0, f64::max);
    let max_1 = normalize(&values, Normalization::HighestAs1)
        .into_iter()
        .fold(0.0, f64::max);

    assert!((sum_100 - 100.0).abs() < 1e-9);
    assert!((sum_1 - 1.0).abs() < 1e-12);
    assert!((max_100 - 100.0).abs() < 1e-9);
    assert!((max_1 - 1.0).abs() < 1e-12);
}

#[test]
fn test_end_to_end() {
    let query = Spectrum::from_arrays(vec![100.0, 200.0], vec![50.0, 100.0]).unwrap();
    let library =
        Spectrum::from_arrays(vec![100.001, 200.002, 300.0], vec![40.0, 90.0, 10.0]).unwrap();
    let p = params()
        .with_weights(Weights::NONE)
        .with_unmatched(UnmatchedSignalPolicy::KeepLibraryOnly);

    let res = score(&query, &library, &p).unwrap().unwrap();
    assert!((res.score - 0.9938586931957764).abs() < 1e-12);
    assert_eq!(res.matched_signals, 2);
    assert_eq!(res.aligned_signals, 3);
}

#[test]
fn test_degenerate_inputs_are_none() {
    let l = Spectrum::from_arrays(vec![100.0], vec![1.0]).unwrap();
    let zeros = Spectrum::from_arrays(vec![100.0, 200.0], vec![0.0, 0.0]).unwrap();
    let p = params().with_min_matched_signals(0);
    assert!(score(&Spectrum::default(), &l, &p).unwrap().is_none());
    assert!(score(&l, &Spectrum::default(), &p).unwrap().is_none());
    assert!(score(&zeros, &l, &p).unwrap().is_none());
}

#[test]
fn test_invalid_configuration_is_error() {
    let l = Spectrum::from_arrays(vec![100.0], vec![1.0]).unwrap();
    let bad = [
        params().with_weights(Weights::new(0.0, 0.0)),
        params().with_weights(Weights::new(f64::NAN, 0.0)),
        params().with_weights(Weights::new(1.0, f64::INFINITY)),
        params().with_tolerance(ToleranceWindow::new(-0.1, 0.0)),
        params().with_tolerance(ToleranceWindow::new(0.0, f64::NAN)),
    ];
    for p in bad.iter() {
        assert!(score(&l, &l, p).is_err(), "{:?}", p);
    }
}

#[test]
fn test_score_is_symmetric_without_mz_weighting() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..20 {
        let a = random_spectrum(&mut rng, 15);
        let mut b = Vec::new();
        for s in a.signals() {
            if rng.gen_bool(0.7) {
                b.push(Signal::new(s.mz, rng.gen_range(1.0..100.0)));
            }
        }
        if b.is_empty() {
            continue;
        }
        let b = Spectrum::new(b);
        let p = params().with_unmatched(UnmatchedSignalPolicy::KeepAll);
        let ab = score(&a, &b, &p).unwrap().unwrap().score;
        let ba = score(&b, &a, &p).unwrap().unwrap().score;
        assert!((ab - ba).abs() < 1e-12);
    }
}

#[test]
fn test_malformed_intensities_never_score() {
    let l = Spectrum::from_arrays(vec![100.0, 200.0], vec![1.0, 1.0]).unwrap();
    let p = params().with_weights(Weights::SQRT);
    for bad in [-4.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let q = Spectrum::from_arrays(vec![100.0, 200.0], vec![bad, 10.0]).unwrap();
        let res = score(&q, &l, &p);
        assert!(
            matches!(res, Err(SpecMatchError::InvalidParameter { .. })),
            "{}: {:?}",
            bad,
            res
        );
    }
}

#[test]
fn test_precursor_shift_recovers_full_score() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..20 {
        let n = rng.gen_range(2..30);
        let a = random_spectrum(&mut rng, n).with_precursor_mz(900.0);
        // Far enough that no shifted signal lands next to an original one
        let delta = rng.gen_range(1000.0..2000.0);
        let b: Spectrum = a
            .signals()
            .iter()
            .map(|s| Signal::new(s.mz + delta, s.intensity * 3.0))
            .collect::<Spectrum>()
            .with_precursor_mz(900.0 + delta);

        let plain = params().with_min_matched_signals(0);
        assert_eq!(score(&a, &b, &plain).unwrap().unwrap().score, 0.0);

        let aware = plain.with_modification_aware(true);
        let res = score(&a, &b, &aware).unwrap().unwrap();
        assert!((res.score - 1.0).abs() < 1e-9, "{:?}", res);
        assert_eq!(res.matched_signals, n);
        assert_eq!(res.modified_signals, n);
    }
}

