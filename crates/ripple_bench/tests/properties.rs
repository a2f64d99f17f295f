//! Property-based tests for the decrement rule and cross-variant equivalence.

use proptest::prelude::*;
use ripple_bench::{enable_sequence, next_count, run_bench, BenchParams, DecVariant};

proptest! {
    /// The decrement stays in range and wraps only at the minimum.
    #[test]
    fn next_count_stays_in_range(n in 1i64..1_000, offset in 0i64..2_000) {
        let count = -n + offset % (2 * n);
        let next = next_count(count, n).unwrap().get();
        prop_assert!((-n..n).contains(&next));
        if count == -n {
            prop_assert_eq!(next, n - 1);
        } else {
            prop_assert_eq!(next, count - 1);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every variant agrees with the reference for arbitrary small benches.
    #[test]
    fn variants_agree(
        n in 1i64..20,
        seed in any::<u64>(),
        warmup_cycles in 0usize..40,
        random_cycles in 0usize..40,
    ) {
        let p = BenchParams {
            n,
            seed,
            warmup_cycles,
            random_cycles,
            ..BenchParams::default()
        };
        let reference = run_bench(DecVariant::Reference, &p).unwrap();
        prop_assert_eq!(reference.len(), p.expected_samples());
        for v in DecVariant::ALL {
            let trace = run_bench(v, &p).unwrap();
            prop_assert_eq!(reference.diff(&trace), None, "variant {}", v);
        }
    }

    /// Holding and decrementing follow the enable sequence exactly.
    #[test]
    fn random_phase_follows_enables(n in 1i64..20, seed in any::<u64>(), len in 1usize..60) {
        let p = BenchParams {
            n,
            seed,
            warmup_cycles: 0,
            random_cycles: len,
            ..BenchParams::default()
        };
        let trace = run_bench(DecVariant::Closure, &p).unwrap();
        let s = trace.samples();
        prop_assert_eq!(s[0], 0);
        for (j, enable) in enable_sequence(seed, len).into_iter().enumerate() {
            let prev = s[j];
            let expected = match (enable, prev == -n) {
                (false, _) => prev,
                (true, true) => n - 1,
                (true, false) => prev - 1,
            };
            prop_assert_eq!(s[j + 1], expected);
        }
    }
}
