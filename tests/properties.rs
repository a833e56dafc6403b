//! Property tests for generation, mutation and scoring

use proptest::prelude::*;
use protein_design::fitness::{FitnessEvaluator, FitnessWeights};
use protein_design::generator::SequenceGenerator;
use protein_design::predictor::StructureSummary;
use protein_design::residue::AminoAcid;
use protein_design::sequence::Sequence;
use protein_design::target::{DesignTarget, PropertyTarget, SecondaryStructureTarget};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Random satisfiable targets with up to four catalytic positions
fn arb_target() -> impl Strategy<Value = DesignTarget> {
    (1usize..40, 0usize..20).prop_flat_map(|(min_len, extra)| {
        let max_len = min_len + extra;
        prop::collection::btree_map(
            1..=max_len,
            prop::collection::vec(0..AminoAcid::ALL.len(), 1..4),
            0..4,
        )
        .prop_map(move |catalytic| {
            catalytic
                .into_iter()
                .fold(DesignTarget::builder(min_len, max_len), |builder, (pos, idx)| {
                    builder.catalytic_residue(pos, idx.into_iter().map(|i| AminoAcid::ALL[i]))
                })
                .build()
                .expect("generated target is satisfiable")
        })
    })
}

fn arb_sequence() -> impl Strategy<Value = Sequence> {
    prop::collection::vec(0..AminoAcid::ALL.len(), 1..80)
        .prop_map(|idx| Sequence::new(idx.into_iter().map(|i| AminoAcid::ALL[i]).collect()))
}

/// Any valid structure distribution, including all-helix and all-sheet
fn arb_structure() -> impl Strategy<Value = StructureSummary> {
    prop_oneof![
        Just((1.0, 0.0)),
        Just((0.0, 1.0)),
        Just((0.0, 0.0)),
        (0.0..=1.0f64, 0.0..=1.0f64).prop_map(|(helix, t)| (helix, (1.0 - helix) * t)),
    ]
    .prop_map(|(helix, sheet)| {
        StructureSummary::from_fractions(helix, sheet, (1.0 - helix - sheet).max(0.0))
            .expect("fractions sum to 1")
    })
}

fn satisfies(target: &DesignTarget, seq: &Sequence) -> bool {
    target.contains_length(seq.len())
        && target
            .catalytic_residues()
            .iter()
            .all(|(&pos, accepted)| seq.residue_at(pos).map_or(false, |aa| accepted.contains(&aa)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_sequences_satisfy_target(target in arb_target(), seed in any::<u64>()) {
        let generator = SequenceGenerator::new();
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..50 {
            let seq = generator.generate_random(&target, &mut rng);
            prop_assert!(satisfies(&target, &seq), "{} violates the target", seq);
        }
    }

    #[test]
    fn mutation_never_changes_catalytic_residues(
        target in arb_target(),
        rate in 0.0..=1.0f64,
        seed in any::<u64>(),
    ) {
        let generator = SequenceGenerator::new().with_indel_probability(0.5);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seq = generator.generate_random(&target, &mut rng);

        for _ in 0..20 {
            let mutant = generator.mutate(&seq, &target, rate, &mut rng);
            prop_assert!(satisfies(&target, &mutant));
            for &pos in target.catalytic_residues().keys() {
                prop_assert_eq!(mutant.residue_at(pos), seq.residue_at(pos));
            }
            seq = mutant;
        }
    }

    #[test]
    fn evaluate_is_pure(seq in arb_sequence(), structure in arb_structure()) {
        let target = DesignTarget::builder(10, 60)
            .secondary_structure(SecondaryStructureTarget::new(0.3, 0.5, 0.2, 0.4))
            .properties(PropertyTarget::new(-1.0, 1.0, -3, 3))
            .catalytic_residue(5, [AminoAcid::His])
            .build()
            .unwrap();
        let evaluator = FitnessEvaluator::new(target, FitnessWeights::default());

        let first = evaluator.evaluate(&seq, &structure).unwrap();
        let second = evaluator.evaluate(&seq, &structure).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn total_is_bounded(
        seq in arb_sequence(),
        structure in arb_structure(),
        linear in any::<bool>(),
    ) {
        let target = DesignTarget::builder(5, 50)
            .secondary_structure(SecondaryStructureTarget::new(0.2, 0.3, 0.1, 0.2))
            .properties(PropertyTarget::new(0.0, 0.5, 0, 2))
            .build()
            .unwrap();
        let evaluator = FitnessEvaluator::new(target, FitnessWeights::default());
        let evaluator = if linear { evaluator.with_linear_falloff() } else { evaluator };

        let result = evaluator.evaluate(&seq, &structure).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.total));
        for sub in [result.stability, result.function, result.structure] {
            prop_assert!((0.0..=1.0).contains(&sub));
        }
    }
}
