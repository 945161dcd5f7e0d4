use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use symreg::engines::expression::{ExprTree, Operand};
use symreg::engines::generation::{crossover, generate_random_tree, mutate, simplify};

const N_VARIABLES: usize = 3;
const ROW: [f64; N_VARIABLES] = [0.7, -1.3, 2.1];

fn random_tree(seed: u64, max_depth: usize) -> ExprTree {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_random_tree(max_depth, N_VARIABLES, 0, &mut rng)
}

fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn clone_is_deep_and_independent(seed in any::<u64>()) {
        let original = random_tree(seed, 5);
        let rendered = original.to_string();
        let value = original.evaluate(&ROW);

        let mut copy = original.clone();
        prop_assert_eq!(copy.to_string(), rendered.clone());
        prop_assert_ne!(copy.id(), original.id());

        // The last node in pre-order is always a leaf.
        let leaf = *copy.node_ids().last().unwrap();
        copy.set_operand(leaf, Operand::Constant(123.5)).unwrap();
        prop_assert_eq!(original.to_string(), rendered);
        prop_assert!(same_value(original.evaluate(&ROW), value));
    }

    #[test]
    fn crossover_never_touches_parents(
        a in any::<u64>(),
        b in any::<u64>(),
        op_seed in any::<u64>(),
    ) {
        let parent1 = random_tree(a, 4);
        let parent2 = random_tree(b, 4);
        let (before1, before2) = (parent1.to_string(), parent2.to_string());

        let mut rng = StdRng::seed_from_u64(op_seed);
        let (child1, child2) = crossover(&parent1, &parent2, &mut rng).unwrap();

        prop_assert_eq!(parent1.to_string(), before1);
        prop_assert_eq!(parent2.to_string(), before2);
        prop_assert!(child1.validate().is_ok());
        prop_assert!(child2.validate().is_ok());
        // Nodes are exchanged, never created or lost.
        prop_assert_eq!(child1.len() + child2.len(), parent1.len() + parent2.len());
    }

    #[test]
    fn mutation_keeps_trees_well_formed(
        seed in any::<u64>(),
        op_seed in any::<u64>(),
        rate in 0.0f64..=1.0,
    ) {
        let tree = random_tree(seed, 5);
        let before = tree.to_string();
        let mut rng = StdRng::seed_from_u64(op_seed);

        let mutant = mutate(&tree, 5, rate, N_VARIABLES, &mut rng).unwrap();
        prop_assert!(mutant.validate().is_ok());
        prop_assert_eq!(tree.to_string(), before);
        for id in mutant.node_ids() {
            let expected = mutant.find_parent(id).map_or(0, |p| mutant.node(p).depth() + 1);
            prop_assert_eq!(mutant.node(id).depth(), expected);
        }
    }

    #[test]
    fn simplify_is_idempotent(seed in any::<u64>()) {
        let tree = random_tree(seed, 5);
        let once = simplify(&tree);
        let twice = simplify(&once);
        prop_assert!(once.validate().is_ok());
        prop_assert_eq!(once.to_string(), twice.to_string());
        prop_assert!(once.len() <= tree.len());
    }

    #[test]
    fn structural_depth_bounded_by_generation_limit(seed in any::<u64>(), max_depth in 0usize..6) {
        let tree = random_tree(seed, max_depth);
        prop_assert!(tree.depth() <= max_depth + 1);
    }
}
