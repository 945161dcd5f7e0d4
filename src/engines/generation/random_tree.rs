use crate::engines::expression::{Arena, ExprTree, NodeId, Op, Operand};
use rand::seq::SliceRandom;
use rand::Rng;

/// Chance that a terminal is a constant rather than a variable.
pub const CONSTANT_PROBABILITY: f64 = 0.3;
/// Chance that a non-root node below the depth limit is an operator.
pub const OPERATOR_PROBABILITY: f64 = 0.6;
/// Chance that the root (depth 0) is forced to be an operator.
pub const OPERATOR_FIRST_PROBABILITY: f64 = 0.9;
pub const CONSTANT_MIN: f64 = -10.0;
pub const CONSTANT_MAX: f64 = 10.0;

/// Random terminal: a constant in [-10, 10] rounded to 2 decimals, or a variable.
pub fn random_operand<R: Rng + ?Sized>(n_variables: usize, rng: &mut R) -> Operand {
    if n_variables == 0 || rng.gen::<f64>() < CONSTANT_PROBABILITY {
        let value: f64 = rng.gen_range(CONSTANT_MIN..=CONSTANT_MAX);
        Operand::Constant((value * 100.0).round() / 100.0)
    } else {
        Operand::Variable(rng.gen_range(0..n_variables))
    }
}

/// Grows a random subtree into `arena`, returning its detached root.
pub fn grow<R: Rng + ?Sized>(
    arena: &mut Arena,
    max_depth: usize,
    n_variables: usize,
    depth: usize,
    rng: &mut R,
) -> NodeId {
    let operator = if depth >= max_depth {
        false
    } else if depth == 0 && rng.gen::<f64>() < OPERATOR_FIRST_PROBABILITY {
        true
    } else {
        rng.gen::<f64>() < OPERATOR_PROBABILITY
    };

    if !operator {
        return arena.push_operand(random_operand(n_variables, rng), depth);
    }

    let op = *Op::ALL.choose(rng).unwrap_or(&Op::Add);
    let left = grow(arena, max_depth, n_variables, depth + 1, rng);
    let right = op
        .is_binary()
        .then(|| grow(arena, max_depth, n_variables, depth + 1, rng));
    arena.link_operator(op, left, right, depth)
}

/// Random expression whose root sits at `current_depth`; nodes at
/// `max_depth` or deeper are always terminals.
pub fn generate_random_tree<R: Rng + ?Sized>(
    max_depth: usize,
    n_variables: usize,
    current_depth: usize,
    rng: &mut R,
) -> ExprTree {
    let mut arena = Arena::new();
    let root = grow(&mut arena, max_depth, n_variables, current_depth, rng);
    ExprTree::assemble(arena, root)
}

pub fn initialize_population<R: Rng + ?Sized>(
    population_size: usize,
    n_variables: usize,
    max_depth: usize,
    rng: &mut R,
) -> Vec<ExprTree> {
    (0..population_size)
        .map(|_| generate_random_tree(max_depth, n_variables, 0, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_depth_limit_respected() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let tree = generate_random_tree(4, 3, 0, &mut rng);
            tree.validate().unwrap();
            // Structural depth counts levels, so depth limit 4 allows 5 levels.
            assert!(tree.depth() <= 5, "{} too deep", tree);
        }
    }

    #[test]
    fn test_zero_depth_budget_gives_terminal() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let tree = generate_random_tree(0, 2, 0, &mut rng);
            assert_eq!(tree.len(), 1);
            assert!(tree.node(tree.root()).is_operand());
        }
    }

    #[test]
    fn test_root_is_mostly_operator() {
        let mut rng = StdRng::seed_from_u64(11);
        let operators = (0..1000)
            .filter(|_| generate_random_tree(5, 1, 0, &mut rng).node_ids().len() > 1)
            .count();
        // 0.9 + 0.1 * 0.6 = 0.96 expected
        assert!(operators > 900, "only {} operator roots", operators);
    }

    #[test]
    fn test_depth_attributes_follow_position() {
        let mut rng = StdRng::seed_from_u64(3);
        let tree = generate_random_tree(5, 2, 2, &mut rng);
        assert_eq!(tree.node(tree.root()).depth(), 2);
        for id in tree.node_ids() {
            if let Some(parent) = tree.find_parent(id) {
                assert_eq!(tree.node(id).depth(), tree.node(parent).depth() + 1);
            }
        }
    }

    #[test]
    fn test_random_operand_ranges() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut constants = 0;
        for _ in 0..2000 {
            match random_operand(3, &mut rng) {
                Operand::Constant(c) => {
                    constants += 1;
                    assert!((CONSTANT_MIN..=CONSTANT_MAX).contains(&c));
                    assert!(((c * 100.0).round() - c * 100.0).abs() < 1e-6);
                }
                Operand::Variable(i) => assert!(i < 3),
            }
        }
        assert!((400..800).contains(&constants), "{} constants", constants);
    }

    #[test]
    fn test_initialize_population_size() {
        let mut rng = StdRng::seed_from_u64(9);
        let population = initialize_population(25, 2, 4, &mut rng);
        assert_eq!(population.len(), 25);
    }
}
