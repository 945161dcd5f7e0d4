use super::crossover::random_node;
use super::random_tree::{grow, random_operand};
use crate::engines::expression::{ExprTree, Node, NodeId, Operand};
use crate::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Replace the node with a fresh terminal.
    Shrink,
    /// Replace the node with a fresh random subtree.
    SubtreeReplacement,
    /// Promote the node's left child into its place.
    Hoist,
    /// Perturb the node in place.
    Tweak,
}

impl MutationKind {
    pub const ALL: [MutationKind; 4] = [
        MutationKind::Shrink,
        MutationKind::SubtreeReplacement,
        MutationKind::Hoist,
        MutationKind::Tweak,
    ];
}

/// With probability `1 - mutation_rate` returns an unchanged copy; otherwise
/// applies one uniformly chosen mutation at one uniformly chosen node.
pub fn mutate<R: Rng + ?Sized>(
    individual: &ExprTree,
    max_depth: usize,
    mutation_rate: f64,
    n_variables: usize,
    rng: &mut R,
) -> Result<ExprTree> {
    let mut mutant = individual.clone();
    if rng.gen::<f64>() >= mutation_rate {
        return Ok(mutant);
    }

    let target = random_node(&mutant, rng)?;
    let kind = *MutationKind::ALL.choose(rng).unwrap_or(&MutationKind::Tweak);
    if !apply_mutation(&mut mutant, target, kind, max_depth, n_variables, rng)? {
        log::trace!("{:?} mutation was a no-op at node {}", kind, target.index());
    }
    mutant.compact();
    Ok(mutant)
}

/// Applies `kind` at `target`. Returns whether the tree was edited.
pub fn apply_mutation<R: Rng + ?Sized>(
    tree: &mut ExprTree,
    target: NodeId,
    kind: MutationKind,
    max_depth: usize,
    n_variables: usize,
    rng: &mut R,
) -> Result<bool> {
    match kind {
        MutationKind::Shrink => shrink(tree, target, n_variables, rng).map(|_| true),
        MutationKind::SubtreeReplacement => {
            subtree_replacement(tree, target, max_depth, n_variables, rng)
        }
        MutationKind::Hoist => hoist(tree, target),
        MutationKind::Tweak => tweak(tree, target, n_variables, rng),
    }
}

pub fn shrink<R: Rng + ?Sized>(
    tree: &mut ExprTree,
    target: NodeId,
    n_variables: usize,
    rng: &mut R,
) -> Result<()> {
    let depth = tree.node(target).depth();
    let terminal = tree
        .arena_mut()
        .push_operand(random_operand(n_variables, rng), depth);
    tree.replace_node(target, terminal)
}

/// Only fires while more than one level of depth budget remains below `target`.
pub fn subtree_replacement<R: Rng + ?Sized>(
    tree: &mut ExprTree,
    target: NodeId,
    max_depth: usize,
    n_variables: usize,
    rng: &mut R,
) -> Result<bool> {
    let depth = tree.node(target).depth();
    if max_depth.saturating_sub(depth) <= 1 {
        return Ok(false);
    }
    let fresh = grow(tree.arena_mut(), max_depth, n_variables, depth, rng);
    tree.replace_node(target, fresh)?;
    Ok(true)
}

pub fn hoist(tree: &mut ExprTree, target: NodeId) -> Result<bool> {
    match tree.node(target).children() {
        (Some(left), _) => {
            tree.replace_node(target, left)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Operators swap to a different symbol of the same arity, constants shift
/// by up to 1 and variables move to a different index.
pub fn tweak<R: Rng + ?Sized>(
    tree: &mut ExprTree,
    target: NodeId,
    n_variables: usize,
    rng: &mut R,
) -> Result<bool> {
    match tree.node(target).clone() {
        Node::Operator { op: current, .. } => {
            let alternatives: Vec<_> = current
                .same_arity()
                .iter()
                .copied()
                .filter(|candidate| *candidate != current)
                .collect();
            match alternatives.choose(rng) {
                Some(&replacement) => {
                    tree.set_op(target, replacement)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        Node::Operand {
            value: Operand::Constant(c),
            ..
        } => {
            let shifted = c + rng.gen_range(-1.0..=1.0);
            tree.set_operand(target, Operand::Constant(shifted))?;
            Ok(true)
        }
        Node::Operand {
            value: Operand::Variable(current),
            ..
        } => {
            if n_variables < 2 {
                return Ok(false);
            }
            let mut index = rng.gen_range(0..n_variables - 1);
            if index >= current {
                index += 1;
            }
            tree.set_operand(target, Operand::Variable(index))?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::expression::Op;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> ExprTree {
        // (sin(x_0) * (x_1 + 2))
        let sin = ExprTree::unary(Op::Sin, &ExprTree::variable(0)).unwrap();
        let sum =
            ExprTree::binary(Op::Add, &ExprTree::variable(1), &ExprTree::constant(2.0)).unwrap();
        ExprTree::binary(Op::Mul, &sin, &sum).unwrap()
    }

    #[test]
    fn test_zero_rate_passes_through() {
        let tree = sample();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let out = mutate(&tree, 5, 0.0, 2, &mut rng).unwrap();
            assert_eq!(out.to_string(), tree.to_string());
            assert_ne!(out.id(), tree.id());
        }
    }

    #[test]
    fn test_full_rate_keeps_trees_valid() {
        let tree = sample();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..300 {
            let out = mutate(&tree, 5, 1.0, 2, &mut rng).unwrap();
            out.validate().unwrap();
        }
        assert_eq!(tree.to_string(), "(sin(x_0) * (x_1 + 2))");
    }

    #[test]
    fn test_shrink_root() {
        let mut tree = sample();
        let root = tree.root();
        let mut rng = StdRng::seed_from_u64(1);
        shrink(&mut tree, root, 2, &mut rng).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.node(tree.root()).is_operand());
        assert_eq!(tree.node(tree.root()).depth(), 0);
    }

    #[test]
    fn test_hoist_promotes_left_child() {
        let mut tree = sample();
        let root = tree.root();
        assert!(hoist(&mut tree, root).unwrap());
        assert_eq!(tree.to_string(), "sin(x_0)");

        let leaf = tree.node_ids()[1];
        assert!(!hoist(&mut tree, leaf).unwrap());
        assert_eq!(tree.to_string(), "sin(x_0)");
    }

    #[test]
    fn test_subtree_replacement_respects_budget() {
        let mut tree = sample();
        let ids = tree.node_ids();
        // ids: [*, sin, x_0, +, x_1, 2]; x_0 sits at depth 2
        let mut rng = StdRng::seed_from_u64(4);
        assert!(!subtree_replacement(&mut tree, ids[2], 3, 2, &mut rng).unwrap());
        assert_eq!(tree.to_string(), "(sin(x_0) * (x_1 + 2))");

        for seed in 0..50 {
            let mut tree = sample();
            let target = tree.node_ids()[3];
            let mut rng = StdRng::seed_from_u64(seed);
            assert!(subtree_replacement(&mut tree, target, 4, 2, &mut rng).unwrap());
            tree.validate().unwrap();
            let deepest = tree.node_ids().iter().map(|&id| tree.node(id).depth()).max().unwrap();
            assert!(deepest <= 4);
        }
    }

    #[test]
    fn test_tweak_operator_keeps_arity() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..50 {
            let mut tree = sample();
            let ids = tree.node_ids();
            assert!(tweak(&mut tree, ids[0], 2, &mut rng).unwrap());
            assert!(tweak(&mut tree, ids[1], 2, &mut rng).unwrap());
            let root_op = tree.node(ids[0]).op().unwrap();
            let unary_op = tree.node(ids[1]).op().unwrap();
            assert!(root_op.is_binary() && root_op != Op::Mul);
            assert!(!unary_op.is_binary() && unary_op != Op::Sin);
            tree.validate().unwrap();
        }
    }

    #[test]
    fn test_tweak_operands() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let mut tree = sample();
            let ids = tree.node_ids();
            tweak(&mut tree, ids[5], 3, &mut rng).unwrap();
            let c = tree.node(ids[5]).operand().and_then(|o| o.as_constant()).unwrap();
            assert!((1.0..=3.0).contains(&c));

            tweak(&mut tree, ids[4], 3, &mut rng).unwrap();
            match tree.node(ids[4]).operand() {
                Some(Operand::Variable(i)) => assert!(i != 1 && i < 3),
                other => panic!("expected a variable, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tweak_single_variable_is_noop() {
        let mut tree = ExprTree::variable(0);
        let root = tree.root();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(!tweak(&mut tree, root, 1, &mut rng).unwrap());
        assert_eq!(tree.to_string(), "x_0");
    }
}
