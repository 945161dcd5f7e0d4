use crate::engines::expression::{ExprTree, NodeId};
use crate::error::{Result, SymregError};
use rand::seq::SliceRandom;
use rand::Rng;

/// How a crossover pairing was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverKind {
    /// Both points were operators: the nodes exchanged symbols and children.
    SubtreeSwap,
    /// Both points were operands: their values were exchanged.
    OperandSwap,
    /// One operator, one operand: the subtrees were spliced across parents.
    Splice,
    /// Mixed pairing where a point was a root; nothing changed.
    Skipped,
}

/// Uniformly random reachable node, root included.
pub fn random_node<R: Rng + ?Sized>(tree: &ExprTree, rng: &mut R) -> Result<NodeId> {
    tree.node_ids()
        .choose(rng)
        .copied()
        .ok_or_else(|| SymregError::MalformedTree("Tree has no reachable nodes".to_string()))
}

/// Recombines clones of both parents at one random point each.
/// The parents themselves are never modified.
pub fn crossover<R: Rng + ?Sized>(
    parent1: &ExprTree,
    parent2: &ExprTree,
    rng: &mut R,
) -> Result<(ExprTree, ExprTree)> {
    let (child1, child2, _) = crossover_with_kind(parent1, parent2, rng)?;
    Ok((child1, child2))
}

pub fn crossover_with_kind<R: Rng + ?Sized>(
    parent1: &ExprTree,
    parent2: &ExprTree,
    rng: &mut R,
) -> Result<(ExprTree, ExprTree, CrossoverKind)> {
    let mut child1 = parent1.clone();
    let mut child2 = parent2.clone();

    let point1 = random_node(&child1, rng)?;
    let point2 = random_node(&child2, rng)?;

    let kind = match (child1.node(point1).operand(), child2.node(point2).operand()) {
        (None, None) => {
            swap_subtrees(&mut child1, point1, &mut child2, point2)?;
            CrossoverKind::SubtreeSwap
        }
        (Some(a), Some(b)) => {
            child1.set_operand(point1, b)?;
            child2.set_operand(point2, a)?;
            CrossoverKind::OperandSwap
        }
        _ => {
            if replace_subtree(&mut child1, point1, &mut child2, point2)? {
                CrossoverKind::Splice
            } else {
                log::trace!("Crossover skipped: mixed pairing at a root");
                CrossoverKind::Skipped
            }
        }
    };

    child1.compact();
    child2.compact();
    Ok((child1, child2, kind))
}

/// Exchanges the subtrees rooted at two operator nodes, roots included.
/// Each side receives a deep copy of the other's subtree.
pub fn swap_subtrees(
    tree1: &mut ExprTree,
    node1: NodeId,
    tree2: &mut ExprTree,
    node2: NodeId,
) -> Result<()> {
    let incoming1 = tree1.graft(tree2, node2)?;
    let incoming2 = tree2.graft(tree1, node1)?;
    tree1.replace_node(node1, incoming1)?;
    tree2.replace_node(node2, incoming2)?;
    Ok(())
}

/// Splices `node1` and `node2` into each other's slots. Returns `false`
/// without editing when either node is the root of its tree.
pub fn replace_subtree(
    tree1: &mut ExprTree,
    node1: NodeId,
    tree2: &mut ExprTree,
    node2: NodeId,
) -> Result<bool> {
    for (tree, node) in [(&*tree1, node1), (&*tree2, node2)] {
        if !tree.contains(node) {
            return Err(SymregError::InvalidEdit(format!(
                "Cannot replace subtree: node {} is absent",
                node.index()
            )));
        }
    }
    if tree1.find_parent(node1).is_none() || tree2.find_parent(node2).is_none() {
        return Ok(false);
    }
    swap_subtrees(tree1, node1, tree2, node2)?;
    Ok(true)
}
