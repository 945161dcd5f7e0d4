//! Bottom-up constant folding and algebraic identities.
//!
//! Rules, applied after the children of a node are simplified:
//! - binary operator over two constants folds to one constant
//! - `x + 0`, `0 + x` -> `x`
//! - `x * 1`, `1 * x` -> `x`; `x * 0`, `0 * x` -> `0`
//! - `x - 0` -> `x`; `x - x` -> `0` for identical operands
//! - `x / 1` -> `x`; `x / x` -> `1` for identical operands (also when `x` is 0)
//! - unary operator over a constant folds to one constant
//!
//! A single pass reaches a fixed point, so simplification is idempotent.

use crate::engines::expression::{Arena, ExprTree, Node, NodeId, Op, Operand};

/// Returns a simplified copy of `tree` with depths recomputed from the root.
pub fn simplify(tree: &ExprTree) -> ExprTree {
    let mut arena = Arena::with_capacity(tree.len());
    let root = fold(tree, tree.root(), &mut arena);
    let mut simplified = ExprTree::assemble(arena, root);
    simplified.compact();
    simplified.refresh_depths();
    simplified
}

fn fold(src: &ExprTree, id: NodeId, dst: &mut Arena) -> NodeId {
    match src.node(id) {
        Node::Operand { value, .. } => dst.push_operand(*value, 0),
        Node::Operator {
            op, left, right, ..
        } => {
            let l = fold(src, *left, dst);
            match right {
                None => fold_unary(*op, l, dst),
                Some(r) => {
                    let r = fold(src, *r, dst);
                    fold_binary(*op, l, r, dst)
                }
            }
        }
    }
}

fn operand_at(arena: &Arena, id: NodeId) -> Option<Operand> {
    arena.get(id).and_then(Node::operand)
}

fn constant_at(arena: &Arena, id: NodeId) -> Option<f64> {
    operand_at(arena, id).and_then(|o| o.as_constant())
}

fn fold_unary(op: Op, child: NodeId, dst: &mut Arena) -> NodeId {
    match constant_at(dst, child) {
        Some(c) => dst.push_operand(Operand::Constant(op.apply(c, None)), 0),
        None => dst.link_operator(op, child, None, 0),
    }
}

fn fold_binary(op: Op, left: NodeId, right: NodeId, dst: &mut Arena) -> NodeId {
    let lc = constant_at(dst, left);
    let rc = constant_at(dst, right);
    if let (Some(a), Some(b)) = (lc, rc) {
        return dst.push_operand(Operand::Constant(op.apply(a, Some(b))), 0);
    }

    let identical = match (operand_at(dst, left), operand_at(dst, right)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    match op {
        Op::Add if lc == Some(0.0) => right,
        Op::Add if rc == Some(0.0) => left,
        Op::Mul if lc == Some(1.0) => right,
        Op::Mul if rc == Some(1.0) => left,
        Op::Mul if lc == Some(0.0) || rc == Some(0.0) => {
            dst.push_operand(Operand::Constant(0.0), 0)
        }
        Op::Sub if rc == Some(0.0) => left,
        Op::Sub if identical => dst.push_operand(Operand::Constant(0.0), 0),
        Op::Div if rc == Some(1.0) => left,
        Op::Div if identical => dst.push_operand(Operand::Constant(1.0), 0),
        _ => dst.link_operator(op, left, Some(right), 0),
    }
}
