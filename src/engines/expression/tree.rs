//! Arena-backed expression trees.
//!
//! Every node of a tree lives in the tree's own [`Arena`] and is addressed by a
//! [`NodeId`]. Operator nodes hold child handles, and the arena keeps a reverse
//! index of parents so a node's parent is found without searching. Edits that
//! remove a subtree leave its nodes in the arena as unreachable slots; they are
//! never visited and are dropped by [`ExprTree::compact`] or by cloning.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ops::Op;
use crate::error::{Result, SymregError};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one tree instance. Clones receive a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u64);

impl TreeId {
    fn fresh() -> Self {
        Self(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Handle of a node inside one tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a terminal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Constant(f64),
    /// Index into the input row.
    Variable(usize),
}

impl Operand {
    /// # Panics
    ///
    /// Panics if a variable index is out of range for `x`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        match self {
            Operand::Constant(c) => *c,
            Operand::Variable(i) => x[*i],
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Operand::Constant(c) => Some(*c),
            Operand::Variable(_) => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Operand::Constant(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(c) => write!(f, "{}", c),
            Operand::Variable(i) => write!(f, "x_{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Operand {
        value: Operand,
        depth: usize,
    },
    Operator {
        op: Op,
        left: NodeId,
        /// Present exactly when `op` is binary.
        right: Option<NodeId>,
        depth: usize,
    },
}

impl Node {
    /// Advisory depth attribute (distance from the root when last attached).
    pub fn depth(&self) -> usize {
        match self {
            Node::Operand { depth, .. } | Node::Operator { depth, .. } => *depth,
        }
    }

    fn set_depth(&mut self, new_depth: usize) {
        match self {
            Node::Operand { depth, .. } | Node::Operator { depth, .. } => *depth = new_depth,
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Node::Operand { .. })
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Node::Operator { .. })
    }

    pub fn operand(&self) -> Option<Operand> {
        match self {
            Node::Operand { value, .. } => Some(*value),
            Node::Operator { .. } => None,
        }
    }

    pub fn op(&self) -> Option<Op> {
        match self {
            Node::Operator { op, .. } => Some(*op),
            Node::Operand { .. } => None,
        }
    }

    pub fn children(&self) -> (Option<NodeId>, Option<NodeId>) {
        match self {
            Node::Operator { left, right, .. } => (Some(*left), *right),
            Node::Operand { .. } => (None, None),
        }
    }
}

/// Node storage with a parent reverse index.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            parents: Vec::with_capacity(capacity),
        }
    }

    /// Number of slots, reachable or not.
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn push_operand(&mut self, value: Operand, depth: usize) -> NodeId {
        self.push(Node::Operand { value, depth })
    }

    /// Pushes an operator over already-pushed, unparented children.
    pub fn push_operator(
        &mut self,
        op: Op,
        left: NodeId,
        right: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        let actual = 1 + usize::from(right.is_some());
        if actual != op.arity() {
            return Err(SymregError::ArityMismatch {
                op: op.to_string(),
                expected: op.arity(),
                actual,
            });
        }
        for child in std::iter::once(left).chain(right) {
            match self.parents.get(child.0) {
                None => {
                    return Err(SymregError::InvalidEdit(format!(
                        "Child node {} does not exist",
                        child.0
                    )))
                }
                Some(Some(owner)) => {
                    return Err(SymregError::InvalidEdit(format!(
                        "Child node {} is already owned by node {}",
                        child.0, owner.0
                    )))
                }
                Some(None) => {}
            }
        }
        if right == Some(left) {
            return Err(SymregError::InvalidEdit(
                "Left and right children must be distinct nodes".to_string(),
            ));
        }
        Ok(self.link_operator(op, left, right, depth))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.parents.push(None);
        id
    }

    /// Links fresh children without the ownership checks of `push_operator`.
    pub(crate) fn link_operator(
        &mut self,
        op: Op,
        left: NodeId,
        right: Option<NodeId>,
        depth: usize,
    ) -> NodeId {
        let id = self.push(Node::Operator {
            op,
            left,
            right,
            depth,
        });
        self.parents[left.0] = Some(id);
        if let Some(r) = right {
            self.parents[r.0] = Some(id);
        }
        id
    }
}

/// Copies the subtree at `src` into `dst`. With `depth` set, depths are
/// rewritten from that value downwards; otherwise they are kept.
fn copy_subtree(src_arena: &Arena, src: NodeId, dst: &mut Arena, depth: Option<usize>) -> NodeId {
    let node = &src_arena.nodes[src.0];
    let node_depth = depth.unwrap_or_else(|| node.depth());
    match node {
        Node::Operand { value, .. } => dst.push_operand(*value, node_depth),
        Node::Operator {
            op, left, right, ..
        } => {
            let child_depth = depth.map(|d| d + 1);
            let l = copy_subtree(src_arena, *left, dst, child_depth);
            let r = right.map(|r| copy_subtree(src_arena, r, dst, child_depth));
            dst.link_operator(*op, l, r, node_depth)
        }
    }
}

/// A symbolic expression: one candidate individual.
#[derive(Debug)]
pub struct ExprTree {
    id: TreeId,
    arena: Arena,
    root: NodeId,
}

impl Clone for ExprTree {
    /// Deep copy holding only reachable nodes, under a fresh [`TreeId`].
    fn clone(&self) -> Self {
        let mut arena = Arena::with_capacity(self.len());
        let root = copy_subtree(&self.arena, self.root, &mut arena, None);
        Self {
            id: TreeId::fresh(),
            arena,
            root,
        }
    }
}

impl ExprTree {
    pub fn leaf(value: Operand) -> Self {
        let mut arena = Arena::with_capacity(1);
        let root = arena.push_operand(value, 0);
        Self {
            id: TreeId::fresh(),
            arena,
            root,
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::leaf(Operand::Constant(value))
    }

    pub fn variable(index: usize) -> Self {
        Self::leaf(Operand::Variable(index))
    }

    /// Builds an operator node over deep copies of `children`.
    pub fn operator(op: Op, children: &[&ExprTree]) -> Result<Self> {
        if children.len() != op.arity() {
            return Err(SymregError::ArityMismatch {
                op: op.to_string(),
                expected: op.arity(),
                actual: children.len(),
            });
        }
        let capacity = 1 + children.iter().map(|c| c.len()).sum::<usize>();
        let mut arena = Arena::with_capacity(capacity);
        let left = copy_subtree(&children[0].arena, children[0].root, &mut arena, Some(1));
        let right = children
            .get(1)
            .map(|c| copy_subtree(&c.arena, c.root, &mut arena, Some(1)));
        let root = arena.push_operator(op, left, right, 0)?;
        Ok(Self {
            id: TreeId::fresh(),
            arena,
            root,
        })
    }

    pub fn unary(op: Op, child: &ExprTree) -> Result<Self> {
        Self::operator(op, &[child])
    }

    pub fn binary(op: Op, left: &ExprTree, right: &ExprTree) -> Result<Self> {
        Self::operator(op, &[left, right])
    }

    /// Wraps an arena whose `root` has no parent. Unreachable slots are dropped.
    pub fn from_arena(arena: Arena, root: NodeId) -> Result<Self> {
        match arena.parents.get(root.0) {
            None => {
                return Err(SymregError::InvalidEdit(format!(
                    "Root node {} does not exist",
                    root.0
                )))
            }
            Some(Some(parent)) => {
                return Err(SymregError::MalformedTree(format!(
                    "Root node {} has parent {}",
                    root.0, parent.0
                )))
            }
            Some(None) => {}
        }
        let mut tree = Self {
            id: TreeId::fresh(),
            arena,
            root,
        };
        tree.validate()?;
        tree.compact();
        Ok(tree)
    }

    /// Wraps a freshly built arena without validation.
    pub(crate) fn assemble(arena: Arena, root: NodeId) -> Self {
        Self {
            id: TreeId::fresh(),
            arena,
            root,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree's arena.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Reachable node handles in pre-order, root first.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.arena.slots());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            ids.push(id);
            if let (Some(left), right) = self.node(id).children() {
                if let Some(r) = right {
                    stack.push(r);
                }
                stack.push(left);
            }
        }
        ids
    }

    /// Number of reachable nodes.
    pub fn len(&self) -> usize {
        self.node_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.evaluate_node(self.root, x)
    }

    pub fn evaluate_node(&self, id: NodeId, x: &[f64]) -> f64 {
        match self.node(id) {
            Node::Operand { value, .. } => value.evaluate(x),
            Node::Operator {
                op, left, right, ..
            } => {
                let l = self.evaluate_node(*left, x);
                let r = right.map(|r| self.evaluate_node(r, x));
                op.apply(l, r)
            }
        }
    }

    /// Structural depth: 1 for a leaf, 1 + deepest child for an operator.
    pub fn depth(&self) -> usize {
        self.depth_below(self.root)
    }

    fn depth_below(&self, id: NodeId) -> usize {
        match self.node(id).children() {
            (Some(left), right) => {
                1 + self
                    .depth_below(left)
                    .max(right.map_or(0, |r| self.depth_below(r)))
            }
            _ => 1,
        }
    }

    pub fn render_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        use std::fmt::Write;

        match self.node(id) {
            Node::Operand { value, .. } => {
                let _ = write!(out, "{}", value);
            }
            Node::Operator {
                op,
                left,
                right: None,
                ..
            } => {
                let _ = write!(out, "{}(", op);
                self.write_node(*left, out);
                out.push(')');
            }
            Node::Operator {
                op,
                left,
                right: Some(right),
                ..
            } => {
                out.push('(');
                self.write_node(*left, out);
                let _ = write!(out, " {} ", op);
                self.write_node(*right, out);
                out.push(')');
            }
        }
    }

    /// Whether `id` is reachable from the root.
    pub fn contains(&self, id: NodeId) -> bool {
        if id.0 >= self.arena.slots() {
            return false;
        }
        let mut current = id;
        for _ in 0..=self.arena.slots() {
            if current == self.root {
                return true;
            }
            match self.arena.parents[current.0] {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Direct parent of `target`; `None` for the root or an absent node.
    pub fn find_parent(&self, target: NodeId) -> Option<NodeId> {
        if !self.contains(target) {
            return None;
        }
        self.arena.parents[target.0]
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.arena.parents.get(id.0).copied().flatten() {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn ensure_attached(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(SymregError::InvalidEdit(format!(
                "Node {} is not part of tree {}",
                id.0, self.id.0
            )))
        }
    }

    /// Checks that `new` may be placed at `target`: either a detached subtree
    /// that owns all its nodes, or a descendant of `target`.
    fn ensure_insertable(&self, target: NodeId, new: NodeId) -> Result<()> {
        if new.0 >= self.arena.slots() {
            return Err(SymregError::InvalidEdit(format!(
                "Replacement node {} does not exist",
                new.0
            )));
        }
        if self.contains(new) {
            if self.is_ancestor_or_self(target, new) {
                return Ok(());
            }
            return Err(SymregError::InvalidEdit(format!(
                "Node {} is attached elsewhere in the tree",
                new.0
            )));
        }
        if self.arena.parents[new.0].is_some() {
            return Err(SymregError::InvalidEdit(format!(
                "Node {} is a child inside a detached subtree",
                new.0
            )));
        }
        let mut stack = vec![new];
        while let Some(id) = stack.pop() {
            let (left, right) = self.node(id).children();
            for child in left.into_iter().chain(right) {
                if self.arena.parents[child.0] != Some(id) {
                    return Err(SymregError::MalformedTree(format!(
                        "Node {} is not owned by its parent {}",
                        child.0, id.0
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Rebinds whichever slot of `parent` holds `old_child` to `new_child`.
    /// When `parent` is not the direct holder, its descendants are searched.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old_child: NodeId,
        new_child: NodeId,
    ) -> Result<()> {
        self.ensure_attached(parent)?;
        let holder = self.find_holder(parent, old_child).ok_or_else(|| {
            SymregError::InvalidEdit(format!(
                "Node {} is not below node {}",
                old_child.0, parent.0
            ))
        })?;
        self.ensure_insertable(old_child, new_child)?;
        self.rebind(Some(holder), old_child, new_child)
    }

    fn find_holder(&self, from: NodeId, child: NodeId) -> Option<NodeId> {
        let (left, right) = self.node(from).children();
        if left == Some(child) || right == Some(child) {
            return Some(from);
        }
        left.into_iter()
            .chain(right)
            .find_map(|c| self.find_holder(c, child))
    }

    /// Puts `new` where `target` is, including at the root.
    pub fn replace_node(&mut self, target: NodeId, new: NodeId) -> Result<()> {
        self.ensure_attached(target)?;
        if new == target {
            return Ok(());
        }
        self.ensure_insertable(target, new)?;
        let holder = self.arena.parents[target.0];
        self.rebind(holder, target, new)
    }

    fn rebind(&mut self, holder: Option<NodeId>, old: NodeId, new: NodeId) -> Result<()> {
        let depth = self.node(old).depth();
        match holder {
            None => self.root = new,
            Some(h) => match &mut self.arena.nodes[h.0] {
                Node::Operator { left, .. } if *left == old => *left = new,
                Node::Operator { right, .. } if *right == Some(old) => *right = Some(new),
                _ => {
                    return Err(SymregError::MalformedTree(format!(
                        "Node {} is recorded as parent of {} but does not hold it",
                        h.0, old.0
                    )))
                }
            },
        }
        self.arena.parents[new.0] = holder;
        self.arena.parents[old.0] = None;
        self.rebase_depths(new, depth);
        Ok(())
    }

    fn rebase_depths(&mut self, id: NodeId, depth: usize) {
        self.arena.nodes[id.0].set_depth(depth);
        let (left, right) = self.node(id).children();
        for child in left.into_iter().chain(right) {
            self.rebase_depths(child, depth + 1);
        }
    }

    /// Recomputes every reachable depth attribute from the root (depth 0).
    pub fn refresh_depths(&mut self) {
        self.rebase_depths(self.root, 0);
    }

    /// Copies a reachable subtree of `donor` into this arena, detached.
    pub fn graft(&mut self, donor: &ExprTree, donor_node: NodeId) -> Result<NodeId> {
        donor.ensure_attached(donor_node)?;
        Ok(copy_subtree(&donor.arena, donor_node, &mut self.arena, None))
    }

    /// Standalone copy of the subtree at `id`, rooted at depth 0.
    pub fn subtree(&self, id: NodeId) -> Result<ExprTree> {
        self.ensure_attached(id)?;
        let mut arena = Arena::new();
        let root = copy_subtree(&self.arena, id, &mut arena, Some(0));
        Ok(ExprTree {
            id: TreeId::fresh(),
            arena,
            root,
        })
    }

    pub fn set_operand(&mut self, id: NodeId, new_value: Operand) -> Result<()> {
        match self.arena.nodes.get_mut(id.0) {
            Some(Node::Operand { value, .. }) => {
                *value = new_value;
                Ok(())
            }
            _ => Err(SymregError::InvalidEdit(format!(
                "Node {} is not an operand",
                id.0
            ))),
        }
    }

    /// Changes an operator's symbol, keeping its children.
    pub fn set_op(&mut self, id: NodeId, new_op: Op) -> Result<()> {
        match self.arena.nodes.get_mut(id.0) {
            Some(Node::Operator { op, .. }) => {
                if op.arity() != new_op.arity() {
                    return Err(SymregError::ArityMismatch {
                        op: new_op.to_string(),
                        expected: new_op.arity(),
                        actual: op.arity(),
                    });
                }
                *op = new_op;
                Ok(())
            }
            _ => Err(SymregError::InvalidEdit(format!(
                "Node {} is not an operator",
                id.0
            ))),
        }
    }

    /// Drops unreachable slots. Handles issued before compaction are invalid
    /// afterwards; the tree keeps its identity.
    pub fn compact(&mut self) {
        let mut arena = Arena::with_capacity(self.len());
        self.root = copy_subtree(&self.arena, self.root, &mut arena, None);
        self.arena = arena;
    }

    /// Checks arity, parent links and exclusive ownership of every reachable node.
    pub fn validate(&self) -> Result<()> {
        if self.arena.parents.get(self.root.0) != Some(&None) {
            return Err(SymregError::MalformedTree(
                "Root node has a parent".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(SymregError::MalformedTree(format!(
                    "Node {} is reachable more than once",
                    id.0
                )));
            }
            let node = self.arena.get(id).ok_or_else(|| {
                SymregError::MalformedTree(format!("Dangling node handle {}", id.0))
            })?;
            if let Node::Operator { op, left, right, .. } = node {
                if op.is_binary() != right.is_some() {
                    return Err(SymregError::ArityMismatch {
                        op: op.to_string(),
                        expected: op.arity(),
                        actual: 1 + usize::from(right.is_some()),
                    });
                }
                for child in std::iter::once(*left).chain(*right) {
                    if self.arena.parents.get(child.0) != Some(&Some(id)) {
                        return Err(SymregError::MalformedTree(format!(
                            "Node {} does not record {} as its parent",
                            child.0, id.0
                        )));
                    }
                    stack.push(child);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ExprTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_node(self.root))
    }
}
