pub mod ops;
pub mod tree;

pub use ops::{Op, OpFn};
pub use tree::{Arena, ExprTree, Node, NodeId, Operand, TreeId};
