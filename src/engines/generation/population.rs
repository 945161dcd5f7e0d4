use crate::engines::expression::ExprTree;
use std::collections::HashSet;

/// Canonical string used for deduplication.
pub fn canonical_string(tree: &ExprTree) -> String {
    tree.to_string()
}

/// Keeps the first individual of every canonical form, in order.
/// The result may be shorter than the input; callers refill it.
pub fn deduplicate(population: Vec<ExprTree>) -> Vec<ExprTree> {
    let mut seen_signatures = HashSet::with_capacity(population.len());
    population
        .into_iter()
        .filter(|tree| seen_signatures.insert(canonical_string(tree)))
        .collect()
}
