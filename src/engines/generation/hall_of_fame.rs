use crate::engines::expression::ExprTree;
use crate::engines::generation::pareto;
use crate::engines::generation::population::canonical_string;
use crate::types::Objectives;

use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct EliteExpression {
    pub expression: ExprTree,
    pub objectives: Objectives,
    pub canonical_string: String, // For deduplication
    pub pareto_rank: usize,       // Pareto frontier rank (0 = best)
    pub crowding_distance: f64,   // Diversity measure
    pub generation: usize,        // Generation in which it was first archived
}

impl EliteExpression {
    pub fn new(expression: ExprTree, objectives: Objectives, generation: usize) -> Self {
        let canonical_string = canonical_string(&expression);
        Self {
            expression,
            objectives,
            canonical_string,
            pareto_rank: 0,
            crowding_distance: 0.0,
            generation,
        }
    }
}

/// Bounded archive of distinct expressions, ordered by Pareto rank and then
/// by crowding distance.
pub struct HallOfFame {
    expressions: Vec<EliteExpression>,
    max_size: usize,
    seen_signatures: HashSet<String>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            expressions: Vec::new(),
            max_size,
            seen_signatures: HashSet::new(),
        }
    }

    /// Attempt to add an expression to the Hall of Fame
    pub fn try_add(&mut self, elite: EliteExpression) -> bool {
        if self.seen_signatures.contains(&elite.canonical_string) {
            return false; // Duplicate, reject
        }

        self.seen_signatures.insert(elite.canonical_string.clone());
        self.expressions.push(elite);
        self.sort_and_trim();
        true
    }

    /// Archives the non-dominated members of one evaluated generation.
    /// Returns how many were new.
    pub fn update(
        &mut self,
        population: &[ExprTree],
        objectives: &[Objectives],
        generation: usize,
    ) -> usize {
        let all: Vec<usize> = (0..population.len().min(objectives.len())).collect();
        pareto::pareto_front_indices(&all, objectives)
            .into_iter()
            .filter(|&i| objectives[i].mse.is_finite())
            .filter(|&i| {
                self.try_add(EliteExpression::new(
                    population[i].clone(),
                    objectives[i],
                    generation,
                ))
            })
            .count()
    }

    fn sort_and_trim(&mut self) {
        let objectives: Vec<Objectives> = self.expressions.iter().map(|e| e.objectives).collect();
        let fronts = pareto::non_dominated_fronts(&objectives);

        for (rank, front) in fronts.iter().enumerate() {
            let distances = pareto::crowding_distances(front, &objectives);
            for (&idx, distance) in front.iter().zip(distances) {
                self.expressions[idx].pareto_rank = rank;
                self.expressions[idx].crowding_distance = distance;
            }
        }

        // Sort by rank, then by crowding distance (descending)
        self.expressions.sort_by(|a, b| match a.pareto_rank.cmp(&b.pareto_rank) {
            std::cmp::Ordering::Equal => b
                .crowding_distance
                .partial_cmp(&a.crowding_distance)
                .unwrap_or(std::cmp::Ordering::Equal),
            other => other,
        });

        while self.expressions.len() > self.max_size {
            if let Some(removed) = self.expressions.pop() {
                self.seen_signatures.remove(&removed.canonical_string);
            }
        }
    }

    pub fn get_all(&self) -> &[EliteExpression] {
        &self.expressions
    }

    pub fn get_top_n(&self, n: usize) -> &[EliteExpression] {
        &self.expressions[..n.min(self.expressions.len())]
    }

    /// Lowest error, ties broken by lower complexity.
    pub fn best_by_error(&self) -> Option<&EliteExpression> {
        self.expressions
            .iter()
            .min_by(|a, b| a.objectives.lexicographic_cmp(&b.objectives))
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}
