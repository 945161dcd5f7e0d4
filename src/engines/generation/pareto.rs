//! Pareto utilities for the (mse, complexity) objective pair.
//! Implements NSGA-II style non-dominated sorting and crowding distance;
//! both objectives are minimized.

use crate::types::Objectives;
use std::cmp::Ordering;

/// Below this objective range a dimension contributes no crowding distance.
const RANGE_EPSILON: f64 = 1e-10;

/// Check if `a` dominates `b`: no worse on both objectives and strictly
/// better on at least one.
pub fn dominates(a: &Objectives, b: &Objectives) -> bool {
    let a_values = a.as_array();
    let b_values = b.as_array();

    let mut at_least_one_better = false;
    for (a_val, b_val) in a_values.iter().zip(b_values.iter()) {
        if b_val < a_val {
            return false;
        }
        if a_val < b_val {
            at_least_one_better = true;
        }
    }
    at_least_one_better
}

/// Indices of the members of `candidates` not dominated by any other
/// member (all-pairs scan).
pub fn pareto_front_indices(candidates: &[usize], objectives: &[Objectives]) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&i| {
            !candidates
                .iter()
                .any(|&j| j != i && dominates(&objectives[j], &objectives[i]))
        })
        .collect()
}

/// Members of `population` not dominated by any other member.
/// `objectives[i]` belongs to `population[i]`.
pub fn pareto_front<'a, T>(population: &'a [T], objectives: &[Objectives]) -> Vec<&'a T> {
    let all: Vec<usize> = (0..population.len().min(objectives.len())).collect();
    pareto_front_indices(&all, objectives)
        .into_iter()
        .map(|i| &population[i])
        .collect()
}

/// Fast non-dominated sorting.
/// Returns indices grouped by front (0 = non-dominated, 1 = non-dominated
/// once front 0 is removed, and so on). Order within a front follows index order.
pub fn non_dominated_fronts(objectives: &[Objectives]) -> Vec<Vec<usize>> {
    let n = objectives.len();

    // domination_count[i]: how many individuals dominate i
    // dominated_solutions[i]: individuals that i dominates
    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&objectives[i], &objectives[j]) {
                dominated_solutions[i].push(j);
            } else if dominates(&objectives[j], &objectives[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            first_front.push(i);
        }
    }

    let mut fronts = Vec::new();
    if first_front.is_empty() {
        return fronts;
    }
    fronts.push(first_front);

    let mut front_index = 0;
    while front_index < fronts.len() {
        let mut next_front = Vec::new();
        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        if !next_front.is_empty() {
            next_front.sort_unstable();
            fronts.push(next_front);
        }
        front_index += 1;
    }

    fronts
}

/// Crowding distance of each member of `front`, in the order of `front`.
/// Extremes of every objective get `INFINITY`; interior members sum the
/// range-normalized gap between their neighbours.
pub fn crowding_distances(front: &[usize], objectives: &[Objectives]) -> Vec<f64> {
    let front_size = front.len();
    if front_size <= 2 {
        return vec![f64::INFINITY; front_size];
    }

    let mut distances = vec![0.0; front_size];
    for dim in 0..2 {
        let value = |pos: usize| objectives[front[pos]].as_array()[dim];

        // Positions into `front`, sorted by this objective
        let mut sorted: Vec<usize> = (0..front_size).collect();
        sorted.sort_by(|&a, &b| value(a).partial_cmp(&value(b)).unwrap_or(Ordering::Equal));

        distances[sorted[0]] = f64::INFINITY;
        distances[sorted[front_size - 1]] = f64::INFINITY;

        let range = value(sorted[front_size - 1]) - value(sorted[0]);
        if !range.is_finite() || range.abs() < RANGE_EPSILON {
            continue;
        }

        for k in 1..(front_size - 1) {
            let gap = value(sorted[k + 1]) - value(sorted[k - 1]);
            distances[sorted[k]] += gap / range;
        }
    }
    distances
}

/// The `count` members of `front` with the largest crowding distance.
/// Ties keep their order in `front`.
pub fn crowding_distance_selection(
    front: &[usize],
    objectives: &[Objectives],
    count: usize,
) -> Vec<usize> {
    let distances = crowding_distances(front, objectives);
    let mut order: Vec<usize> = (0..front.len()).collect();
    order.sort_by(|&a, &b| {
        distances[b]
            .partial_cmp(&distances[a])
            .unwrap_or(Ordering::Equal)
    });
    order.into_iter().take(count).map(|pos| front[pos]).collect()
}

/// Fills a breeding pool of up to `pool_size` indices front by front; the
/// first front that does not fit is cut down by crowding distance.
pub fn multi_objective_selection(objectives: &[Objectives], pool_size: usize) -> Vec<usize> {
    let mut selected = Vec::with_capacity(pool_size.min(objectives.len()));
    for front in non_dominated_fronts(objectives) {
        if selected.len() >= pool_size {
            break;
        }
        let remaining = pool_size - selected.len();
        if front.len() <= remaining {
            selected.extend(front);
        } else {
            selected.extend(crowding_distance_selection(&front, objectives, remaining));
            break;
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(mse: f64, complexity: usize) -> Objectives {
        Objectives::new(mse, complexity)
    }

    #[test]
    fn test_dominance() {
        // Better in both objectives
        assert!(dominates(&obj(1.0, 3), &obj(2.0, 5)));
        // Better in one, equal in other
        assert!(dominates(&obj(1.0, 5), &obj(2.0, 5)));
        assert!(dominates(&obj(1.0, 3), &obj(1.0, 5)));
        // Trade-off - no dominance either way
        assert!(!dominates(&obj(1.0, 9), &obj(2.0, 3)));
        assert!(!dominates(&obj(2.0, 3), &obj(1.0, 9)));
        // Equal - no dominance
        assert!(!dominates(&obj(1.0, 3), &obj(1.0, 3)));
    }

    #[test]
    fn test_infinite_error_is_dominated() {
        assert!(dominates(&obj(0.5, 3), &obj(f64::INFINITY, 3)));
        assert!(!dominates(&obj(f64::INFINITY, 1), &obj(0.5, 3)));
    }

    #[test]
    fn test_pareto_front() {
        let names = ["a", "b", "c", "d", "e"];
        let objectives = vec![
            obj(1.0, 9), // front
            obj(3.0, 5), // front
            obj(5.0, 1), // front
            obj(4.0, 6), // dominated by b
            obj(6.0, 9), // dominated by everyone
        ];
        let front = pareto_front(&names, &objectives);
        assert_eq!(front, vec![&"a", &"b", &"c"]);
    }

    #[test]
    fn test_non_dominated_fronts() {
        let objectives = vec![
            obj(1.0, 5), // Front 0
            obj(3.0, 3), // Front 0
            obj(5.0, 1), // Front 0
            obj(4.0, 4), // Front 1
            obj(5.0, 5), // Front 2
        ];

        let fronts = non_dominated_fronts(&objectives);
        assert_eq!(fronts, vec![vec![0, 1, 2], vec![3], vec![4]]);
    }

    #[test]
    fn test_crowding_distance() {
        let objectives = vec![obj(1.0, 9), obj(2.0, 5), obj(3.0, 4), obj(8.0, 1)];
        let front = vec![0, 1, 2, 3];
        let distances = crowding_distances(&front, &objectives);

        assert!(distances[0].is_infinite());
        assert!(distances[3].is_infinite());
        // b: (3 - 1) / 7 + (9 - 4) / 8
        assert!((distances[1] - (2.0 / 7.0 + 5.0 / 8.0)).abs() < 1e-12);
        // c: (8 - 2) / 7 + (5 - 1) / 8
        assert!((distances[2] - (6.0 / 7.0 + 4.0 / 8.0)).abs() < 1e-12);
    }

    #[test]
    fn test_crowding_selection_keeps_extremes() {
        let objectives = vec![obj(1.0, 9), obj(2.0, 5), obj(3.0, 4), obj(8.0, 1)];
        let front = vec![0, 1, 2, 3];
        let chosen = crowding_distance_selection(&front, &objectives, 3);
        assert_eq!(chosen, vec![0, 3, 2]);
    }

    #[test]
    fn test_flat_dimension_is_skipped() {
        let objectives = vec![obj(1.0, 4), obj(1.0, 4), obj(1.0, 4)];
        let distances = crowding_distances(&[0, 1, 2], &objectives);
        assert_eq!(distances[1], 0.0);
        assert!(distances[0].is_infinite());
    }

    #[test]
    fn test_multi_objective_selection_fills_by_front() {
        let objectives = vec![
            obj(1.0, 5),
            obj(3.0, 3),
            obj(5.0, 1),
            obj(4.0, 4),
            obj(5.0, 5),
        ];
        assert_eq!(multi_objective_selection(&objectives, 4), vec![0, 1, 2, 3]);
        assert_eq!(multi_objective_selection(&objectives, 10).len(), 5);

        let pool = multi_objective_selection(&objectives, 2);
        assert_eq!(pool.len(), 2);
        // Both extremes of front 0 survive the cut.
        assert!(pool.contains(&0) && pool.contains(&2));
    }

    #[test]
    fn test_empty_population() {
        assert!(non_dominated_fronts(&[]).is_empty());
        assert!(multi_objective_selection(&[], 5).is_empty());
    }
}
