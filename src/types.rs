use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The two minimized objectives of an individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    /// Mean squared error over the dataset (>= 0, `INFINITY` when undefined).
    pub mse: f64,
    /// Total node count of the expression (>= 1).
    pub complexity: usize,
}

impl Objectives {
    pub fn new(mse: f64, complexity: usize) -> Self {
        Self { mse, complexity }
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.mse, self.complexity as f64]
    }

    /// Lexicographic order on (mse, complexity), used for ranking and elitism.
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        self.mse
            .partial_cmp(&other.mse)
            .unwrap_or(Ordering::Equal)
            .then(self.complexity.cmp(&other.complexity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_order() {
        let a = Objectives::new(0.5, 7);
        let b = Objectives::new(0.5, 3);
        let c = Objectives::new(0.1, 30);

        assert_eq!(a.lexicographic_cmp(&b), Ordering::Greater);
        assert_eq!(c.lexicographic_cmp(&b), Ordering::Less);
        assert_eq!(a.lexicographic_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_as_array() {
        assert_eq!(Objectives::new(2.5, 4).as_array(), [2.5, 4.0]);
    }
}
