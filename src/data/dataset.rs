use crate::error::{Result, SymregError};

/// Input rows `X` with their targets `y`, fixed for the duration of a run.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    n_variables: usize,
}

impl Dataset {
    pub fn new(x: Vec<Vec<f64>>, y: Vec<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(SymregError::Dataset("Dataset has no rows".to_string()));
        }
        if x.len() != y.len() {
            return Err(SymregError::Dataset(format!(
                "Row count {} does not match target count {}",
                x.len(),
                y.len()
            )));
        }

        let n_variables = x[0].len();
        if n_variables == 0 {
            return Err(SymregError::Dataset(
                "Rows must contain at least one variable".to_string(),
            ));
        }
        if let Some((i, row)) = x.iter().enumerate().find(|(_, r)| r.len() != n_variables) {
            return Err(SymregError::Dataset(format!(
                "Row {} has {} values, expected {}",
                i,
                row.len(),
                n_variables
            )));
        }

        Ok(Self { x, y, n_variables })
    }

    /// Build a dataset whose targets are computed from each row.
    pub fn from_fn<F>(x: Vec<Vec<f64>>, f: F) -> Result<Self>
    where
        F: Fn(&[f64]) -> f64,
    {
        let y = x.iter().map(|row| f(row)).collect();
        Self::new(x, y)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.x[i]
    }

    pub fn target(&self, i: usize) -> f64 {
        self.y[i]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.x
    }

    pub fn targets(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn n_variables(&self) -> usize {
        self.n_variables
    }
}
