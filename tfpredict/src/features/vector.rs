use std::fmt::Write;

/// Fixed-length feature vector addressed by 1-based column, as in the
/// LIBSVM sparse format the classifiers were trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn zeros(dimension: usize) -> Self {
        FeatureVector {
            values: vec![0.0; dimension],
        }
    }

    #[cfg(test)]
    pub fn from_dense(values: Vec<f64>) -> Self {
        FeatureVector { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Value at a 1-based column; columns past the end read as 0.
    #[cfg(test)]
    pub fn get(&self, column: usize) -> f64 {
        column
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sets a 1-based column, growing the vector when needed.
    pub fn set(&mut self, column: usize, value: f64) {
        assert!(column > 0, "feature columns are 1-based");
        if column > self.values.len() {
            self.values.resize(column, 0.0);
        }
        self.values[column - 1] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Non-zero entries as (column, value).
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i + 1, *v))
    }

    /// Sparse LIBSVM rendering, e.g. `1:0.5 12:1`.
    pub fn to_libsvm(&self) -> String {
        let mut out = String::new();
        for (column, value) in self.nonzero() {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{column}:{value}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_one_based() {
        let mut v = FeatureVector::zeros(3);
        v.set(1, 0.25);
        v.set(5, 1.0);
        assert_eq!(v.dimension(), 5);
        assert_eq!(v.get(1), 0.25);
        assert_eq!(v.get(0), 0.0);
        assert_eq!(v.get(42), 0.0);
        assert_eq!(v.to_libsvm(), "1:0.25 5:1");
    }
}
