//! classifier.rs – pretrained linear classifiers loaded from JSON model files

use std::path::Path;

use anyhow::{bail, ensure, Context};
use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::features::vector::FeatureVector;

/// A pretrained probabilistic classifier. Implementations are loaded once and
/// shared read-only across worker threads.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Probability per label, in the label order the model was trained with.
    fn distribution(&self, features: &FeatureVector) -> anyhow::Result<Vec<f64>>;
}

/// Model file layout. `weights` has one row per output: a single row is a
/// logistic model for the second label, several rows a softmax model.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearModelData {
    labels: Vec<String>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    means: Option<Vec<f64>>,
    #[serde(default)]
    stds: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    labels: Vec<String>,
    weights: Array2<f64>,
    bias: Array1<f64>,
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl LinearModel {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model {}", path.display()))?;
        let model = Self::from_json(&json)
            .with_context(|| format!("Failed to load model {}", path.display()))?;
        info!(
            "Loaded {}-label model with {} features from {}",
            model.labels.len(),
            model.dimension(),
            path.display()
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let data: LinearModelData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    fn from_data(data: LinearModelData) -> anyhow::Result<Self> {
        let rows = data.weights.len();
        ensure!(rows > 0, "model has no weight rows");
        ensure!(data.labels.len() >= 2, "model needs at least two labels");
        if rows == 1 {
            ensure!(data.labels.len() == 2, "a single weight row requires exactly two labels");
        } else {
            ensure!(
                rows == data.labels.len(),
                "{} weight rows for {} labels",
                rows,
                data.labels.len()
            );
        }
        ensure!(data.bias.len() == rows, "{} bias terms for {} weight rows", data.bias.len(), rows);

        let dimension = data.weights[0].len();
        if data.weights.iter().any(|row| row.len() != dimension) {
            bail!("weight rows differ in length");
        }
        let flat: Vec<f64> = data.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, dimension), flat)?;

        let means = match data.means {
            Some(m) => {
                ensure!(m.len() == dimension, "{} means for {} features", m.len(), dimension);
                Array1::from(m)
            }
            None => Array1::zeros(dimension),
        };
        let stds = match data.stds {
            Some(s) => {
                ensure!(s.len() == dimension, "{} stds for {} features", s.len(), dimension);
                Array1::from(s).mapv(|v| v.max(1e-9))
            }
            None => Array1::ones(dimension),
        };

        Ok(LinearModel {
            labels: data.labels,
            weights,
            bias: Array1::from(data.bias),
            means,
            stds,
        })
    }

    pub fn dimension(&self) -> usize {
        self.weights.ncols()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl ProbabilisticClassifier for LinearModel {
    fn distribution(&self, features: &FeatureVector) -> anyhow::Result<Vec<f64>> {
        if features.dimension() > self.dimension() {
            bail!(
                "feature vector has {} columns, model expects at most {}",
                features.dimension(),
                self.dimension()
            );
        }
        // columns the vector does not reach are zero
        let mut x = Array1::<f64>::zeros(self.dimension());
        for (i, v) in features.as_slice().iter().enumerate() {
            x[i] = *v;
        }
        let z = (&x - &self.means) / &self.stds;
        let scores = self.weights.dot(&z) + &self.bias;

        if scores.len() == 1 {
            let p = 1.0 / (1.0 + (-scores[0]).exp());
            return Ok(vec![1.0 - p, p]);
        }

        let max = scores.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let exp = scores.mapv(|s| (s - max).exp());
        let total = exp.sum();
        Ok(exp.iter().map(|e| e / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logistic_model_gives_two_probabilities() {
        let model = LinearModel::from_json(
            r#"{"labels": ["Non-TF", "TF"], "weights": [[2.0, 0.0, -1.0]], "bias": [-1.0]}"#,
        )
        .unwrap();
        let p = model.distribution(&FeatureVector::from_dense(vec![0.5, 0.0])).unwrap();
        // 2 * 0.5 - 1 = 0
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);

        let p = model.distribution(&FeatureVector::from_dense(vec![1.0, 0.0, 0.0])).unwrap();
        assert!(p[1] > p[0]);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn softmax_model_uses_standardization() {
        let model = LinearModel::from_json(
            r#"{"labels": ["a", "b", "c"],
                "weights": [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
                "bias": [0.0, 0.0, 0.0],
                "means": [1.0, 1.0],
                "stds": [0.5, 0.5]}"#,
        )
        .unwrap();
        let p = model.distribution(&FeatureVector::from_dense(vec![1.0, 2.0])).unwrap();
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // z = [0, 2] -> label b wins
        assert!(p[1] > p[0] && p[1] > p[2]);
        assert!((p[0] - p[2]).abs() < 1e-12);
    }

    #[test]
    fn rejects_oversized_vectors_and_bad_shapes() {
        let model = LinearModel::from_json(
            r#"{"labels": ["Non-TF", "TF"], "weights": [[1.0]], "bias": [0.0]}"#,
        )
        .unwrap();
        assert!(model.distribution(&FeatureVector::zeros(2)).is_err());

        assert!(LinearModel::from_json(
            r#"{"labels": ["a", "b", "c"], "weights": [[1.0], [1.0]], "bias": [0.0, 0.0]}"#
        )
        .is_err());
    }
}
