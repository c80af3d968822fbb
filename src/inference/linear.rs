//! Linear models - regression score and multinomial logistic classifier
//!
//! Both models are exported by the training pipeline as plain coefficient
//! files, so inference is a dot product (plus softmax for the classifier).

use ndarray::{Array1, Array2};
use serde::Deserialize;

use super::{ArtifactError, NormalizedFeatureVector, PredictError, RiskCategory};

/// Trait for score models
pub trait Regressor: Send + Sync {
    fn n_features(&self) -> usize;
    fn predict(&self, features: &NormalizedFeatureVector) -> Result<f64, PredictError>;
}

/// Trait for probabilistic classifiers over the flood risk categories
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Category of each probability returned by `predict_proba`, in order
    fn classes(&self) -> &[RiskCategory];

    fn predict_proba(&self, features: &NormalizedFeatureVector) -> Result<Array1<f64>, PredictError>;
}

fn check_dimension(expected: usize, features: &NormalizedFeatureVector) -> Result<(), PredictError> {
    if features.len() != expected {
        return Err(PredictError::Inference(format!(
            "{} model expects {} features, got {}",
            features.task,
            expected,
            features.len()
        )));
    }
    Ok(())
}

// ============================================================================
// LINEAR REGRESSION
// ============================================================================

#[derive(Debug, Deserialize)]
struct LinearRegressionFile {
    coef: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coef: Array1<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Result<Self, ArtifactError> {
        if coef.is_empty() {
            return Err(ArtifactError::Schema("regression model has no coefficients".into()));
        }
        if coef.iter().any(|c| !c.is_finite()) || !intercept.is_finite() {
            return Err(ArtifactError::Schema(
                "regression model has non-finite coefficients".into(),
            ));
        }

        Ok(Self {
            coef: Array1::from(coef),
            intercept,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let file: LinearRegressionFile = serde_json::from_slice(bytes)?;
        Self::new(file.coef, file.intercept).map_err(serde::de::Error::custom)
    }
}

impl Regressor for LinearRegressor {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, features: &NormalizedFeatureVector) -> Result<f64, PredictError> {
        check_dimension(self.coef.len(), features)?;
        Ok(self.coef.dot(features.values()) + self.intercept)
    }
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

#[derive(Debug, Deserialize)]
struct LogisticRegressionFile {
    classes: Vec<usize>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

/// Multinomial logistic regression, one coefficient row per class
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    classes: Vec<RiskCategory>,
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

impl LogisticClassifier {
    pub fn new(
        classes: Vec<RiskCategory>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> Result<Self, ArtifactError> {
        let rows = coef.len();
        let cols = coef.first().map(Vec::len).unwrap_or(0);

        if rows == 0 || cols == 0 {
            return Err(ArtifactError::Schema("classification model has no coefficients".into()));
        }
        if coef.iter().any(|row| row.len() != cols) {
            return Err(ArtifactError::Schema(
                "classification coefficient rows differ in length".into(),
            ));
        }

        if rows != classes.len() {
            return Err(ArtifactError::Schema(format!(
                "classification model has {} coefficient rows for {} classes",
                rows,
                classes.len()
            )));
        }
        if intercept.len() != rows {
            return Err(ArtifactError::Schema(format!(
                "classification model has {} intercepts for {} coefficient rows",
                intercept.len(),
                rows
            )));
        }

        let flat: Vec<f64> = coef.into_iter().flatten().collect();
        if flat.iter().chain(intercept.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Schema(
                "classification model has non-finite coefficients".into(),
            ));
        }

        let coef = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| ArtifactError::Schema(format!("classification coefficients: {}", e)))?;

        Ok(Self {
            classes,
            coef,
            intercept: Array1::from(intercept),
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let file: LogisticRegressionFile = serde_json::from_slice(bytes)?;

        let classes = file
            .classes
            .iter()
            .map(|&label| {
                RiskCategory::from_index(label).ok_or_else(|| {
                    serde::de::Error::custom(format!("class label {} is not a risk category", label))
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Self::new(classes, file.coef, file.intercept).map_err(serde::de::Error::custom)
    }
}

impl Classifier for LogisticClassifier {
    fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    fn classes(&self) -> &[RiskCategory] {
        &self.classes
    }

    fn predict_proba(&self, features: &NormalizedFeatureVector) -> Result<Array1<f64>, PredictError> {
        check_dimension(self.coef.ncols(), features)?;

        let logits = self.coef.dot(features.values()) + &self.intercept;
        Ok(softmax(&logits))
    }
}

fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}
