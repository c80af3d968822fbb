//! Inference Module - model store, preprocessing and prediction dispatch
//!
//! The store is loaded once at startup and shared read-only; every
//! prediction is a pure function of the request and the store.

pub mod dispatcher;
pub mod linear;
pub mod preprocess;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

use std::collections::BTreeMap;
use thiserror::Error;

// Re-export common types
pub use dispatcher::{predict, PredictionResult, RiskCategory};
pub use linear::{Classifier, LinearRegressor, LogisticClassifier, Regressor};
pub use preprocess::{LabelEncoder, NormalizedFeatureVector, StandardScaler, TaskArtifacts};
pub use store::{ArtifactError, ModelStore};

/// Which of the two models a feature vector is prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Task {
    Regression,
    Classification,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Regression, Task::Classification];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Regression => "regression",
            Task::Classification => "classification",
        }
    }

    /// Key of this task's schema in `feature_names.json`
    pub fn features_key(&self) -> &'static str {
        match self {
            Task::Regression => "regression_features",
            Task::Classification => "classification_features",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named model input before encoding/scaling
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

/// Named model inputs for one request
pub type FeatureRecord = BTreeMap<&'static str, FeatureValue>;

/// Errors raised while turning a request into a prediction
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Categorical value the encoders were never fitted on
    #[error("Unknown value '{value}' for field '{field}'")]
    UnknownCategory { field: String, value: String },

    #[error("Inference failed: {0}")]
    Inference(String),
}
