//! Model Store - loads the trained artifacts once at startup
//!
//! Everything here is read-only after construction; handlers share the
//! store through an `Arc` in the application state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{
    Classifier, LabelEncoder, LinearRegressor, LogisticClassifier, Regressor, RiskCategory,
    StandardScaler, Task, TaskArtifacts,
};

pub const REGRESSION_MODEL_FILE: &str = "best_regression_model_linear.json";
pub const CLASSIFICATION_MODEL_FILE: &str = "best_classification_model_logistic.json";

/// Every artifact expected in the model directory
pub const ARTIFACT_FILES: [&str; 6] = [
    REGRESSION_MODEL_FILE,
    CLASSIFICATION_MODEL_FILE,
    "regression_scaler.json",
    "classification_scaler.json",
    "regression_encoders.json",
    "classification_encoders.json",
];

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Missing model files: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent model artifacts: {0}")]
    Schema(String),
}

/// Where the store came from, for the health report
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    /// SHA-256 of each artifact file
    pub digests: BTreeMap<String, String>,
}

pub struct ModelStore {
    regression: TaskArtifacts,
    classification: TaskArtifacts,
    regressor: Box<dyn Regressor>,
    classifier: Box<dyn Classifier>,
    info: StoreInfo,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("regression_features", &self.regression.features().len())
            .field("classification_features", &self.classification.features().len())
            .field("source", &self.info.source)
            .finish()
    }
}

impl ModelStore {
    /// Assemble a store, checking that each model matches its schema
    pub fn from_parts(
        regression: TaskArtifacts,
        classification: TaskArtifacts,
        regressor: Box<dyn Regressor>,
        classifier: Box<dyn Classifier>,
        info: StoreInfo,
    ) -> Result<Self, ArtifactError> {
        if regressor.n_features() != regression.features().len() {
            return Err(ArtifactError::Schema(format!(
                "regression model takes {} features but the schema has {}",
                regressor.n_features(),
                regression.features().len()
            )));
        }

        if classifier.n_features() != classification.features().len() {
            return Err(ArtifactError::Schema(format!(
                "classification model takes {} features but the schema has {}",
                classifier.n_features(),
                classification.features().len()
            )));
        }

        let mut classes = classifier.classes().to_vec();
        classes.sort();
        if classes != RiskCategory::ALL {
            return Err(ArtifactError::Schema(format!(
                "classifier classes {:?} are not exactly Low, Medium, High",
                classifier.classes()
            )));
        }

        Ok(Self {
            regression,
            classification,
            regressor,
            classifier,
            info,
        })
    }

    /// Load all artifacts from `model_dir` plus the feature schema file
    pub fn load(model_dir: &Path, feature_names_path: &Path) -> Result<Self, ArtifactError> {
        tracing::info!("Loading model artifacts from {}", model_dir.display());

        let mut missing: Vec<String> = ARTIFACT_FILES
            .iter()
            .filter(|name| !model_dir.join(name).is_file())
            .map(|name| name.to_string())
            .collect();
        if !feature_names_path.is_file() {
            missing.push(feature_names_path.display().to_string());
        }
        if !missing.is_empty() {
            return Err(ArtifactError::Missing(missing));
        }

        let mut digests = BTreeMap::new();
        let mut read = |path: PathBuf| -> Result<(PathBuf, Vec<u8>), ArtifactError> {
            let bytes = std::fs::read(&path).map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
            let digest = format!("{:x}", Sha256::digest(&bytes));
            tracing::debug!("{} ({} bytes, sha256 {})", path.display(), bytes.len(), digest);

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            digests.insert(name, digest);
            Ok((path, bytes))
        };

        let (path, bytes) = read(feature_names_path.to_path_buf())?;
        let mut feature_names: BTreeMap<String, Vec<String>> = parse(&path, &bytes)?;

        let mut tasks = Vec::with_capacity(Task::ALL.len());
        for task in Task::ALL {
            let features = feature_names.remove(task.features_key()).ok_or_else(|| {
                ArtifactError::Schema(format!(
                    "{} has no '{}' entry",
                    feature_names_path.display(),
                    task.features_key()
                ))
            })?;

            let (path, bytes) = read(model_dir.join(format!("{}_scaler.json", task)))?;
            let scaler: StandardScaler = parse(&path, &bytes)?;

            let (path, bytes) = read(model_dir.join(format!("{}_encoders.json", task)))?;
            let encoders: BTreeMap<String, LabelEncoder> = parse(&path, &bytes)?;

            tasks.push(TaskArtifacts::new(task, features, scaler, encoders)?);
        }
        let classification = tasks.pop().ok_or_else(|| ArtifactError::Schema("no tasks".into()))?;
        let regression = tasks.pop().ok_or_else(|| ArtifactError::Schema("no tasks".into()))?;

        let (path, bytes) = read(model_dir.join(REGRESSION_MODEL_FILE))?;
        let regressor = LinearRegressor::from_json(&bytes)
            .map_err(|source| ArtifactError::Parse { path, source })?;

        let (path, bytes) = read(model_dir.join(CLASSIFICATION_MODEL_FILE))?;
        let classifier = LogisticClassifier::from_json(&bytes)
            .map_err(|source| ArtifactError::Parse { path, source })?;

        let info = StoreInfo {
            source: model_dir.display().to_string(),
            loaded_at: Utc::now(),
            digests,
        };

        let store = Self::from_parts(
            regression,
            classification,
            Box::new(regressor),
            Box::new(classifier),
            info,
        )?;

        tracing::info!(
            "Model artifacts loaded: {} regression / {} classification features",
            store.regression.features().len(),
            store.classification.features().len()
        );

        Ok(store)
    }

    pub fn regression(&self) -> &TaskArtifacts {
        &self.regression
    }

    pub fn classification(&self) -> &TaskArtifacts {
        &self.classification
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn info(&self) -> &StoreInfo {
        &self.info
    }
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
