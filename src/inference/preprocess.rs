//! Preprocessing - categorical encoding and numeric scaling
//!
//! Mirrors what the training pipeline did: label-encode the categorical
//! columns, then standard-scale every column of the task's schema.

use std::collections::BTreeMap;

use ndarray::Array1;
use serde::Deserialize;

use super::{ArtifactError, FeatureRecord, FeatureValue, PredictError, Task};
use crate::models::request::{is_categorical, is_known_feature};

/// Label encoder: code = position of the value in the sorted class list
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn encode(&self, value: &str) -> Option<f64> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|code| code as f64)
    }
}

/// Per-feature standardization fitted at training time
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn apply(&self, index: usize, value: f64) -> f64 {
        let scale = self.scale[index];
        // Constant columns were fitted with a zero scale
        let scale = if scale == 0.0 { 1.0 } else { scale };
        (value - self.mean[index]) / scale
    }
}

/// Scaled, ordered model input for one task
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeatureVector {
    pub task: Task,
    values: Array1<f64>,
}

impl NormalizedFeatureVector {
    pub fn new(task: Task, values: Array1<f64>) -> Self {
        Self { task, values }
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Feature schema, scaler and encoders of one task
#[derive(Debug, Clone)]
pub struct TaskArtifacts {
    task: Task,
    features: Vec<String>,
    scaler: StandardScaler,
    encoders: BTreeMap<String, LabelEncoder>,
}

impl TaskArtifacts {
    /// Assemble and cross-check the preprocessing artifacts of a task
    pub fn new(
        task: Task,
        features: Vec<String>,
        scaler: StandardScaler,
        encoders: BTreeMap<String, LabelEncoder>,
    ) -> Result<Self, ArtifactError> {
        if features.is_empty() {
            return Err(ArtifactError::Schema(format!("{} feature list is empty", task)));
        }

        if let Some(unknown) = features.iter().find(|f| !is_known_feature(f)) {
            return Err(ArtifactError::Schema(format!(
                "{} feature '{}' cannot be built from a request",
                task, unknown
            )));
        }

        if let Some(unencoded) = features
            .iter()
            .find(|f| is_categorical(f) && !encoders.contains_key(f.as_str()))
        {
            return Err(ArtifactError::Schema(format!(
                "{} feature '{}' has no encoder",
                task, unencoded
            )));
        }

        if scaler.mean.len() != features.len() || scaler.scale.len() != features.len() {
            return Err(ArtifactError::Schema(format!(
                "{} scaler covers {}/{} columns but the schema has {}",
                task,
                scaler.mean.len(),
                scaler.scale.len(),
                features.len()
            )));
        }

        if scaler.mean.iter().chain(scaler.scale.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Schema(format!(
                "{} scaler has non-finite parameters",
                task
            )));
        }

        Ok(Self {
            task,
            features,
            scaler,
            encoders,
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Encode and scale a record in schema order
    pub fn transform(&self, record: &FeatureRecord) -> Result<NormalizedFeatureVector, PredictError> {
        let mut values = Array1::<f64>::zeros(self.features.len());

        for (i, name) in self.features.iter().enumerate() {
            let raw = match record.get(name.as_str()) {
                Some(FeatureValue::Numeric(v)) => *v,
                Some(FeatureValue::Categorical(value)) => self.encode(name, value)?,
                None => {
                    return Err(PredictError::Inference(format!(
                        "{} feature '{}' missing from record",
                        self.task, name
                    )))
                }
            };
            values[i] = self.scaler.apply(i, raw);
        }

        Ok(NormalizedFeatureVector::new(self.task, values))
    }

    fn encode(&self, name: &str, value: &str) -> Result<f64, PredictError> {
        let encoder = self.encoders.get(name).ok_or_else(|| {
            PredictError::Inference(format!("{} feature '{}' has no encoder", self.task, name))
        })?;

        encoder
            .encode(value)
            .ok_or_else(|| PredictError::UnknownCategory {
                field: name.to_string(),
                value: value.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> TaskArtifacts {
        let mut encoders = BTreeMap::new();
        encoders.insert(
            "Soil_Type".to_string(),
            LabelEncoder::new(vec!["Clay".into(), "Loamy".into(), "Sandy".into()]),
        );

        TaskArtifacts::new(
            Task::Regression,
            vec!["Latitude".into(), "Soil_Type".into(), "Slope_Degree".into()],
            StandardScaler {
                mean: vec![10.0, 1.0, 5.0],
                scale: vec![2.0, 1.0, 0.0],
            },
            encoders,
        )
        .unwrap()
    }

    fn record(soil: &str) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        record.insert("Latitude", FeatureValue::Numeric(14.0));
        record.insert("Soil_Type", FeatureValue::Categorical(soil.to_string()));
        record.insert("Slope_Degree", FeatureValue::Numeric(7.5));
        record.insert("Elevation_m", FeatureValue::Numeric(100.0));
        record
    }

    #[test]
    fn test_label_encoder() {
        let encoder = LabelEncoder::new(vec!["Forest".into(), "Wetland".into()]);
        assert_eq!(encoder.encode("Forest"), Some(0.0));
        assert_eq!(encoder.encode("Wetland"), Some(1.0));
        assert_eq!(encoder.encode("Desert"), None);
    }

    #[test]
    fn test_transform_encodes_and_scales_in_order() {
        let vector = artifacts().transform(&record("Sandy")).unwrap();

        assert_eq!(vector.task, Task::Regression);
        assert_eq!(vector.len(), 3);
        assert_eq!(vector.values()[0], 2.0); // (14 - 10) / 2
        assert_eq!(vector.values()[1], 1.0); // Sandy = 2, (2 - 1) / 1
        assert_eq!(vector.values()[2], 2.5); // zero scale treated as 1
    }

    #[test]
    fn test_unseen_category_is_encoding_error() {
        let err = artifacts().transform(&record("Volcanic")).unwrap_err();
        assert_eq!(
            err,
            PredictError::UnknownCategory {
                field: "Soil_Type".to_string(),
                value: "Volcanic".to_string(),
            }
        );
    }

    #[test]
    fn test_scaler_length_mismatch_rejected() {
        let result = TaskArtifacts::new(
            Task::Classification,
            vec!["Latitude".into(), "Longitude".into()],
            StandardScaler {
                mean: vec![0.0],
                scale: vec![1.0],
            },
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(ArtifactError::Schema(_))));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let result = TaskArtifacts::new(
            Task::Regression,
            vec!["Moon_Phase".into()],
            StandardScaler {
                mean: vec![0.0],
                scale: vec![1.0],
            },
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(ArtifactError::Schema(msg)) if msg.contains("Moon_Phase")));
    }

    #[test]
    fn test_categorical_without_encoder_rejected() {
        let result = TaskArtifacts::new(
            Task::Regression,
            vec!["Country".into()],
            StandardScaler {
                mean: vec![0.0],
                scale: vec![1.0],
            },
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(ArtifactError::Schema(msg)) if msg.contains("Country")));
    }
}
