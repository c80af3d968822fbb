//! Small trained-model fixtures shared by the unit tests

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use super::store::{StoreInfo, CLASSIFICATION_MODEL_FILE, REGRESSION_MODEL_FILE};
use ndarray::Array1;

use super::{
    Classifier, LabelEncoder, LinearRegressor, LogisticClassifier, ModelStore,
    NormalizedFeatureVector, PredictError, Regressor, RiskCategory, StandardScaler, Task,
    TaskArtifacts,
};

pub const REGRESSION_FEATURES: [&str; 16] = [
    "Latitude",
    "Longitude",
    "Vegetation_Type",
    "Biodiversity_Index",
    "Protected_Area_Status",
    "Elevation_m",
    "Slope_Degree",
    "Soil_Type",
    "Air_Quality_Index",
    "Average_Temperature_C",
    "Tourist_Attractions",
    "Accessibility_Score",
    "Tourist_Capacity_Limit",
    "Country",
    "Annual_Rainfall_mm",
    "Human_Activity_Index",
];

pub const CLASSIFICATION_FEATURES: [&str; 16] = [
    "Latitude",
    "Longitude",
    "Vegetation_Type",
    "Biodiversity_Index",
    "Protected_Area_Status",
    "Elevation_m",
    "Slope_Degree",
    "Soil_Type",
    "Air_Quality_Index",
    "Average_Temperature_C",
    "Tourist_Attractions",
    "Accessibility_Score",
    "Tourist_Capacity_Limit",
    "Climate_Risk_Score",
    "Annual_Rainfall_mm",
    "Soil_Erosion_Risk",
];

fn vegetation() -> Value {
    json!(["Forest", "Grassland", "Mountain", "Wetland"])
}

fn soil() -> Value {
    json!(["Clay", "Loamy", "Peaty", "Sandy", "Silty"])
}

fn countries() -> Value {
    json!(["Australia", "Brazil", "Canada", "China", "India", "Kenya", "Norway", "USA"])
}

/// Artifact file name -> content, as the training pipeline exports them
pub fn artifact_files() -> Vec<(&'static str, Value)> {
    vec![
        (
            "feature_names.json",
            json!({
                "regression_features": REGRESSION_FEATURES,
                "classification_features": CLASSIFICATION_FEATURES,
            }),
        ),
        (
            "regression_scaler.json",
            json!({
                "mean": [10.0, 0.0, 1.5, 0.5, 0.5, 1500.0, 20.0, 2.0, 100.0, 18.0, 25.0, 0.5, 5000.0, 4.0, 1200.0, 0.5],
                "scale": [35.0, 100.0, 1.1, 0.29, 0.5, 1200.0, 12.0, 1.4, 60.0, 9.0, 14.0, 0.29, 2900.0, 2.6, 700.0, 0.29],
            }),
        ),
        (
            "classification_scaler.json",
            json!({
                "mean": [10.0, 0.0, 1.5, 0.5, 0.5, 1500.0, 20.0, 2.0, 100.0, 18.0, 25.0, 0.5, 5000.0, 0.5, 1200.0, 0.5],
                "scale": [35.0, 100.0, 1.1, 0.29, 0.5, 1200.0, 12.0, 1.4, 60.0, 9.0, 14.0, 0.29, 2900.0, 0.29, 700.0, 0.29],
            }),
        ),
        (
            "regression_encoders.json",
            json!({
                "Vegetation_Type": vegetation(),
                "Soil_Type": soil(),
                "Country": countries(),
            }),
        ),
        (
            "classification_encoders.json",
            json!({
                "Vegetation_Type": vegetation(),
                "Soil_Type": soil(),
            }),
        ),
        (
            REGRESSION_MODEL_FILE,
            json!({
                "coef": [0.01, -0.005, 0.02, -0.03, -0.04, -0.05, 0.03, 0.01, 0.04, 0.05, 0.01, -0.01, 0.02, 0.0, 0.06, 0.03],
                "intercept": 0.45,
            }),
        ),
        (
            CLASSIFICATION_MODEL_FILE,
            json!({
                "classes": [0, 1, 2],
                "coef": [
                    [0.1, 0.0, -0.2, 0.1, 0.3, 0.4, -0.1, 0.0, -0.1, -0.2, 0.0, 0.1, 0.0, -0.3, -0.5, -0.2],
                    [0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                    [-0.1, -0.1, 0.2, -0.1, -0.3, -0.4, 0.1, -0.1, 0.1, 0.2, 0.0, -0.1, 0.0, 0.3, 0.5, 0.2],
                ],
                "intercept": [0.1, 0.2, -0.3],
            }),
        ),
    ]
}

fn file(name: &str) -> Value {
    artifact_files()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
        .unwrap()
}

fn bytes(name: &str) -> Vec<u8> {
    serde_json::to_vec(&file(name)).unwrap()
}

/// Write the fixture artifacts into `dir`
pub fn write_artifacts(dir: &Path) {
    for (name, content) in artifact_files() {
        std::fs::write(dir.join(name), serde_json::to_vec_pretty(&content).unwrap()).unwrap();
    }
}

fn task_artifacts(task: Task, features: &[&str]) -> TaskArtifacts {
    let scaler: StandardScaler =
        serde_json::from_value(file(&format!("{}_scaler.json", task))).unwrap();
    let encoders: BTreeMap<String, LabelEncoder> =
        serde_json::from_value(file(&format!("{}_encoders.json", task))).unwrap();

    TaskArtifacts::new(
        task,
        features.iter().map(|f| f.to_string()).collect(),
        scaler,
        encoders,
    )
    .unwrap()
}

pub fn regression_artifacts() -> TaskArtifacts {
    task_artifacts(Task::Regression, &REGRESSION_FEATURES)
}

pub fn classification_artifacts() -> TaskArtifacts {
    task_artifacts(Task::Classification, &CLASSIFICATION_FEATURES)
}

pub fn regressor() -> LinearRegressor {
    LinearRegressor::from_json(&bytes(REGRESSION_MODEL_FILE)).unwrap()
}

pub fn classifier() -> LogisticClassifier {
    LogisticClassifier::from_json(&bytes(CLASSIFICATION_MODEL_FILE)).unwrap()
}

pub fn info() -> StoreInfo {
    StoreInfo {
        source: "<fixtures>".to_string(),
        loaded_at: Utc::now(),
        digests: BTreeMap::new(),
    }
}

pub fn store() -> ModelStore {
    store_with_regressor(Box::new(regressor()))
}

/// Fixture store with the score model swapped out
pub fn store_with_regressor(regressor: Box<dyn Regressor>) -> ModelStore {
    store_with(regressor, Box::new(classifier()))
}

/// Fixture store with the flood model swapped out
pub fn store_with_classifier(classifier: Box<dyn Classifier>) -> ModelStore {
    store_with(Box::new(regressor()), classifier)
}

fn store_with(regressor: Box<dyn Regressor>, classifier: Box<dyn Classifier>) -> ModelStore {
    ModelStore::from_parts(
        regression_artifacts(),
        classification_artifacts(),
        regressor,
        classifier,
        info(),
    )
    .unwrap()
}

/// Score model that always fails, as a corrupted model would
pub struct FailingRegressor;

impl Regressor for FailingRegressor {
    fn n_features(&self) -> usize {
        REGRESSION_FEATURES.len()
    }

    fn predict(&self, _features: &NormalizedFeatureVector) -> Result<f64, PredictError> {
        Err(PredictError::Inference("matrix dimensions do not align".to_string()))
    }
}

/// Score model that returns the same raw score for every input
pub struct ConstantRegressor(pub f64);

impl Regressor for ConstantRegressor {
    fn n_features(&self) -> usize {
        REGRESSION_FEATURES.len()
    }

    fn predict(&self, _features: &NormalizedFeatureVector) -> Result<f64, PredictError> {
        Ok(self.0)
    }
}

/// Flood model over Low/Medium/High that returns fixed probabilities,
/// however many and whatever their values
pub struct MisbehavingClassifier {
    pub proba: Vec<f64>,
}

impl MisbehavingClassifier {
    pub fn new(proba: &[f64]) -> Self {
        Self {
            proba: proba.to_vec(),
        }
    }
}

impl Classifier for MisbehavingClassifier {
    fn n_features(&self) -> usize {
        CLASSIFICATION_FEATURES.len()
    }

    fn classes(&self) -> &[RiskCategory] {
        &RiskCategory::ALL
    }

    fn predict_proba(&self, _features: &NormalizedFeatureVector) -> Result<Array1<f64>, PredictError> {
        Ok(Array1::from(self.proba.clone()))
    }
}
