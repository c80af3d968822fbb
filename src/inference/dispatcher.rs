//! Prediction dispatch - normalize, run both models, assemble the result

use serde::Serialize;

use super::{ModelStore, PredictError};
use crate::models::request::PredictionRequest;

/// Scores below this are Low risk
pub const LOW_RISK_CEILING: f64 = 0.33;
/// Scores below this (and not Low) are Medium risk
pub const MEDIUM_RISK_CEILING: f64 = 0.67;

/// Tolerance on the classifier's probability mass
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Flood risk classification output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High];

    /// Map a trained class label (0, 1, 2) to its category
    pub fn from_index(label: usize) -> Option<Self> {
        Self::ALL.get(label).copied()
    }

    /// Bucket a climate risk score
    pub fn from_score(score: f64) -> Self {
        if score < LOW_RISK_CEILING {
            RiskCategory::Low
        } else if score < MEDIUM_RISK_CEILING {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }
}

/// Probability per flood risk category
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskProbabilities {
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Medium")]
    pub medium: f64,
    #[serde(rename = "High")]
    pub high: f64,
}

impl RiskProbabilities {
    pub fn get(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::Low => self.low,
            RiskCategory::Medium => self.medium,
            RiskCategory::High => self.high,
        }
    }

    fn set(&mut self, category: RiskCategory, value: f64) {
        match category {
            RiskCategory::Low => self.low = value,
            RiskCategory::Medium => self.medium = value,
            RiskCategory::High => self.high = value,
        }
    }

    pub fn sum(&self) -> f64 {
        self.low + self.medium + self.high
    }

    /// Most probable category; ties go to the lower category
    pub fn most_likely(&self) -> RiskCategory {
        RiskCategory::ALL
            .into_iter()
            .fold(RiskCategory::Low, |best, c| if self.get(c) > self.get(best) { c } else { best })
    }
}

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub climate_risk_score: f64, // 0.0 - 1.0
    pub flood_risk_category: RiskCategory,
    pub risk_probabilities: RiskProbabilities,
    pub risk_level: RiskCategory,
}

/// Run both models on a validated request
pub fn predict(store: &ModelStore, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
    let start_time = std::time::Instant::now();

    let record = request.feature_record();
    let regression_input = store.regression().transform(&record)?;
    let classification_input = store.classification().transform(&record)?;

    let raw_score = store.regressor().predict(&regression_input)?;
    if !raw_score.is_finite() {
        return Err(PredictError::Inference(format!(
            "regression model returned {}",
            raw_score
        )));
    }
    let climate_risk_score = raw_score.clamp(0.0, 1.0);

    let classifier = store.classifier();
    let proba = classifier.predict_proba(&classification_input)?;
    if proba.len() != classifier.classes().len() {
        return Err(PredictError::Inference(format!(
            "classification model returned {} probabilities for {} classes",
            proba.len(),
            classifier.classes().len()
        )));
    }

    let mut risk_probabilities = RiskProbabilities::default();
    for (&category, &p) in classifier.classes().iter().zip(proba.iter()) {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PredictError::Inference(format!(
                "classification model returned probability {} for {:?}",
                p, category
            )));
        }
        risk_probabilities.set(category, p);
    }
    if (risk_probabilities.sum() - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(PredictError::Inference(format!(
            "classification probabilities sum to {}",
            risk_probabilities.sum()
        )));
    }

    let result = PredictionResult {
        climate_risk_score,
        flood_risk_category: risk_probabilities.most_likely(),
        risk_probabilities,
        risk_level: RiskCategory::from_score(climate_risk_score),
    };

    tracing::debug!(
        "Prediction: score={:.4} (raw {:.4}), flood={:?}, took {}us",
        result.climate_risk_score,
        raw_score,
        result.flood_risk_category,
        start_time.elapsed().as_micros()
    );

    Ok(result)
}
