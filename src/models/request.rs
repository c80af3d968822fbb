//! Prediction request model

use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::inference::{FeatureRecord, FeatureValue, PredictError};

/// Fields every prediction request must carry
pub const REQUIRED_FIELDS: [&str; 13] = [
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
];

/// Fields filled with a default when the caller leaves them out
pub const OPTIONAL_FIELDS: [&str; 10] = [
    "Country",
    "Flood_Risk_Index",
    "Drought_Risk_Index",
    "Temperature_C",
    "Annual_Rainfall_mm",
    "Soil_Erosion_Risk",
    "Current_Tourist_Count",
    "Human_Activity_Index",
    "Conservation_Investment_USD",
    "Climate_Risk_Score",
];

/// Fields the models see as label-encoded strings
pub const CATEGORICAL_FIELDS: [&str; 3] = ["Vegetation_Type", "Soil_Type", "Country"];

pub const DEFAULT_COUNTRY: &str = "USA";

/// Whether a model feature name can be produced from a request
pub fn is_known_feature(name: &str) -> bool {
    REQUIRED_FIELDS.contains(&name) || OPTIONAL_FIELDS.contains(&name)
}

pub fn is_categorical(name: &str) -> bool {
    CATEGORICAL_FIELDS.contains(&name)
}

/// Vegetation vocabulary the models were trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VegetationType {
    Forest,
    Mountain,
    Wetland,
    Grassland,
}

impl VegetationType {
    pub const ALL: [VegetationType; 4] = [
        VegetationType::Forest,
        VegetationType::Mountain,
        VegetationType::Wetland,
        VegetationType::Grassland,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VegetationType::Forest => "Forest",
            VegetationType::Mountain => "Mountain",
            VegetationType::Wetland => "Wetland",
            VegetationType::Grassland => "Grassland",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value)
    }
}

/// Validated prediction input.
///
/// Built from raw JSON with [`PredictionRequest::from_json`]; the struct
/// itself only carries values that passed presence and type checks, and
/// [`Validate`] enforces the numeric ranges.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct PredictionRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub vegetation_type: VegetationType,

    #[validate(range(min = 0.0, max = 1.0))]
    pub biodiversity_index: f64,

    pub protected_area: bool,

    #[validate(range(min = -500.0, max = 9000.0))]
    pub elevation_m: f64,

    #[validate(range(min = 0.0, max = 90.0))]
    pub slope_degree: f64,

    pub soil_type: String,

    #[validate(range(min = 0.0, max = 500.0))]
    pub air_quality_index: f64,

    #[validate(range(min = -60.0, max = 60.0))]
    pub average_temperature_c: f64,

    #[validate(range(max = 10000))]
    pub tourist_attractions: u32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub accessibility_score: f64,

    #[validate(range(max = 1000000))]
    pub tourist_capacity_limit: u32,

    // Supplementary inputs, defaulted in `feature_record`
    pub country: Option<String>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub flood_risk_index: Option<f64>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub drought_risk_index: Option<f64>,

    #[validate(range(min = -60.0, max = 60.0))]
    pub temperature_c: Option<f64>,

    #[validate(range(min = 0.0, max = 15000.0))]
    pub annual_rainfall_mm: Option<f64>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub soil_erosion_risk: Option<f64>,

    #[validate(range(min = 0.0))]
    pub current_tourist_count: Option<f64>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub human_activity_index: Option<f64>,

    #[validate(range(min = 0.0))]
    pub conservation_investment_usd: Option<f64>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub climate_risk_score: Option<f64>,
}

impl PredictionRequest {
    /// Parse and validate a raw JSON body.
    ///
    /// Every missing required field is reported at once. Type errors and
    /// range violations name the offending wire field. Unknown keys are
    /// ignored.
    pub fn from_json(body: &Value) -> Result<Self, PredictError> {
        let map = body.as_object().ok_or_else(|| PredictError::InvalidField {
            field: "body".to_string(),
            reason: "request body must be a JSON object".to_string(),
        })?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|name| map.get(**name).map_or(true, Value::is_null))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::MissingFields(missing));
        }

        let fields = Fields { map };

        let vegetation = fields.text("Vegetation_Type")?;
        let vegetation_type =
            VegetationType::parse(&vegetation).ok_or_else(|| PredictError::InvalidField {
                field: "Vegetation_Type".to_string(),
                reason: format!(
                    "'{}' is not one of Forest, Mountain, Wetland, Grassland",
                    vegetation
                ),
            })?;

        let request = Self {
            latitude: fields.number("Latitude")?,
            longitude: fields.number("Longitude")?,
            vegetation_type,
            biodiversity_index: fields.number("Biodiversity_Index")?,
            protected_area: fields.flag("Protected_Area_Status")?,
            elevation_m: fields.number("Elevation_m")?,
            slope_degree: fields.number("Slope_Degree")?,
            soil_type: fields.text("Soil_Type")?,
            air_quality_index: fields.number("Air_Quality_Index")?,
            average_temperature_c: fields.number("Average_Temperature_C")?,
            tourist_attractions: fields.count("Tourist_Attractions")?,
            accessibility_score: fields.number("Accessibility_Score")?,
            tourist_capacity_limit: fields.count("Tourist_Capacity_Limit")?,
            country: fields.optional_text("Country")?,
            flood_risk_index: fields.optional_number("Flood_Risk_Index")?,
            drought_risk_index: fields.optional_number("Drought_Risk_Index")?,
            temperature_c: fields.optional_number("Temperature_C")?,
            annual_rainfall_mm: fields.optional_number("Annual_Rainfall_mm")?,
            soil_erosion_risk: fields.optional_number("Soil_Erosion_Risk")?,
            current_tourist_count: fields.optional_number("Current_Tourist_Count")?,
            human_activity_index: fields.optional_number("Human_Activity_Index")?,
            conservation_investment_usd: fields.optional_number("Conservation_Investment_USD")?,
            climate_risk_score: fields.optional_number("Climate_Risk_Score")?,
        };

        request.validate().map_err(range_error)?;
        Ok(request)
    }

    /// Named model inputs with defaults applied for the supplementary fields
    pub fn feature_record(&self) -> FeatureRecord {
        let mut record = FeatureRecord::new();

        record.insert("Latitude", FeatureValue::Numeric(self.latitude));
        record.insert("Longitude", FeatureValue::Numeric(self.longitude));
        record.insert(
            "Vegetation_Type",
            FeatureValue::Categorical(self.vegetation_type.as_str().to_string()),
        );
        record.insert("Biodiversity_Index", FeatureValue::Numeric(self.biodiversity_index));
        record.insert(
            "Protected_Area_Status",
            FeatureValue::Numeric(if self.protected_area { 1.0 } else { 0.0 }),
        );
        record.insert("Elevation_m", FeatureValue::Numeric(self.elevation_m));
        record.insert("Slope_Degree", FeatureValue::Numeric(self.slope_degree));
        record.insert("Soil_Type", FeatureValue::Categorical(self.soil_type.clone()));
        record.insert("Air_Quality_Index", FeatureValue::Numeric(self.air_quality_index));
        record.insert(
            "Average_Temperature_C",
            FeatureValue::Numeric(self.average_temperature_c),
        );
        record.insert(
            "Tourist_Attractions",
            FeatureValue::Numeric(f64::from(self.tourist_attractions)),
        );
        record.insert("Accessibility_Score", FeatureValue::Numeric(self.accessibility_score));
        record.insert(
            "Tourist_Capacity_Limit",
            FeatureValue::Numeric(f64::from(self.tourist_capacity_limit)),
        );

        record.insert(
            "Country",
            FeatureValue::Categorical(
                self.country.clone().unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            ),
        );
        record.insert(
            "Flood_Risk_Index",
            FeatureValue::Numeric(self.flood_risk_index.unwrap_or(0.3)),
        );
        record.insert(
            "Drought_Risk_Index",
            FeatureValue::Numeric(self.drought_risk_index.unwrap_or(0.3)),
        );
        record.insert(
            "Temperature_C",
            FeatureValue::Numeric(self.temperature_c.unwrap_or(self.average_temperature_c)),
        );
        record.insert(
            "Annual_Rainfall_mm",
            FeatureValue::Numeric(self.annual_rainfall_mm.unwrap_or(1000.0)),
        );
        record.insert(
            "Soil_Erosion_Risk",
            FeatureValue::Numeric(self.soil_erosion_risk.unwrap_or(0.2)),
        );
        record.insert(
            "Current_Tourist_Count",
            FeatureValue::Numeric(
                self.current_tourist_count
                    .unwrap_or(f64::from(self.tourist_capacity_limit) * 0.6),
            ),
        );
        record.insert(
            "Human_Activity_Index",
            FeatureValue::Numeric(self.human_activity_index.unwrap_or(0.4)),
        );
        record.insert(
            "Conservation_Investment_USD",
            FeatureValue::Numeric(self.conservation_investment_usd.unwrap_or(100_000.0)),
        );
        record.insert(
            "Climate_Risk_Score",
            FeatureValue::Numeric(self.climate_risk_score.unwrap_or(0.4)),
        );

        record
    }
}

/// Typed accessors over the raw JSON object
struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn present(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn required(&self, name: &str) -> Result<&'a Value, PredictError> {
        self.present(name)
            .ok_or_else(|| PredictError::MissingFields(vec![name.to_string()]))
    }

    fn number(&self, name: &str) -> Result<f64, PredictError> {
        as_number(name, self.required(name)?)
    }

    fn optional_number(&self, name: &str) -> Result<Option<f64>, PredictError> {
        self.present(name).map(|v| as_number(name, v)).transpose()
    }

    fn count(&self, name: &str) -> Result<u32, PredictError> {
        let value = self.required(name)?;
        let count = match value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            _ => None,
        };
        count
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| invalid(name, "must be a non-negative integer"))
    }

    fn flag(&self, name: &str) -> Result<bool, PredictError> {
        match self.required(name)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
            Value::Number(n) if n.as_f64() == Some(1.0) => Ok(true),
            _ => Err(invalid(name, "must be a boolean")),
        }
    }

    fn text(&self, name: &str) -> Result<String, PredictError> {
        as_text(name, self.required(name)?)
    }

    fn optional_text(&self, name: &str) -> Result<Option<String>, PredictError> {
        self.present(name).map(|v| as_text(name, v)).transpose()
    }
}

fn as_number(name: &str, value: &Value) -> Result<f64, PredictError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(name, "must be a number"))
}

fn as_text(name: &str, value: &Value) -> Result<String, PredictError> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(invalid(name, "must not be empty")),
        None => Err(invalid(name, "must be a string")),
    }
}

fn invalid(field: &str, reason: &str) -> PredictError {
    PredictError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Map a validator failure back to the wire name of the first offending field
fn range_error(errors: ValidationErrors) -> PredictError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<String> = field_errors.keys().map(|k| k.to_string()).collect();
    fields.sort();

    let Some(field) = fields.first() else {
        return invalid("body", "validation failed");
    };

    let reason = field_errors
        .iter()
        .find(|(k, _)| k.to_string() == *field)
        .and_then(|(_, errs)| errs.first())
        .map(|err| match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
            (Some(min), None) => format!("must be at least {}", min),
            (None, Some(max)) => format!("must be at most {}", max),
            (None, None) => "is out of range".to_string(),
        })
        .unwrap_or_else(|| "is out of range".to_string());

    PredictError::InvalidField {
        field: wire_name(field).to_string(),
        reason,
    }
}

/// Struct field name -> JSON field name
fn wire_name(field: &str) -> &str {
    const NAMES: [(&str, &str); 21] = [
        ("latitude", "Latitude"),
        ("longitude", "Longitude"),
        ("biodiversity_index", "Biodiversity_Index"),
        ("elevation_m", "Elevation_m"),
        ("slope_degree", "Slope_Degree"),
        ("air_quality_index", "Air_Quality_Index"),
        ("average_temperature_c", "Average_Temperature_C"),
        ("tourist_attractions", "Tourist_Attractions"),
        ("accessibility_score", "Accessibility_Score"),
        ("tourist_capacity_limit", "Tourist_Capacity_Limit"),
        ("flood_risk_index", "Flood_Risk_Index"),
        ("drought_risk_index", "Drought_Risk_Index"),
        ("temperature_c", "Temperature_C"),
        ("annual_rainfall_mm", "Annual_Rainfall_mm"),
        ("soil_erosion_risk", "Soil_Erosion_Risk"),
        ("current_tourist_count", "Current_Tourist_Count"),
        ("human_activity_index", "Human_Activity_Index"),
        ("conservation_investment_usd", "Conservation_Investment_USD"),
        ("climate_risk_score", "Climate_Risk_Score"),
        ("vegetation_type", "Vegetation_Type"),
        ("soil_type", "Soil_Type"),
    ];

    NAMES
        .iter()
        .find(|(rust, _)| *rust == field)
        .map(|(_, wire)| *wire)
        .unwrap_or(field)
}

#[cfg(test)]
pub(crate) fn miami_request_json() -> Value {
    serde_json::json!({
        "Latitude": 25.7617,
        "Longitude": -80.1918,
        "Vegetation_Type": "Wetland",
        "Biodiversity_Index": 0.78,
        "Protected_Area_Status": true,
        "Elevation_m": 2.0,
        "Slope_Degree": 1.5,
        "Soil_Type": "Sandy",
        "Air_Quality_Index": 42.0,
        "Average_Temperature_C": 25.4,
        "Tourist_Attractions": 35,
        "Accessibility_Score": 0.92,
        "Tourist_Capacity_Limit": 5000
    })
}
