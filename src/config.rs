//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the model artifacts
    pub model_dir: PathBuf,

    /// Feature schema file (defaults to `<model_dir>/feature_names.json`)
    pub feature_names_path: PathBuf,

    /// Directory holding `index.html`
    pub template_dir: PathBuf,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// Hosting platform reported by the health check
    pub platform: String,

    /// Environment (development, production)
    pub environment: String,

    /// Abort startup when the model artifacts cannot be loaded
    pub require_models: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir: PathBuf = lookup("MODEL_DIR")
            .unwrap_or_else(|| "models".to_string())
            .into();

        let feature_names_path = lookup("FEATURE_NAMES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("feature_names.json"));

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            model_dir,
            feature_names_path,

            template_dir: lookup("TEMPLATE_DIR")
                .unwrap_or_else(|| "templates".to_string())
                .into(),

            static_dir: lookup("STATIC_DIR")
                .unwrap_or_else(|| "static".to_string())
                .into(),

            platform: lookup("PLATFORM").unwrap_or_else(|| "standalone".to_string()),

            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),

            require_models: lookup("REQUIRE_MODELS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.feature_names_path, PathBuf::from("models/feature_names.json"));
        assert_eq!(config.platform, "standalone");
        assert!(!config.require_models);
        assert!(!config.json_logs);
        assert!(!config.is_production());
    }

    #[test]
    fn test_feature_names_follow_model_dir() {
        let config = config_with(&[("MODEL_DIR", "/srv/artifacts")]);
        assert_eq!(
            config.feature_names_path,
            PathBuf::from("/srv/artifacts/feature_names.json")
        );

        let config = config_with(&[
            ("MODEL_DIR", "/srv/artifacts"),
            ("FEATURE_NAMES_PATH", "/etc/features.json"),
        ]);
        assert_eq!(config.feature_names_path, PathBuf::from("/etc/features.json"));
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("PORT", "8080"),
            ("REQUIRE_MODELS", "TRUE"),
            ("LOG_FORMAT", "json"),
            ("ENVIRONMENT", "production"),
            ("PLATFORM", "vercel"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(config.require_models);
        assert!(config.json_logs);
        assert!(config.is_production());
        assert_eq!(config.platform, "vercel");
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = config_with(&[("PORT", "not-a-port")]);
        assert_eq!(config.port, 5000);
    }
}
