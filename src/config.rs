use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub generation: GenerationConfig,

    pub billing: BillingConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,
    pub log_level: String,
    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,
    /// Minimum idle database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/insurecontent.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session expiry after this many minutes without a request.
    pub session_inactivity_minutes: i64,

    /// Public URL of the frontend; checkout and portal sessions return here.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 7 * 24 * 60,
            public_base_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
        }
    }
}

/// Text and image generation provider (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_base_url: String,

    /// Overridden by `OPENAI_API_KEY` when set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    pub text_model: String,

    pub image_model: String,

    pub max_output_tokens: u32,

    pub temperature: f32,

    /// Upper bound on a single upstream call, text or image.
    pub request_timeout_seconds: u64,

    pub image_size: String,

    pub image_quality: String,

    /// USD per token, used for the usage ledger.
    pub cost_per_token: f64,

    /// USD per generated image.
    pub cost_per_image: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            text_model: "gpt-4".to_string(),
            image_model: "dall-e-3".to_string(),
            max_output_tokens: 3500,
            temperature: 0.7,
            request_timeout_seconds: 120,
            image_size: "1024x1024".to_string(),
            image_quality: "standard".to_string(),
            cost_per_token: 0.000_03,
            cost_per_image: 0.04,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub api_base_url: String,

    /// Overridden by `STRIPE_SECRET_KEY` when set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key: String,

    /// Overridden by `STRIPE_WEBHOOK_SECRET` when set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub webhook_secret: String,

    /// Maximum age of a signed webhook delivery.
    pub signature_tolerance_seconds: i64,

    pub monthly_price_cents: i64,

    pub annual_price_cents: i64,

    pub currency: String,

    pub request_timeout_seconds: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.stripe.com/v1".to_string(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            signature_tolerance_seconds: 300,
            monthly_price_cents: 2997,
            annual_price_cents: 29997,
            currency: "usd".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "insurecontent".to_string());

        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)?
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets may come from the environment instead of the config file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.generation.api_key = key;
        }
        if let Some(key) = non_empty("STRIPE_SECRET_KEY") {
            self.billing.secret_key = key;
        }
        if let Some(secret) = non_empty("STRIPE_WEBHOOK_SECRET") {
            self.billing.webhook_secret = secret;
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.general.database_path = url;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("insurecontent").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".insurecontent").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.text_model.trim().is_empty() {
            anyhow::bail!("generation.text_model cannot be empty");
        }

        if self.generation.request_timeout_seconds == 0 {
            anyhow::bail!("generation.request_timeout_seconds must be > 0");
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            anyhow::bail!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            );
        }

        if self.generation.max_output_tokens == 0 {
            anyhow::bail!("generation.max_output_tokens must be > 0");
        }

        if self.billing.request_timeout_seconds == 0 {
            anyhow::bail!("billing.request_timeout_seconds must be > 0");
        }

        if self.billing.signature_tolerance_seconds <= 0 {
            anyhow::bail!("billing.signature_tolerance_seconds must be > 0");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        if self.security.min_password_length < 8 {
            anyhow::bail!("security.min_password_length must be at least 8");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation.max_output_tokens, 3500);
        assert!((config.generation.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.generation.image_size, "1024x1024");
        assert_eq!(config.billing.monthly_price_cents, 2997);
        assert_eq!(config.billing.annual_price_cents, 29997);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_skips_empty_secrets() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[generation]"));
        assert!(toml_str.contains("[billing]"));
        assert!(!toml_str.contains("api_key"));
        assert!(!toml_str.contains("webhook_secret"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [generation]
            text_model = "gpt-4o"
            request_timeout_seconds = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.generation.text_model, "gpt-4o");
        assert_eq!(config.generation.request_timeout_seconds, 30);
        assert_eq!(config.generation.image_model, "dall-e-3");
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "STRIPE_WEBHOOK_SECRET" => Some("whsec_test".to_string()),
            "STRIPE_SECRET_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.generation.api_key, "sk-test");
        assert_eq!(config.billing.webhook_secret, "whsec_test");
        assert!(config.billing.secret_key.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.generation.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.text_model = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.min_db_connections = 10;
        assert!(config.validate().is_err());
    }
}
