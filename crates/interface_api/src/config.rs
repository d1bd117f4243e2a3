//! API configuration
//!
//! Settings come from serde defaults overlaid with `CLAIMLEDGER_*`
//! environment variables, using `__` between nested keys:
//!
//! ```text
//! CLAIMLEDGER_SERVER__PORT=8080
//! CLAIMLEDGER_AUTH__JWT_SECRET=...
//! CLAIMLEDGER_AUTH__INSURER_EMAILS=adjuster@insurer.io,ops@insurer.io
//! CLAIMLEDGER_DATABASE__URL=postgres://localhost/claimledger
//! CLAIMLEDGER_GEMINI__API_KEY=...
//! CLAIMLEDGER_CHAIN__SETTLEMENT_PRIVATE_KEY=0x...
//! ```

use std::time::Duration;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

use domain_claims::{ClaimError, DecisionPolicy, GeminiConfig, DEFAULT_APPROVAL_THRESHOLD};
use domain_identity::normalize_email;
use domain_wallet::CircleConfig;
use infra_chain::ChainConfig;
use infra_db::DatabaseConfig;

/// Placeholder secret; the server refuses to start with it outside debug builds
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub evaluation: EvaluationSettings,
    pub gemini: GeminiSettings,
    pub circle: CircleSettings,
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ServerSettings {
    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub jwt_expiration_secs: u64,
    /// Emails allowed to self-register as insurers; empty means nobody
    pub insurer_emails: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_secs: 24 * 60 * 60,
            insurer_emails: Vec::new(),
        }
    }
}

impl AuthSettings {
    /// True when `email` is on the insurer allowlist
    pub fn may_register_insurer(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.insurer_emails
            .iter()
            .any(|allowed| normalize_email(allowed) == email)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/claimledger".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
        }
    }
}

impl DatabaseSettings {
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Which analyzer evaluates claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerProvider {
    /// Gemini when an API key is configured, heuristics otherwise
    #[default]
    Auto,
    Gemini,
    Heuristic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub approval_threshold: f64,
    pub analyzer: AnalyzerProvider,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            analyzer: AnalyzerProvider::Auto,
        }
    }
}

impl EvaluationSettings {
    pub fn policy(&self) -> Result<DecisionPolicy, ClaimError> {
        DecisionPolicy::new(self.approval_threshold)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        let defaults = GeminiConfig::default();
        Self {
            api_key: None,
            model: defaults.model,
            base_url: defaults.base_url,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

impl GeminiSettings {
    /// Adapter settings, or `None` without an API key
    pub fn adapter_config(&self) -> Option<GeminiConfig> {
        let api_key = non_empty(&self.api_key)?;
        Some(GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircleSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub gateway_url: String,
    pub wallet_set_id: String,
    /// Hex entity secret registered with Circle
    pub entity_secret: String,
    /// PEM entity public key; fetched from Circle when unset
    pub entity_public_key: Option<String>,
    pub blockchain: String,
    pub timeout_secs: u64,
}

impl Default for CircleSettings {
    fn default() -> Self {
        let defaults = CircleConfig::default();
        Self {
            api_key: None,
            base_url: defaults.base_url,
            gateway_url: defaults.gateway_url,
            wallet_set_id: defaults.wallet_set_id,
            entity_secret: defaults.entity_secret,
            entity_public_key: defaults.entity_public_key,
            blockchain: defaults.blockchain,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

impl CircleSettings {
    /// Adapter settings, or `None` without an API key
    pub fn adapter_config(&self) -> Option<CircleConfig> {
        let api_key = non_empty(&self.api_key)?;
        Some(CircleConfig {
            api_key,
            base_url: self.base_url.clone(),
            gateway_url: self.gateway_url.clone(),
            wallet_set_id: self.wallet_set_id.clone(),
            entity_secret: self.entity_secret.clone(),
            entity_public_key: non_empty(&self.entity_public_key),
            blockchain: self.blockchain.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AppConfig {
    /// Loads configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(
                Environment::with_prefix("CLAIMLEDGER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.insurer_emails"),
            ),
        )
    }

    /// Deserializes whatever sources the builder carries on top of the defaults
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// True when a settlement key is configured
    pub fn settlement_enabled(&self) -> bool {
        !self.chain.settlement_private_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.evaluation.analyzer, AnalyzerProvider::Auto);
        assert!(config.gemini.adapter_config().is_none());
        assert!(config.circle.adapter_config().is_none());
        assert!(!config.settlement_enabled());
    }

    #[test]
    fn test_overrides_nested_sections() {
        let builder = Config::builder()
            .set_override("server.port", 9090_i64)
            .unwrap()
            .set_override("evaluation.approval_threshold", 0.9)
            .unwrap()
            .set_override("evaluation.analyzer", "heuristic")
            .unwrap()
            .set_override("gemini.api_key", "g-key")
            .unwrap()
            .set_override("chain.chain_id", 1_i64)
            .unwrap();

        let config = AppConfig::from_builder(builder).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.evaluation.analyzer, AnalyzerProvider::Heuristic);
        assert_eq!(config.evaluation.policy().unwrap().approval_threshold(), 0.9);
        assert_eq!(config.gemini.adapter_config().unwrap().api_key, "g-key");
        assert_eq!(config.chain.chain_id, 1);
        assert_eq!(config.chain.confirmation_timeout_secs, 60);
    }

    #[test]
    fn test_insurer_allowlist() {
        assert!(!AuthSettings::default().may_register_insurer("ops@insurer.io"));

        let builder = Config::builder()
            .set_override("auth.insurer_emails", vec!["Ops@Insurer.io"])
            .unwrap();
        let config = AppConfig::from_builder(builder).unwrap();
        assert!(config.auth.may_register_insurer(" ops@insurer.io "));
        assert!(!config.auth.may_register_insurer("someone@else.io"));
    }

    #[test]
    fn test_blank_api_key_disables_adapter() {
        let settings = CircleSettings {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(settings.adapter_config().is_none());
    }

    #[test]
    fn test_circle_entity_settings_reach_adapter() {
        let settings = CircleSettings {
            api_key: Some("c-key".to_string()),
            entity_secret: "ab".repeat(32),
            entity_public_key: Some("  ".to_string()),
            ..Default::default()
        };
        let adapter = settings.adapter_config().unwrap();
        assert_eq!(adapter.entity_secret.len(), 64);
        assert!(adapter.entity_public_key.is_none());
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let settings = EvaluationSettings {
            approval_threshold: 1.5,
            ..Default::default()
        };
        assert!(settings.policy().is_err());
    }

    #[test]
    fn test_pool_config_carries_sizing() {
        let settings = DatabaseSettings {
            max_connections: 3,
            ..Default::default()
        };
        assert_eq!(settings.pool_config().max_connections, 3);
    }
}
