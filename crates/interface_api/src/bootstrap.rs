//! Process setup shared by the server and the ops CLI

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::PortError;
use domain_claims::{ClaimAnalysisPort, GeminiAnalyzer, HeuristicAnalyzer, SettlementPort};
use domain_wallet::{CircleWalletAdapter, WalletProviderPort};
use infra_chain::EvmSettlementAdapter;
use infra_db::{DatabasePool, PostgresClaimStore, PostgresUserStore};

use crate::config::{AnalyzerProvider, AppConfig, ServerSettings};
use crate::Adapters;

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(server: &ServerSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (json, plain) = if server.json_logs {
        (Some(tracing_subscriber::fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_target(true)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .init();
}

/// Picks the claim analyzer
pub fn build_analyzer(config: &AppConfig) -> Result<Arc<dyn ClaimAnalysisPort>, PortError> {
    let gemini = config.gemini.adapter_config();
    match (config.evaluation.analyzer, gemini) {
        (AnalyzerProvider::Heuristic, _) | (AnalyzerProvider::Auto, None) => {
            warn!("No Gemini API key in use; evaluating claims with local heuristics");
            Ok(Arc::new(HeuristicAnalyzer::new()))
        }
        (AnalyzerProvider::Gemini | AnalyzerProvider::Auto, Some(gemini)) => {
            info!(model = %gemini.model, "Evaluating claims with Gemini");
            Ok(Arc::new(GeminiAnalyzer::new(gemini)?))
        }
        (AnalyzerProvider::Gemini, None) => Err(PortError::validation_field(
            "analyzer is gemini but no API key is configured",
            "gemini.api_key",
        )),
    }
}

/// The EVM settlement adapter, if a settlement key is configured
pub fn build_chain(config: &AppConfig) -> Result<Option<Arc<EvmSettlementAdapter>>, PortError> {
    if !config.settlement_enabled() {
        warn!("No settlement key configured; settlement endpoints are disabled");
        return Ok(None);
    }
    Ok(Some(Arc::new(EvmSettlementAdapter::new(config.chain.clone())?)))
}

/// The Circle wallet adapter, if an API key is configured
pub fn build_wallet_provider(
    config: &AppConfig,
) -> Result<Option<Arc<CircleWalletAdapter>>, PortError> {
    match config.circle.adapter_config() {
        Some(circle) => Ok(Some(Arc::new(CircleWalletAdapter::new(circle)?))),
        None => {
            warn!("No Circle API key configured; custodial wallets are disabled");
            Ok(None)
        }
    }
}

/// Wires every port implementation from configuration
pub fn build_adapters(config: &AppConfig, pool: DatabasePool) -> Result<Adapters, PortError> {
    let chain = build_chain(config)?;
    let wallet_provider = build_wallet_provider(config)?;

    Ok(Adapters {
        users: Arc::new(PostgresUserStore::new(pool.clone())),
        claims: Arc::new(PostgresClaimStore::new(pool)),
        analyzer: build_analyzer(config)?,
        chain: chain.map(|c| c as Arc<dyn SettlementPort>),
        wallet_provider: wallet_provider.map(|w| w as Arc<dyn WalletProviderPort>),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_falls_back_to_heuristics() {
        let analyzer = build_analyzer(&AppConfig::default()).unwrap();
        assert_eq!(analyzer.provider(), HeuristicAnalyzer::new().provider());
    }

    #[test]
    fn test_gemini_without_key_is_rejected() {
        let mut config = AppConfig::default();
        config.evaluation.analyzer = AnalyzerProvider::Gemini;
        assert!(build_analyzer(&config).is_err());
    }

    #[test]
    fn test_gemini_selected_when_key_present() {
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("key".to_string());
        let analyzer = build_analyzer(&config).unwrap();
        assert_ne!(analyzer.provider(), HeuristicAnalyzer::new().provider());
    }

    #[test]
    fn test_optional_adapters_absent_by_default() {
        let config = AppConfig::default();
        assert!(build_chain(&config).unwrap().is_none());
        assert!(build_wallet_provider(&config).unwrap().is_none());
    }

    #[test]
    fn test_bad_settlement_key_fails_startup() {
        let mut config = AppConfig::default();
        config.chain.settlement_private_key = "not-a-key".to_string();
        assert!(build_chain(&config).is_err());
    }
}
