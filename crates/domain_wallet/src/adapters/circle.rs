//! Circle Developer-Controlled Wallets and Gateway adapter
//!
//! Wallet endpoints live under `{base_url}/v1/w3s`; the unified balance comes
//! from the Gateway API, which is a separate host. Both use the same API key
//! as a bearer token.
//!
//! Wallet creation needs the entity secret registered with Circle. Circle
//! refuses a ciphertext it has already seen, so the secret is encrypted with
//! RSA-OAEP-SHA256 under Circle's entity public key on every request. The key
//! comes from configuration or is fetched once from the API.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use reqwest::Client;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::rand_core::OsRng;
use rsa::{Oaep, RsaPublicKey};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use core_kernel::{AdapterHealth, DomainPort, EvmAddress, HealthCheckResult, HealthCheckable, PortError};

use crate::ports::{CreateWalletRequest, WalletProviderPort};
use crate::wallet::{CustodialWallet, DomainBalance, TokenBalance, UnifiedBalance, WalletState};

const SERVICE: &str = "circle";
pub const DEFAULT_BASE_URL: &str = "https://api.circle.com";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway-api-testnet.circle.com";
pub const DEFAULT_BLOCKCHAIN: &str = "ARC-TESTNET";
/// Entity secrets are 32 random bytes
pub const ENTITY_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct CircleConfig {
    pub api_key: String,
    pub base_url: String,
    pub gateway_url: String,
    pub wallet_set_id: String,
    /// Hex-encoded entity secret
    pub entity_secret: String,
    /// PEM public key used to encrypt the entity secret; fetched when unset
    pub entity_public_key: Option<String>,
    pub blockchain: String,
    pub timeout_secs: u64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            wallet_set_id: String::new(),
            entity_secret: String::new(),
            entity_public_key: None,
            blockchain: DEFAULT_BLOCKCHAIN.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyData {
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct WalletsData {
    #[serde(default)]
    wallets: Vec<WalletDto>,
}

#[derive(Debug, Deserialize)]
struct WalletData {
    wallet: WalletDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletDto {
    id: String,
    address: String,
    blockchain: String,
    state: String,
    wallet_set_id: Option<String>,
    create_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalancesData {
    #[serde(default)]
    token_balances: Vec<TokenBalanceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalanceDto {
    token: TokenDto,
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenDto {
    symbol: Option<String>,
    decimals: Option<u32>,
    token_address: Option<String>,
    blockchain: Option<String>,
}

#[derive(Debug, Serialize)]
struct GatewayBalancesRequest<'a> {
    token: &'a str,
    sources: Vec<GatewaySource<'a>>,
}

#[derive(Debug, Serialize)]
struct GatewaySource<'a> {
    depositor: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayBalancesResponse {
    token: Option<String>,
    #[serde(default)]
    balances: Vec<GatewayBalanceDto>,
}

#[derive(Debug, Deserialize)]
struct GatewayBalanceDto {
    domain: u32,
    balance: String,
}

fn parse_amount(raw: &str) -> Result<Decimal, PortError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| PortError::transformation(format!("invalid amount '{raw}': {e}")))
}

impl TryFrom<WalletDto> for CustodialWallet {
    type Error = PortError;

    fn try_from(dto: WalletDto) -> Result<Self, Self::Error> {
        let address = EvmAddress::parse(&dto.address)
            .map_err(|e| PortError::transformation(format!("wallet {}: {e}", dto.id)))?;
        let state = match dto.state.as_str() {
            "FROZEN" => WalletState::Frozen,
            _ => WalletState::Live,
        };
        Ok(CustodialWallet {
            id: dto.id,
            address,
            blockchain: dto.blockchain,
            state,
            wallet_set_id: dto.wallet_set_id,
            created_at: dto.create_date,
        })
    }
}

impl TryFrom<TokenBalanceDto> for TokenBalance {
    type Error = PortError;

    fn try_from(dto: TokenBalanceDto) -> Result<Self, Self::Error> {
        Ok(TokenBalance {
            symbol: dto.token.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            amount: parse_amount(&dto.amount)?,
            decimals: dto.token.decimals,
            token_address: dto.token.token_address,
            blockchain: dto.token.blockchain,
        })
    }
}

/// Accepts both the PKCS#1 `RSA PUBLIC KEY` and the SPKI `PUBLIC KEY` PEM forms
fn parse_public_key(pem: &str) -> Result<RsaPublicKey, PortError> {
    let pem = pem.trim();
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| {
            PortError::validation_field(
                format!("invalid Circle entity public key: {e}"),
                "circle.entity_public_key",
            )
        })
}

/// The raw entity secret
#[derive(Clone)]
struct EntitySecret(Vec<u8>);

impl fmt::Debug for EntitySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntitySecret(..)")
    }
}

impl EntitySecret {
    fn from_hex(raw: &str) -> Result<Self, PortError> {
        let invalid = || {
            PortError::validation_field(
                format!("Circle entity secret must be {ENTITY_SECRET_LEN} hex-encoded bytes"),
                "circle.entity_secret",
            )
        };
        let bytes = base16ct::mixed::decode_vec(raw.trim()).map_err(|_| invalid())?;
        if bytes.len() != ENTITY_SECRET_LEN {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }

    /// Base64 RSA-OAEP-SHA256 ciphertext; random padding makes every call unique
    fn encrypt(&self, key: &RsaPublicKey) -> Result<String, PortError> {
        let ciphertext = key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &self.0)
            .map_err(|e| PortError::internal(format!("entity secret encryption failed: {e}")))?;
        Ok(Base64::encode_string(&ciphertext))
    }
}

/// Circle-backed implementation of [`WalletProviderPort`]
#[derive(Debug, Clone)]
pub struct CircleWalletAdapter {
    config: CircleConfig,
    http: Client,
    entity_secret: Option<EntitySecret>,
    public_key: OnceCell<RsaPublicKey>,
}

impl CircleWalletAdapter {
    pub fn new(config: CircleConfig) -> Result<Self, PortError> {
        if config.api_key.trim().is_empty() {
            return Err(PortError::validation_field("Circle API key is empty", "circle.api_key"));
        }
        let entity_secret = match config.entity_secret.trim() {
            "" => None,
            raw => Some(EntitySecret::from_hex(raw)?),
        };
        let public_key = config
            .entity_public_key
            .as_deref()
            .filter(|pem| !pem.trim().is_empty())
            .map(parse_public_key)
            .transpose()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            entity_secret,
            public_key: OnceCell::new_with(public_key),
        })
    }

    pub fn config(&self) -> &CircleConfig {
        &self.config
    }

    fn wallets_url(&self, path: &str) -> String {
        format!("{}/v1/w3s{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn gateway_url(&self, path: &str) -> String {
        format!("{}{}", self.config.gateway_url.trim_end_matches('/'), path)
    }

    fn map_transport(&self, err: reqwest::Error, operation: &str) -> PortError {
        if err.is_timeout() {
            PortError::Timeout {
                operation: format!("{SERVICE} {operation}"),
                duration_ms: self.config.timeout_secs * 1000,
            }
        } else if err.is_connect() {
            PortError::Connection {
                message: format!("{SERVICE} unreachable"),
                source: Some(Box::new(err)),
            }
        } else if err.is_decode() {
            PortError::transformation(format!("{SERVICE} {operation}: {err}"))
        } else {
            PortError::Internal {
                message: format!("{SERVICE} {operation} failed"),
                source: Some(Box::new(err)),
            }
        }
    }

    async fn entity_public_key(&self) -> Result<&RsaPublicKey, PortError> {
        self.public_key
            .get_or_try_init(|| async {
                let envelope: Envelope<PublicKeyData> = self
                    .execute(
                        self.http.get(self.wallets_url("/config/entity/publicKey")),
                        "entity public key",
                    )
                    .await?;
                debug!("Fetched Circle entity public key");
                parse_public_key(&envelope.data.public_key)
            })
            .await
    }

    /// A fresh entity secret ciphertext for one request
    pub async fn entity_secret_ciphertext(&self) -> Result<String, PortError> {
        let secret = self.entity_secret.as_ref().ok_or_else(|| {
            PortError::validation_field(
                "Circle entity secret is required to create wallets",
                "circle.entity_secret",
            )
        })?;
        secret.encrypt(self.entity_public_key().await?)
    }

    /// Sends the request and decodes a successful JSON body
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T, PortError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport(e, operation))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::from_http_status(status.as_u16(), SERVICE, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| self.map_transport(e, operation))
    }
}

impl DomainPort for CircleWalletAdapter {}

#[async_trait]
impl HealthCheckable for CircleWalletAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.http.get(self.wallets_url("/ping")).send().await;
        let latency = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.status().is_success() => {
                HealthCheckResult::healthy("circle-wallets", latency)
            }
            Ok(response) => HealthCheckResult {
                status: AdapterHealth::Degraded,
                ..HealthCheckResult::unhealthy(
                    "circle-wallets",
                    latency,
                    format!("ping returned {}", response.status()),
                )
            },
            Err(e) => HealthCheckResult::unhealthy("circle-wallets", latency, e.to_string()),
        }
    }
}

#[async_trait]
impl WalletProviderPort for CircleWalletAdapter {
    #[instrument(skip(self, request), fields(idempotency_key = %request.idempotency_key))]
    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<CustodialWallet, PortError> {
        if self.config.wallet_set_id.is_empty() {
            return Err(PortError::validation_field(
                "Circle wallet set id is required to create wallets",
                "circle.wallet_set_id",
            ));
        }
        let ciphertext = self.entity_secret_ciphertext().await?;

        let mut body = json!({
            "idempotencyKey": request.idempotency_key,
            "entitySecretCiphertext": ciphertext,
            "walletSetId": self.config.wallet_set_id,
            "blockchains": [self.config.blockchain],
            "count": 1,
            "accountType": "EOA",
        });
        if let Some(name) = &request.name {
            body["metadata"] = json!([{ "name": name, "refId": request.idempotency_key }]);
        }

        let envelope: Envelope<WalletsData> = self
            .execute(
                self.http.post(self.wallets_url("/developer/wallets")).json(&body),
                "create wallet",
            )
            .await?;

        let wallet = envelope
            .data
            .wallets
            .into_iter()
            .next()
            .ok_or_else(|| PortError::transformation("Circle returned no wallet"))?;
        debug!(wallet_id = %wallet.id, "Circle wallet created");
        wallet.try_into()
    }

    #[instrument(skip(self))]
    async fn get_wallet(&self, wallet_id: &str) -> Result<CustodialWallet, PortError> {
        let envelope: Envelope<WalletData> = self
            .execute(
                self.http.get(self.wallets_url(&format!("/wallets/{wallet_id}"))),
                "get wallet",
            )
            .await
            .map_err(|e| match e {
                PortError::NotFound { .. } => PortError::not_found("Wallet", wallet_id),
                other => other,
            })?;
        envelope.data.wallet.try_into()
    }

    #[instrument(skip(self))]
    async fn get_balances(&self, wallet_id: &str) -> Result<Vec<TokenBalance>, PortError> {
        let envelope: Envelope<BalancesData> = self
            .execute(
                self.http
                    .get(self.wallets_url(&format!("/wallets/{wallet_id}/balances"))),
                "get balances",
            )
            .await?;
        envelope
            .data
            .token_balances
            .into_iter()
            .map(TokenBalance::try_from)
            .collect()
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn unified_balance(&self, address: &EvmAddress) -> Result<UnifiedBalance, PortError> {
        let body = GatewayBalancesRequest {
            token: "USDC",
            sources: vec![GatewaySource {
                depositor: address.as_str(),
            }],
        };
        let response: GatewayBalancesResponse = self
            .execute(
                self.http.post(self.gateway_url("/v1/balances")).json(&body),
                "unified balance",
            )
            .await?;

        let domains = response
            .balances
            .into_iter()
            .map(|b| {
                Ok(DomainBalance {
                    domain: b.domain,
                    balance: parse_amount(&b.balance)?,
                })
            })
            .collect::<Result<Vec<_>, PortError>>()?;

        Ok(UnifiedBalance::from_domains(
            response.token.unwrap_or_else(|| "USDC".to_string()),
            domains,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejects_empty_api_key() {
        let result = CircleWalletAdapter::new(CircleConfig::default());
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }

    #[test]
    fn test_wallet_dto_conversion() {
        let raw = r#"{
            "data": {
                "wallets": [{
                    "id": "0189bc61-7fe4-70f3-8a1b-0d14bd7e6e3c",
                    "address": "0x6E5eAf34c73D1CD0be4e24f923b97CF38e10d1f3",
                    "blockchain": "ARC-TESTNET",
                    "state": "LIVE",
                    "walletSetId": "0189bc61-7fe4-70f3-8a1b-000000000001",
                    "createDate": "2025-01-20T09:45:00Z"
                }]
            }
        }"#;
        let envelope: Envelope<WalletsData> = serde_json::from_str(raw).unwrap();
        let wallet: CustodialWallet = envelope.data.wallets.into_iter().next().unwrap().try_into().unwrap();

        assert_eq!(wallet.address.as_str(), "0x6e5eaf34c73d1cd0be4e24f923b97cf38e10d1f3");
        assert_eq!(wallet.state, WalletState::Live);
        assert!(wallet.created_at.is_some());
    }

    #[test]
    fn test_balance_amounts_are_parsed_from_strings() {
        let raw = r#"{
            "data": {
                "tokenBalances": [{
                    "token": { "symbol": "USDC", "decimals": 6, "blockchain": "ARC-TESTNET" },
                    "amount": "125.500000"
                }]
            }
        }"#;
        let envelope: Envelope<BalancesData> = serde_json::from_str(raw).unwrap();
        let balance = TokenBalance::try_from(envelope.data.token_balances.into_iter().next().unwrap()).unwrap();
        assert_eq!(balance.amount, dec!(125.5));
        assert_eq!(balance.decimals, Some(6));
    }

    const SECRET_HEX: &str = "4f3c2a1b0e9d8c7b6a5f4e3d2c1b0a99887766554433221100ffeeddccbbaa01";

    fn keypair() -> (RsaPrivateKey, String) {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pem = private.to_public_key().to_public_key_pem(LineEnding::LF).unwrap();
        (private, pem)
    }

    fn adapter(public_key_pem: Option<String>) -> CircleWalletAdapter {
        CircleWalletAdapter::new(CircleConfig {
            api_key: "TEST_API_KEY:abc:def".to_string(),
            wallet_set_id: "0189bc61-7fe4-70f3-8a1b-000000000001".to_string(),
            entity_secret: SECRET_HEX.to_string(),
            entity_public_key: public_key_pem,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_entity_secret_is_encrypted_afresh_per_request() {
        let (private, pem) = keypair();
        let adapter = adapter(Some(pem));

        let first = adapter.entity_secret_ciphertext().await.unwrap();
        let second = adapter.entity_secret_ciphertext().await.unwrap();
        assert_ne!(first, second);

        let expected = base16ct::lower::decode_vec(SECRET_HEX).unwrap();
        for ciphertext in [first, second] {
            let bytes = Base64::decode_vec(&ciphertext).unwrap();
            let plain = private.decrypt(Oaep::new::<Sha256>(), &bytes).unwrap();
            assert_eq!(plain, expected);
        }
    }

    #[test]
    fn test_pkcs1_public_key_is_accepted() {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pem = private.to_public_key().to_pkcs1_pem(LineEnding::LF).unwrap();
        assert!(parse_public_key(&pem).is_ok());
        assert!(parse_public_key("not a key").is_err());
    }

    #[test]
    fn test_entity_secret_must_be_32_hex_bytes() {
        assert!(EntitySecret::from_hex(SECRET_HEX).is_ok());
        assert!(EntitySecret::from_hex("abcd").is_err());
        assert!(EntitySecret::from_hex(&"zz".repeat(ENTITY_SECRET_LEN)).is_err());

        let result = CircleWalletAdapter::new(CircleConfig {
            api_key: "key".to_string(),
            entity_secret: "abcd".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_missing_entity_secret_blocks_wallet_creation() {
        let adapter = CircleWalletAdapter::new(CircleConfig {
            api_key: "key".to_string(),
            wallet_set_id: "set".to_string(),
            ..Default::default()
        })
        .unwrap();
        let request = CreateWalletRequest {
            idempotency_key: "k-1".to_string(),
            name: None,
        };
        assert!(matches!(
            adapter.create_wallet(&request).await,
            Err(PortError::Validation { .. })
        ));
    }

    #[test]
    fn test_malformed_amount_is_a_transformation_error() {
        assert!(matches!(parse_amount("lots"), Err(PortError::Transformation { .. })));
    }
}
