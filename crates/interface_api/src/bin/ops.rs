//! ClaimLedger operations CLI
//!
//! ```bash
//! claimledger-ops generate-keypair
//! claimledger-ops create-wallet --name treasury
//! claimledger-ops check-balance --address 0x... --wallet-id <circle-wallet-id>
//! claimledger-ops check-connections
//! ```
//!
//! Reads the same `CLAIMLEDGER_*` configuration as the API server.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use core_kernel::{EvmAddress, HealthCheckResult, HealthCheckable};
use domain_wallet::{CreateWalletRequest, WalletProviderPort};
use infra_chain::generate_keypair;
use infra_db::PostgresClaimStore;
use interface_api::bootstrap::{build_analyzer, build_chain, build_wallet_provider, init_tracing};
use interface_api::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "claimledger-ops", version, about = "ClaimLedger operational commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generates a raw keypair for the auto-settle account
    GenerateKeypair,
    /// Creates a custodial wallet at Circle
    CreateWallet {
        #[arg(long)]
        name: Option<String>,
        /// Reuse to retry a creation without getting a second wallet
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Prints USDC balances for an address
    CheckBalance {
        /// Defaults to the auto-settle account
        #[arg(long)]
        address: Option<String>,
        /// Circle wallet id, for per-wallet token balances
        #[arg(long)]
        wallet_id: Option<String>,
    },
    /// Checks every configured external dependency
    CheckConnections,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.server);

    match cli.command {
        Command::GenerateKeypair => generate(),
        Command::CreateWallet {
            name,
            idempotency_key,
        } => create_wallet(&config, name, idempotency_key).await,
        Command::CheckBalance { address, wallet_id } => {
            check_balance(&config, address, wallet_id).await
        }
        Command::CheckConnections => check_connections(&config).await,
    }
}

fn generate() -> anyhow::Result<()> {
    let keypair = generate_keypair()?;
    println!("address:     {}", keypair.address);
    println!("private key: {}", keypair.private_key);
    println!();
    println!("Store the key as CLAIMLEDGER_CHAIN__SETTLEMENT_PRIVATE_KEY and fund the address with USDC and gas.");
    Ok(())
}

async fn create_wallet(
    config: &AppConfig,
    name: Option<String>,
    idempotency_key: Option<String>,
) -> anyhow::Result<()> {
    let provider = build_wallet_provider(config)?
        .ok_or_else(|| anyhow!("CLAIMLEDGER_CIRCLE__API_KEY is not set"))?;

    let request = CreateWalletRequest {
        idempotency_key: idempotency_key.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name,
    };
    let wallet = provider.create_wallet(&request).await?;

    println!("wallet id:  {}", wallet.id);
    println!("address:    {}", wallet.address);
    println!("blockchain: {}", wallet.blockchain);
    println!("idempotency key: {}", request.idempotency_key);
    Ok(())
}

async fn check_balance(
    config: &AppConfig,
    address: Option<String>,
    wallet_id: Option<String>,
) -> anyhow::Result<()> {
    let chain = build_chain(config)?;
    let address = match (address, &chain) {
        (Some(raw), _) => EvmAddress::parse(&raw)?,
        (None, Some(chain)) => chain.sender()?,
        (None, None) => {
            return Err(anyhow!(
                "pass --address or configure CLAIMLEDGER_CHAIN__SETTLEMENT_PRIVATE_KEY"
            ))
        }
    };
    println!("address: {}", address);

    if let Some(chain) = &chain {
        let usdc = chain.usdc_balance(&address).await?;
        let native = chain.native_balance(&address).await?;
        println!("on-chain USDC: {}", usdc);
        println!("native (wei):  {}", native);
    }

    if let Some(provider) = build_wallet_provider(config)? {
        if let Some(wallet_id) = wallet_id.as_deref() {
            for balance in provider.get_balances(wallet_id).await? {
                println!(
                    "wallet {}: {} {}",
                    balance.blockchain.as_deref().unwrap_or("-"),
                    balance.amount,
                    balance.symbol
                );
            }
        }
        match provider.unified_balance(&address).await {
            Ok(unified) => {
                println!("unified {}: {}", unified.token, unified.total);
                for domain in unified.domains {
                    println!("  domain {}: {}", domain.domain, domain.balance);
                }
            }
            Err(e) => println!("unified balance unavailable: {}", e),
        }
    }
    Ok(())
}

async fn check_connections(config: &AppConfig) -> anyhow::Result<()> {
    let mut results: Vec<HealthCheckResult> = Vec::new();

    match infra_db::create_pool(config.database.pool_config()).await {
        Ok(pool) => results.push(PostgresClaimStore::new(pool).health_check().await),
        Err(e) => results.push(HealthCheckResult::unhealthy("postgres", 0, e.to_string())),
    }

    let analyzer = build_analyzer(config)?;
    results.push(analyzer.health_check().await);

    if let Some(provider) = build_wallet_provider(config)? {
        results.push(provider.health_check().await);
    }

    if let Some(chain) = build_chain(config)? {
        let health = chain.health_check().await;
        if health.is_operational() {
            let remote = chain.remote_chain_id().await?;
            if remote != config.chain.chain_id {
                println!(
                    "warning: RPC reports chain id {} but {} is configured",
                    remote, config.chain.chain_id
                );
            }
        }
        results.push(health);
    }

    let failures = report(&results);
    if failures > 0 {
        return Err(anyhow!("{} connection check(s) failed", failures));
    }
    Ok(())
}

fn report(results: &[HealthCheckResult]) -> usize {
    for result in results {
        let mark = if result.is_operational() { "ok  " } else { "FAIL" };
        println!(
            "[{}] {:<16} {:>5}ms {}",
            mark,
            result.adapter_id,
            result.latency_ms,
            result.message.as_deref().unwrap_or("")
        );
    }
    results.iter().filter(|r| !r.is_operational()).count()
}

