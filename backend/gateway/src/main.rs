//! Commitment vault gateway: entry point.
//!
//! Serves the sponsor relay and the read API over HTTP until Ctrl-C.

use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gateway::api::{self, AppState};
use gateway::config::Config;
use gateway::db;
use gateway::relay::RelayClient;
use gateway::rpc::RpcClient;
use gateway::signer::{KeypairSigner, Signer};
use gateway::sponsor::Sponsor;
use gateway::submitter::TransactionSubmitter;
use gateway::vault::VaultClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let pool = db::init_pool(&config.database_url).await?;

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let rpc = Arc::new(RpcClient::new(client, &config.rpc_url));

    let mut submitter = TransactionSubmitter::new(
        rpc,
        config.fee_policy,
        config.confirmation,
        config.network_passphrase.clone(),
    );
    if let Some(url) = &config.relay_url {
        submitter = submitter.with_relay(RelayClient::new(url));
    }
    let submitter = Arc::new(submitter);

    let signer: Option<Arc<dyn Signer>> = match &config.sponsor_secret_key {
        Some(secret) => {
            let key = KeypairSigner::from_secret(secret)?;
            info!("Sponsor relay signing as {}", key.address());
            Some(Arc::new(key) as Arc<dyn Signer>)
        }
        None => {
            warn!("SPONSOR_SECRET_KEY not set; /sponsor will refuse requests");
            None
        }
    };

    let sponsor = Sponsor::new(
        submitter.clone(),
        signer,
        &config.faucet_contract_id,
        pool.clone(),
        config.sponsor_cooldown_secs,
    );
    let state = Arc::new(AppState {
        vault: VaultClient::new(submitter, &config.vault_contract_id),
        sponsor: Arc::new(sponsor),
        pool,
    });

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            shutdown.cancel();
        }
    });

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Gateway stopped");
    Ok(())
}
