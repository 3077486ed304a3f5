use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chain_client::{EnsClient, EtherscanClient};
use config_manager::GardenConfig;
use persistence_layer::RedisClient;
use render_client::{IpfsClient, OpenSeaClient, UrlboxClient};
use screenshot_queue::{ScreenshotJob, ScreenshotJobHandler, ScreenshotQueue};
use sync_orchestrator::{RefreshPolicy, SyncOrchestrator};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: token_garden <minter-address> <token-id> [--force]";

/// Queue consumer: pins the captured render to IPFS and swaps the pinned
/// URL into both stored records.
struct PinnedImageApplier {
    ipfs: IpfsClient,
    store: RedisClient,
}

#[async_trait]
impl ScreenshotJobHandler for PinnedImageApplier {
    async fn apply_image(&self, job: &ScreenshotJob) -> anyhow::Result<()> {
        let pinned = self.ipfs.pin_url(&job.url).await?;
        let address = self.store.address_for_token(&job.token_id).await?;
        let mut metadata = self.store.get_garden(&job.token_id).await?;
        metadata.image = pinned;
        self.store
            .save_garden(&address, &job.token_id, &metadata)
            .await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let address = args.next().context(USAGE)?;
    let token_id = args.next().context(USAGE)?;
    let force = args.next().as_deref() == Some("--force");

    let config = GardenConfig::load()?;

    let etherscan = EtherscanClient::new(config.etherscan.clone())?;
    let ens = EnsClient::new(config.ens.clone())?;
    let urlbox = UrlboxClient::new(config.urlbox.clone(), config.site.clone())?;
    let opensea = OpenSeaClient::new(config.opensea.clone())?;
    let ipfs = IpfsClient::new(config.ipfs.clone())?;
    let redis = RedisClient::new(&config.redis.url).await?;

    let queue = ScreenshotQueue::new(Arc::new(PinnedImageApplier {
        ipfs,
        store: redis.clone(),
    }));

    let policy = RefreshPolicy {
        initial_delay: config.queue.initial_delay()?,
        retry_schedule: config.queue.retry_schedule()?,
    };

    let orchestrator = SyncOrchestrator::new(
        Arc::new(etherscan),
        Arc::new(ens),
        Arc::new(urlbox),
        Arc::new(opensea),
        Arc::new(redis),
        queue.clone(),
        policy,
        config.site.website_url.clone(),
    );

    let outcome = orchestrator.sync_address(&address, &token_id, force).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // let a scheduled refresh finish before the process exits
    while queue.pending_jobs().await > 0 {
        info!("waiting for screenshot refresh job");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    Ok(())
}
