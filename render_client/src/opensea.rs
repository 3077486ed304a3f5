use std::time::Duration;

use async_trait::async_trait;
use config_manager::OpenSeaConfig;
use garden_core::{ListingNotifier, GARDEN_CONTRACT_ADDRESS};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{RenderError, Result};

/// Asks OpenSea to re-pull a token's metadata. Callers treat this as
/// fire-and-forget; a failed touch-up never fails a sync.
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    client: Client,
    config: OpenSeaConfig,
}

impl OpenSeaClient {
    pub fn new(config: OpenSeaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn force_update_metadata(&self, token_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/v1/asset/{}/{}/?force_update=true",
            self.config.api_base_url, GARDEN_CONTRACT_ADDRESS, token_id
        );

        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-API-KEY", api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(token_id, %status, "OpenSea metadata refresh rejected");
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(token_id, "OpenSea metadata refresh requested");
        Ok(())
    }
}

#[async_trait]
impl ListingNotifier for OpenSeaClient {
    async fn refresh_listing(&self, token_id: &str) -> anyhow::Result<()> {
        Ok(self.force_update_metadata(token_id).await?)
    }
}
