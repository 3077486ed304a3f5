use std::time::Duration;

use async_trait::async_trait;
use config_manager::EnsConfig;
use garden_core::NameResolver;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::Result;

#[derive(Debug, Deserialize)]
struct EnsResolution {
    name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Reverse ENS lookup over HTTP. Strictly best-effort: the orchestrator
/// logs and swallows any failure from this client.
#[derive(Debug, Clone)]
pub struct EnsClient {
    client: Client,
    config: EnsConfig,
}

impl EnsClient {
    pub fn new(config: EnsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn lookup(&self, address: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/ens/resolve/{}",
            self.config.api_base_url,
            address.to_lowercase()
        );

        let resolution: EnsResolution = self.client.get(&url).send().await?.json().await?;
        let name = resolution.name.or(resolution.display_name);
        debug!(address, name = name.as_deref().unwrap_or("<none>"), "ENS lookup");

        Ok(name)
    }
}

#[async_trait]
impl NameResolver for EnsClient {
    async fn resolve_name(&self, address: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lookup(address).await?)
    }
}
