use std::time::Duration;

use config_manager::IpfsConfig;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::{RenderError, Result};

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Pins rendered screenshots to IPFS so the cached image URL is
/// content-addressed rather than pointing at the render service.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    client: Client,
    config: IpfsConfig,
}

impl IpfsClient {
    pub fn new(config: IpfsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch `source_url` and add its bytes to IPFS, returning the
    /// gateway URL of the pinned content.
    pub async fn pin_url(&self, source_url: &str) -> Result<String> {
        let image = self.client.get(source_url).send().await?;
        let status = image.status();
        if !status.is_success() {
            error!(source_url, %status, "failed to download image for pinning");
            return Err(RenderError::Api {
                status: status.as_u16(),
                message: format!("image download failed for {}", source_url),
            });
        }
        let bytes = image.bytes().await?;

        let form = Form::new().part("file", Part::bytes(bytes.to_vec()).file_name("garden.png"));

        let response = self
            .client
            .post(format!("{}/api/v0/add", self.config.api_base_url))
            .basic_auth(&self.config.project_id, Some(&self.config.project_secret))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(%status, "IPFS add failed: {}", message);
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let added: AddResponse = response.json().await?;
        let pinned_url = format!("{}{}", self.config.gateway_url, added.hash);
        info!(source_url, pinned_url = %pinned_url, "image pinned to IPFS");

        Ok(pinned_url)
    }
}
