use std::time::Duration;

use async_trait::async_trait;
use config_manager::{SiteConfig, UrlboxConfig};
use garden_core::ScreenshotCapture;
use reqwest::Client;
use tracing::{error, info};

use crate::{RenderError, Result};

/// Urlbox screenshot client. A capture renders the garden page headlessly
/// and returns the URL of the produced PNG; the render itself is kicked
/// synchronously so a failed render fails the refresh branch immediately.
#[derive(Debug, Clone)]
pub struct UrlboxClient {
    client: Client,
    config: UrlboxConfig,
    site: SiteConfig,
}

impl UrlboxClient {
    pub fn new(config: UrlboxConfig, site: SiteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            site,
        })
    }

    /// Build the render URL for a garden page. The total mint count is
    /// folded in as a cache-buster so a changed garden re-renders.
    fn render_url(&self, token_id: &str, total_count: u32, force_new: bool) -> String {
        format!(
            "{}/{}/png?url=https%3A%2F%2F{}%2Fgarden%2F{}&width=1024&height=1024&unique={}&force={}",
            self.config.api_base_url,
            self.config.api_key,
            self.site.website_url,
            token_id,
            total_count,
            force_new,
        )
    }

    pub async fn activate(
        &self,
        token_id: &str,
        total_count: u32,
        force_new: bool,
    ) -> Result<String> {
        let url = self.render_url(token_id, total_count, force_new);
        info!(token_id, total_count, "activating urlbox render");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(token_id, %status, "urlbox render failed: {}", message);
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(url)
    }
}

#[async_trait]
impl ScreenshotCapture for UrlboxClient {
    async fn capture(
        &self,
        token_id: &str,
        total_count: u32,
        force_new: bool,
    ) -> anyhow::Result<String> {
        Ok(self.activate(token_id, total_count, force_new).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UrlboxClient {
        UrlboxClient::new(
            UrlboxConfig {
                api_key: "KEY".to_string(),
                api_base_url: "https://api.urlbox.io/v1".to_string(),
                request_timeout_seconds: 5,
            },
            SiteConfig {
                website_url: "tokengarden.art".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn render_url_embeds_token_and_cache_buster() {
        let url = client().render_url("7", 12, true);

        assert!(url.starts_with("https://api.urlbox.io/v1/KEY/png?"));
        assert!(url.contains("tokengarden.art%2Fgarden%2F7"));
        assert!(url.contains("unique=12"));
        assert!(url.contains("force=true"));
    }
}
