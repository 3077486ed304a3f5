use std::time::Duration;

use async_trait::async_trait;
use config_manager::EtherscanConfig;
use garden_core::{ts_to_month_and_year, MintEventSource, NftEvent};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{ChainClientError, Result};

/// Raw Etherscan envelope. `status` is "1" on success and "0" otherwise;
/// `result` is an event array on success and an explanatory string on
/// failure, so it stays untyped until the tri-state is resolved.
#[derive(Debug, Clone, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

const NO_TRANSACTIONS: &str = "No transactions found";

/// One resolved page of transfer history.
#[derive(Debug, Clone)]
pub struct TransferPage {
    pub events: Vec<NftEvent>,
}

impl EtherscanResponse {
    /// Resolve the upstream tri-state: success-with-data,
    /// success-with-empty, or failure.
    fn into_page(self) -> Result<TransferPage> {
        if self.message == NO_TRANSACTIONS {
            return Ok(TransferPage { events: Vec::new() });
        }

        if self.status != "1" {
            // usually "Max rate limit reached"
            error!(
                status = %self.status,
                message = %self.message,
                "Etherscan returned a failure status"
            );
            return Err(ChainClientError::Api {
                status: self.status,
                message: format!("{}: {}", self.message, self.result),
            });
        }

        let events: Vec<NftEvent> = serde_json::from_value(self.result)?;
        Ok(TransferPage { events })
    }
}

/// One page of the upstream "get transfers for address" capability.
/// The pagination driver is written against this seam so termination
/// behavior is testable without HTTP.
#[async_trait]
pub trait TransferPageSource: Send + Sync {
    async fn fetch_page(&self, address: &str, page: u32, offset: u32) -> Result<TransferPage>;
}

/// Accumulate transfer pages in ascending page order.
///
/// Stops when a page comes back short of `page_size`, or after
/// `max_pages` pages; Etherscan refuses to serve beyond a fixed page
/// count, so the cap guards against pagination that never goes short.
/// Any page failure aborts the whole fetch with no partial result.
pub async fn fetch_all_transfers<S: TransferPageSource + ?Sized>(
    source: &S,
    address: &str,
    page_size: u32,
    max_pages: u32,
) -> Result<Vec<NftEvent>> {
    let mut transfers = Vec::new();
    let mut page = 1u32;

    loop {
        let fetched = source.fetch_page(address, page, page_size).await?;
        let page_len = fetched.events.len() as u32;
        debug!(page, events = page_len, "fetched transfer page");
        transfers.extend(fetched.events);

        if page_len < page_size || page >= max_pages {
            break;
        }
        page += 1;
    }

    info!(
        address,
        pages = page,
        transfers = transfers.len(),
        "transfer history collected"
    );

    Ok(transfers)
}

/// Etherscan NFT-transfer history client.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: Client,
    config: EtherscanConfig,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    /// Full fetch pipeline for one address: paginate, filter to mints,
    /// and derive the earliest-mint month+year string.
    pub async fn fetch_mints(&self, address: &str) -> Result<(Vec<NftEvent>, Option<String>)> {
        let address = address.to_lowercase();
        let transfers =
            fetch_all_transfers(self, &address, self.config.page_size, self.config.max_pages)
                .await?;

        let mints: Vec<NftEvent> = transfers.into_iter().filter(NftEvent::is_mint).collect();

        // pages are requested oldest-first, so the first mint is the earliest
        let date_str = ts_to_month_and_year(mints.first().map(|event| event.time_stamp.as_str()));

        info!(
            address = %address,
            network = %self.config.network,
            mints = mints.len(),
            since = date_str.as_deref().unwrap_or("never"),
            "mint history resolved"
        );

        Ok((mints, date_str))
    }
}

#[async_trait]
impl TransferPageSource for EtherscanClient {
    async fn fetch_page(&self, address: &str, page: u32, offset: u32) -> Result<TransferPage> {
        let response = self
            .client
            .get(&self.config.api_base_url)
            .query(&[
                ("module", "account"),
                ("action", "tokennfttx"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "latest"),
                ("page", &page.to_string()),
                ("offset", &offset.to_string()),
                ("sort", "asc"),
                ("apikey", &self.config.api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, page, "Etherscan HTTP error: {}", text);
            return Err(ChainClientError::Api {
                status: status.as_u16().to_string(),
                message: text,
            });
        }

        let envelope: EtherscanResponse = response.json().await?;
        envelope.into_page()
    }
}

#[async_trait]
impl MintEventSource for EtherscanClient {
    async fn fetch_mint_events(
        &self,
        address: &str,
    ) -> anyhow::Result<(Vec<NftEvent>, Option<String>)> {
        Ok(self.fetch_mints(address).await?)
    }
}
