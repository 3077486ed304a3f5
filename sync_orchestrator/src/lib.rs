use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use garden_core::{
    aggregate_mints, AggregateEntry, ListingNotifier, Metadata, MetadataStore, MintAggregate,
    MintEventSource, NameResolver, ScreenshotCapture, GARDEN_CONTRACT_ADDRESS,
};
use screenshot_queue::{EnqueueOptions, ScreenshotJob, ScreenshotQueue};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Result record of one synchronization pass. Mirrors an HTTP response
/// shape so the routing layer can forward it untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SyncResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub token_id: String,
    pub minter_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Retry policy handed to the screenshot queue on every refresh.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub initial_delay: Duration,
    pub retry_schedule: Vec<Duration>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        let defaults = EnqueueOptions::default();
        Self {
            initial_delay: defaults.delay,
            retry_schedule: defaults.retry_schedule,
        }
    }
}

/// Drives one full metadata synchronization pass per call: fetch mint
/// history, aggregate, merge with the stored record, persist under both
/// lookup keys, then either schedule a screenshot refresh or nudge the
/// marketplace listing.
///
/// All collaborators are injected; nothing here owns process-wide state.
pub struct SyncOrchestrator {
    events: Arc<dyn MintEventSource>,
    names: Arc<dyn NameResolver>,
    capture: Arc<dyn ScreenshotCapture>,
    listings: Arc<dyn ListingNotifier>,
    store: Arc<dyn MetadataStore>,
    queue: ScreenshotQueue,
    policy: RefreshPolicy,
    website_url: String,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn MintEventSource>,
        names: Arc<dyn NameResolver>,
        capture: Arc<dyn ScreenshotCapture>,
        listings: Arc<dyn ListingNotifier>,
        store: Arc<dyn MetadataStore>,
        queue: ScreenshotQueue,
        policy: RefreshPolicy,
        website_url: String,
    ) -> Self {
        Self {
            events,
            names,
            capture,
            listings,
            store,
            queue,
            policy,
            website_url,
        }
    }

    /// One synchronization pass for a minting address. Never panics and
    /// never propagates an error; both failure domains are folded into
    /// the outcome with distinct messages.
    pub async fn sync_address(
        &self,
        minter_address: &str,
        token_id: &str,
        force_screenshot: bool,
    ) -> SyncOutcome {
        let address = minter_address.to_lowercase();
        info!(address = %address, token_id, force_screenshot, "begin garden sync");

        // Fetch-stage failure domain: abort before touching stored state.
        let (events, date_str) = match self.events.fetch_mint_events(&address).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!(address = %address, token_id, "mint history fetch failed: {e:#}");
                return SyncOutcome {
                    status_code: 500,
                    message: format!("failed to fetch mint history for {}", address),
                    result: None,
                    error: Some(format!("{e:#}")),
                };
            }
        };

        let mut nfts = aggregate_mints(&events);
        // every garden holds the platform's own token, external mints or not
        nfts.insert(GARDEN_CONTRACT_ADDRESS, AggregateEntry::garden_token());

        // Best-effort enrichment: a failed lookup degrades to the address.
        let user_name = match self.names.resolve_name(&address).await {
            Ok(name) => name,
            Err(e) => {
                warn!(address = %address, "name resolution failed, continuing: {e:#}");
                None
            }
        };
        let display_name = user_name
            .clone()
            .unwrap_or_else(|| abbreviated_address(&address));

        match self
            .persist_and_refresh(
                &address,
                token_id,
                nfts,
                date_str.as_deref(),
                &display_name,
                force_screenshot,
            )
            .await
        {
            Ok(message) => {
                info!(address = %address, token_id, %message, "garden sync complete");
                SyncOutcome {
                    status_code: 200,
                    message,
                    result: Some(SyncResult {
                        token_id: token_id.to_string(),
                        minter_address: address,
                        display_name: user_name,
                    }),
                    error: None,
                }
            }
            Err(e) => {
                error!(address = %address, token_id, "persist/refresh failed: {e:#}");
                SyncOutcome {
                    status_code: 500,
                    message: format!("failed to update cache or schedule refresh for {}", address),
                    result: None,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }

    /// Persistence/refresh failure domain: everything past the fetch.
    async fn persist_and_refresh(
        &self,
        address: &str,
        token_id: &str,
        nfts: MintAggregate,
        date_str: Option<&str>,
        display_name: &str,
        force_screenshot: bool,
    ) -> anyhow::Result<String> {
        let prior = self
            .store
            .load_metadata(token_id)
            .await
            .context("loading prior metadata")?;

        // The update path keeps identity fields (image, external_url)
        // from the stored record; the create path mints fresh ones.
        let metadata = match &prior {
            Some(prior) => prior.updated(nfts, date_str, display_name),
            None => Metadata::new(
                address,
                nfts,
                date_str,
                display_name,
                token_id,
                &self.website_url,
            ),
        };

        self.store
            .save_metadata(address, token_id, &metadata)
            .await
            .context("saving metadata")?;

        let unique_count_changed =
            prior.as_ref().map(|p| p.unique_nft_count) != Some(metadata.unique_nft_count);

        if unique_count_changed || force_screenshot {
            let message = if force_screenshot && !unique_count_changed {
                "screenshot manually forced".to_string()
            } else {
                "unique collection count changed, new screenshot".to_string()
            };

            let image_url = self
                .capture
                .capture(token_id, metadata.total_nft_count, true)
                .await
                .context("capturing screenshot")?;

            let job_id = format!("{}-{}", token_id, metadata.total_nft_count);
            let handle = self
                .queue
                .enqueue(
                    ScreenshotJob {
                        id: job_id,
                        url: image_url,
                        token_id: token_id.to_string(),
                    },
                    EnqueueOptions {
                        delay: self.policy.initial_delay,
                        retry_schedule: self.policy.retry_schedule.clone(),
                        override_existing: false,
                    },
                )
                .await;
            info!(job_id = %handle.id, "screenshot refresh scheduled");

            Ok(message)
        } else {
            // No visual change: nudge the marketplace listing, detached;
            // its failure is logged and never joined into this pass.
            let listings = Arc::clone(&self.listings);
            let token_id = token_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = listings.refresh_listing(&token_id).await {
                    warn!(token_id, "listing touch-up failed: {e:#}");
                }
            });

            Ok("unique collection count unchanged, no new screenshot".to_string())
        }
    }
}

fn abbreviated_address(address: &str) -> String {
    if address.len() > 10 {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}
