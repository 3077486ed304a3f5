pub mod aggregate;
pub mod marketplace;
pub mod metadata;

pub use aggregate::{aggregate_mints, AggregateEntry, MintAggregate};
pub use marketplace::{to_marketplace_metadata, Attribute, MarketplaceMetadata};
pub use metadata::{ts_to_month_and_year, Metadata};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Burn address; a transfer originating here is a mint
pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// The Token Garden contract itself, injected into every aggregate
pub const GARDEN_CONTRACT_ADDRESS: &str = "0x7d414bc0482432d2d74021095256aab2e6d3f6b8";

/// One observed NFT transfer, as reported by the transfer-history API.
/// Field names follow the upstream JSON; Etherscan serves every value
/// as a string, timestamps included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NftEvent {
    /// Origin address; equals [`NULL_ADDRESS`] for mints
    pub from: String,

    /// Unix timestamp in seconds, as a decimal string
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,

    /// Collection contract address
    #[serde(rename = "contractAddress")]
    pub contract_address: String,

    #[serde(rename = "tokenSymbol")]
    pub token_symbol: String,

    #[serde(rename = "tokenName")]
    pub token_name: String,
}

impl NftEvent {
    pub fn is_mint(&self) -> bool {
        self.from == NULL_ADDRESS
    }
}

/// Source of a wallet's mint history.
#[async_trait]
pub trait MintEventSource: Send + Sync {
    /// Returns all mint events for the address plus the month+year string
    /// of the earliest one, or `None` when the address has never minted.
    async fn fetch_mint_events(
        &self,
        address: &str,
    ) -> anyhow::Result<(Vec<NftEvent>, Option<String>)>;
}

/// Best-effort reverse lookup of a human-readable wallet name.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, address: &str) -> anyhow::Result<Option<String>>;
}

/// Synchronous screenshot capture returning a fresh image URL.
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    async fn capture(
        &self,
        token_id: &str,
        total_count: u32,
        force_new: bool,
    ) -> anyhow::Result<String>;
}

/// Marketplace listing touch-up; invoked fire-and-forget.
#[async_trait]
pub trait ListingNotifier: Send + Sync {
    async fn refresh_listing(&self, token_id: &str) -> anyhow::Result<()>;
}

/// Metadata persistence keyed by both lowercase address and token id.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load_metadata(&self, key: &str) -> anyhow::Result<Option<Metadata>>;

    /// Writes the same serialized metadata under both lookup keys.
    async fn save_metadata(
        &self,
        address: &str,
        token_id: &str,
        metadata: &Metadata,
    ) -> anyhow::Result<()>;
}
