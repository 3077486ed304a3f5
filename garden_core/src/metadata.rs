use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::MintAggregate;

/// Durable per-garden summary record, stored under both the owner address
/// and the token id. JSON field names are kept wire-compatible with
/// previously stored records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub name: String,

    pub description: String,

    /// Cached garden image; set at creation, replaced only by the
    /// screenshot refresh job
    pub image: String,

    /// Garden page URL; set once at creation
    pub external_url: String,

    /// Owning address, lowercase
    pub address: String,

    #[serde(rename = "uniqueNFTCount")]
    pub unique_nft_count: u32,

    #[serde(rename = "totalNFTCount")]
    pub total_nft_count: u32,

    pub nfts: MintAggregate,
}

fn garden_name(display_name: &str) -> String {
    format!("{}'s Token Garden", display_name)
}

fn garden_description(date_str: Option<&str>, unique_count: u32) -> String {
    format!(
        "A garden that's been growing since {}. It has {} flowers so far.",
        date_str.unwrap_or("the beginning"),
        unique_count
    )
}

impl Metadata {
    /// Build a fresh record for a garden that has never been stored.
    pub fn new(
        address: &str,
        nfts: MintAggregate,
        date_str: Option<&str>,
        display_name: &str,
        token_id: &str,
        website_url: &str,
    ) -> Self {
        let unique_nft_count = nfts.len() as u32;
        let total_nft_count = nfts.total_count();

        Self {
            name: garden_name(display_name),
            description: garden_description(date_str, unique_nft_count),
            image: format!("https://{}/growing.png", website_url),
            external_url: format!("https://{}/garden/{}", website_url, token_id),
            address: address.to_string(),
            unique_nft_count,
            total_nft_count,
            nfts,
        }
    }

    /// Recompute the derived fields against a new aggregate while carrying
    /// over everything else unchanged; `image` and `external_url` survive
    /// byte-for-byte. This is how identity fields outlive re-syncs.
    pub fn updated(
        &self,
        nfts: MintAggregate,
        date_str: Option<&str>,
        display_name: &str,
    ) -> Self {
        let unique_nft_count = nfts.len() as u32;
        let total_nft_count = nfts.total_count();

        Self {
            name: garden_name(display_name),
            description: garden_description(date_str, unique_nft_count),
            unique_nft_count,
            total_nft_count,
            nfts,
            ..self.clone()
        }
    }
}

/// Month+year rendering of a unix-seconds timestamp string, e.g.
/// "April 2021". Returns `None` for absent or unparseable input.
pub fn ts_to_month_and_year(time_stamp: Option<&str>) -> Option<String> {
    let seconds: i64 = time_stamp?.trim().parse().ok()?;
    let date = DateTime::from_timestamp(seconds, 0)?;
    Some(date.format("%B %Y").to_string())
}
