use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,

    pub trait_type: String,

    pub value: Value,
}

impl Attribute {
    fn plain(trait_type: &str, value: Value) -> Self {
        Self {
            display_type: None,
            trait_type: trait_type.to_string(),
            value,
        }
    }
}

/// Metadata reshaped into the marketplace attribute schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketplaceMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<Attribute>,
}

/// Reshape a stored record for marketplace consumption. Counts are
/// emitted twice, as strings and as numbers; marketplaces index string
/// traits as properties and numeric traits as stats.
pub fn to_marketplace_metadata(metadata: &Metadata) -> MarketplaceMetadata {
    let special: Vec<_> = metadata.nfts.special_entries().collect();

    let mut attributes = vec![
        Attribute::plain("address", json!(metadata.address)),
        Attribute::plain("unique NFTs", json!(metadata.unique_nft_count.to_string())),
        Attribute::plain("total NFTs", json!(metadata.total_nft_count.to_string())),
        Attribute::plain("special NFTs", json!(special.len().to_string())),
        Attribute::plain("unique NFTs", json!(metadata.unique_nft_count)),
        Attribute::plain("total NFTs", json!(metadata.total_nft_count)),
        Attribute::plain("special NFTs", json!(special.len())),
        Attribute::plain("Color set", json!(color_set(&metadata.address).to_string())),
    ];

    for entry in &special {
        attributes.push(Attribute::plain(
            &entry.token_name,
            json!(format!("mints: {}", entry.count)),
        ));
    }

    MarketplaceMetadata {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        image: metadata.image.clone(),
        external_url: metadata.external_url.clone(),
        attributes,
    }
}

/// Deterministic color set in 1..=3 derived from the address (FNV-1a),
/// so a garden keeps its palette across re-syncs.
pub fn color_set(address: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in address.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash % 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateEntry;
    use crate::{MintAggregate, GARDEN_CONTRACT_ADDRESS};

    fn sample_metadata() -> Metadata {
        let mut nfts = MintAggregate::new();
        nfts.insert(
            "0xaaa",
            AggregateEntry {
                token_symbol: "AAA".to_string(),
                token_name: "Alpha".to_string(),
                count: 2,
                special: false,
            },
        );
        nfts.insert(GARDEN_CONTRACT_ADDRESS, AggregateEntry::garden_token());

        Metadata::new(
            "0xabc",
            nfts,
            Some("May 2021"),
            "gardener.eth",
            "7",
            "tokengarden.art",
        )
    }

    #[test]
    fn emits_string_and_numeric_count_variants() {
        let shaped = to_marketplace_metadata(&sample_metadata());

        let unique: Vec<&Value> = shaped
            .attributes
            .iter()
            .filter(|a| a.trait_type == "unique NFTs")
            .map(|a| &a.value)
            .collect();

        assert_eq!(unique, vec![&json!("2"), &json!(2)]);

        let total: Vec<&Value> = shaped
            .attributes
            .iter()
            .filter(|a| a.trait_type == "total NFTs")
            .map(|a| &a.value)
            .collect();

        assert_eq!(total, vec![&json!("3"), &json!(3)]);
    }

    #[test]
    fn lists_special_collections_individually() {
        let shaped = to_marketplace_metadata(&sample_metadata());

        let garden = shaped
            .attributes
            .iter()
            .find(|a| a.trait_type == "Token Garden")
            .unwrap();

        assert_eq!(garden.value, json!("mints: 1"));
    }

    #[test]
    fn color_set_is_deterministic_and_bounded() {
        for address in ["0xabc", "0xdef", "0x2e0e3f06289627a0c26fe84178fbb10add0e7c4c"] {
            let first = color_set(address);
            assert_eq!(first, color_set(address));
            assert!((1..=3).contains(&first));
        }
        // distinct addresses should not all collapse to one bucket
        let spread: std::collections::HashSet<u32> =
            (0..16).map(|i| color_set(&format!("0x{:040x}", i))).collect();
        assert!(spread.len() > 1);
    }
}
