use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::NftEvent;

/// Collections surfaced with the `special` flag in aggregates.
/// Addresses are lowercase.
pub const SPECIAL_COLLECTIONS: &[&str] = &[
    // Token Garden itself
    crate::GARDEN_CONTRACT_ADDRESS,
    // Loot (for Adventurers)
    "0xff9c1b15b16263c61d017ee9f65c50e4ae0113d7",
    // CryptoCoven
    "0x5180db8f5c931aae63c74266b211f580155ecac8",
];

/// One collection's tally for an address. The contract address lives only
/// as the [`MintAggregate`] key, never inside the entry payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateEntry {
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: String,

    #[serde(rename = "tokenName")]
    pub token_name: String,

    pub count: u32,

    #[serde(default, skip_serializing_if = "is_false")]
    pub special: bool,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

impl AggregateEntry {
    /// The synthetic entry for the platform's own token; every garden
    /// contains at least this one.
    pub fn garden_token() -> Self {
        Self {
            token_symbol: "TGRDN".to_string(),
            token_name: "Token Garden".to_string(),
            count: 1,
            special: true,
        }
    }
}

/// Deduplicated per-collection tally keyed by contract address.
///
/// Insertion order of first occurrence is preserved and is the iteration
/// order; JSON serialization is a plain object in that same order, which
/// keeps stored records byte-compatible with previously written ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintAggregate {
    entries: Vec<(String, AggregateEntry)>,
}

impl MintAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, contract_address: &str) -> Option<&AggregateEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == contract_address)
            .map(|(_, entry)| entry)
    }

    /// Insert-or-replace under a contract address key.
    pub fn insert(&mut self, contract_address: &str, entry: AggregateEntry) {
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key == contract_address)
        {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((contract_address.to_string(), entry)),
        }
    }

    /// Fold one mint event into the tally: first occurrence of a contract
    /// creates an entry with count 1 (flagged when on the allow-list),
    /// later occurrences increment.
    pub fn record(&mut self, event: &NftEvent) {
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key == &event.contract_address)
        {
            Some((_, entry)) => entry.count += 1,
            None => {
                let entry = AggregateEntry {
                    token_symbol: event.token_symbol.clone(),
                    token_name: event.token_name.clone(),
                    count: 1,
                    special: SPECIAL_COLLECTIONS.contains(&event.contract_address.as_str()),
                };
                self.entries.push((event.contract_address.clone(), entry));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateEntry)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Sum of all per-collection counts
    pub fn total_count(&self) -> u32 {
        self.entries.iter().map(|(_, entry)| entry.count).sum()
    }

    pub fn special_entries(&self) -> impl Iterator<Item = &AggregateEntry> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.special)
            .map(|(_, entry)| entry)
    }
}

impl Serialize for MintAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MintAggregate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AggregateVisitor;

        impl<'de> Visitor<'de> for AggregateVisitor {
            type Value = MintAggregate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of contract address to aggregate entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, entry)) = access.next_entry::<String, AggregateEntry>()? {
                    entries.push((key, entry));
                }
                Ok(MintAggregate { entries })
            }
        }

        deserializer.deserialize_map(AggregateVisitor)
    }
}

/// Collapse a mint-event sequence into a per-collection tally,
/// left-to-right in received order.
pub fn aggregate_mints(events: &[NftEvent]) -> MintAggregate {
    let mut aggregate = MintAggregate::new();
    for event in events {
        aggregate.record(event);
    }
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NULL_ADDRESS;

    fn mint(contract: &str, symbol: &str) -> NftEvent {
        NftEvent {
            from: NULL_ADDRESS.to_string(),
            time_stamp: "1620000000".to_string(),
            contract_address: contract.to_string(),
            token_symbol: symbol.to_string(),
            token_name: format!("{} Collection", symbol),
        }
    }

    #[test]
    fn counts_distinct_contracts() {
        let events = vec![mint("0xaaa", "AAA"), mint("0xaaa", "AAA"), mint("0xbbb", "BBB")];

        let aggregate = aggregate_mints(&events);

        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.get("0xaaa").unwrap().count, 2);
        assert_eq!(aggregate.get("0xbbb").unwrap().count, 1);
        assert_eq!(aggregate.total_count(), 3);
    }

    #[test]
    fn preserves_first_occurrence_order() {
        let events = vec![mint("0xccc", "CCC"), mint("0xaaa", "AAA"), mint("0xccc", "CCC")];

        let aggregate = aggregate_mints(&events);
        let keys: Vec<&str> = aggregate.iter().map(|(key, _)| key).collect();

        assert_eq!(keys, vec!["0xccc", "0xaaa"]);
    }

    #[test]
    fn flags_allow_listed_collections() {
        let events = vec![
            mint("0xff9c1b15b16263c61d017ee9f65c50e4ae0113d7", "LOOT"),
            mint("0xaaa", "AAA"),
        ];

        let aggregate = aggregate_mints(&events);

        assert!(aggregate
            .get("0xff9c1b15b16263c61d017ee9f65c50e4ae0113d7")
            .unwrap()
            .special);
        assert!(!aggregate.get("0xaaa").unwrap().special);
        assert_eq!(aggregate.special_entries().count(), 1);
    }

    #[test]
    fn empty_input_yields_empty_aggregate() {
        let aggregate = aggregate_mints(&[]);
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.total_count(), 0);
    }

    #[test]
    fn serializes_as_ordered_object_without_contract_in_payload() {
        let mut aggregate = aggregate_mints(&[mint("0xbbb", "BBB"), mint("0xaaa", "AAA")]);
        aggregate.insert(crate::GARDEN_CONTRACT_ADDRESS, AggregateEntry::garden_token());

        let json = serde_json::to_string(&aggregate).unwrap();

        // keys appear in insertion order, once each
        let bbb = json.find("0xbbb").unwrap();
        let aaa = json.find("0xaaa").unwrap();
        assert!(bbb < aaa);
        assert_eq!(json.matches("0xbbb").count(), 1);

        let parsed: MintAggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, aggregate);
    }
}
