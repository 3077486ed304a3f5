use async_trait::async_trait;
use garden_core::{Metadata, MetadataStore};
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Record not found for key: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Flat key→hash store for garden metadata. Every garden is written under
/// two keys — the lowercase owner address and the token id — each carrying
/// the cross-reference field needed to answer a reverse lookup.
///
/// The dual write is deliberately not transactional; a crash between the
/// two writes leaves the index inconsistent until the next sync rewrites
/// both records.
#[derive(Debug, Clone)]
pub struct RedisClient {
    client: Client,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        // Test the connection
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(PersistenceError::from)
    }

    /// Store a garden under both lookup keys with an identical serialized
    /// payload.
    pub async fn save_garden(
        &self,
        address: &str,
        token_id: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let address = address.to_lowercase();
        let payload = serde_json::to_string(metadata)?;
        let mut conn = self.get_connection().await?;

        let _: () = conn
            .hset_multiple(
                &address,
                &[("tokenId", token_id), ("metadata", payload.as_str())],
            )
            .await?;
        let _: () = conn
            .hset_multiple(
                token_id,
                &[("address", address.as_str()), ("metadata", payload.as_str())],
            )
            .await?;

        info!(address = %address, token_id, "garden metadata stored under both keys");
        Ok(())
    }

    /// Load a garden by either lookup key (token id or lowercase address).
    pub async fn load_garden(&self, key: &str) -> Result<Option<Metadata>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.hget(key.to_lowercase(), "metadata").await?;

        match raw {
            Some(json) => {
                let metadata: Metadata = serde_json::from_str(&json)?;
                debug!(key, "garden metadata loaded");
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    /// Like [`load_garden`] but absence is an error; used by callers that
    /// answer external lookups.
    pub async fn get_garden(&self, key: &str) -> Result<Metadata> {
        self.load_garden(key)
            .await?
            .ok_or_else(|| PersistenceError::NotFound(key.to_string()))
    }

    /// Reverse lookup: token id minted by an address.
    pub async fn token_id_for_address(&self, address: &str) -> Result<String> {
        let mut conn = self.get_connection().await?;
        let token_id: Option<String> = conn.hget(address.to_lowercase(), "tokenId").await?;
        token_id.ok_or_else(|| PersistenceError::NotFound(address.to_string()))
    }

    /// Reverse lookup: owning address for a token id.
    pub async fn address_for_token(&self, token_id: &str) -> Result<String> {
        let mut conn = self.get_connection().await?;
        let address: Option<String> = conn.hget(token_id, "address").await?;
        address.ok_or_else(|| PersistenceError::NotFound(token_id.to_string()))
    }
}

#[async_trait]
impl MetadataStore for RedisClient {
    async fn load_metadata(&self, key: &str) -> anyhow::Result<Option<Metadata>> {
        Ok(self.load_garden(key).await?)
    }

    async fn save_metadata(
        &self,
        address: &str,
        token_id: &str,
        metadata: &Metadata,
    ) -> anyhow::Result<()> {
        Ok(self.save_garden(address, token_id, metadata).await?)
    }
}
