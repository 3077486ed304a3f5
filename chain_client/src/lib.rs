pub mod ens;
pub mod etherscan;

pub use ens::EnsClient;
pub use etherscan::{fetch_all_transfers, EtherscanClient, TransferPage, TransferPageSource};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {message}")]
    Api { status: String, message: String },
}

pub type Result<T> = std::result::Result<T, ChainClientError>;
