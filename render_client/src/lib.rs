pub mod ipfs;
pub mod opensea;
pub mod urlbox;

pub use ipfs::IpfsClient;
pub use opensea::OpenSeaClient;
pub use urlbox::UrlboxClient;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, RenderError>;
