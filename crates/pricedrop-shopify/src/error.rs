use thiserror::Error;

/// Failures talking to the Shopify Admin API.
///
/// None of these are retried by the client; callers decide whether to log
/// and move on or abort.
#[derive(Debug, Error)]
pub enum PriceStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("rate limited by Shopify (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid variant id \"{0}\"")]
    InvalidVariantId(String),

    #[error("invalid Shopify base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("Shopify GraphQL error: {0}")]
    GraphQl(String),
}
