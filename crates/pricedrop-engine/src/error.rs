use pricedrop_core::PricingError;
use pricedrop_db::DbError;
use pricedrop_shopify::PriceStoreError;
use thiserror::Error;

/// Failure that aborts a whole tick or emergency stop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job store error: {0}")]
    Db(#[from] DbError),
}

/// Failure confined to a single job. The job keeps its status.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("price store: {0}")]
    Upstream(#[from] PriceStoreError),

    #[error("pricing: {0}")]
    Pricing(#[from] PricingError),

    #[error("job store: {0}")]
    Persist(#[from] DbError),

    #[error("active job {0} has no original price recorded")]
    MissingOriginalPrice(i64),
}
