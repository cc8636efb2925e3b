pub mod client;
pub mod error;
pub mod store;
pub mod types;
pub mod variant_id;

pub use client::ShopifyClient;
pub use error::PriceStoreError;
pub use store::{PriceStore, VariantPrice};
pub use types::VariantSummary;
pub use variant_id::{numeric_variant_id, variant_gid};
