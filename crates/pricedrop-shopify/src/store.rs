//! The price-store seam the scheduler drives.

use std::future::Future;

use crate::error::PriceStoreError;

/// A variant's current price pair, as strings exactly as the store reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPrice {
    pub price: String,
    /// `None` when the variant has no compare-at price.
    pub compare_at_price: Option<String>,
}

/// Read/write access to variant prices in an external catalog.
///
/// Implementations must not retry; a failed call surfaces immediately.
pub trait PriceStore: Send + Sync {
    /// Reads the current price and compare-at price of a variant.
    fn read_price(
        &self,
        variant_id: &str,
    ) -> impl Future<Output = Result<VariantPrice, PriceStoreError>> + Send;

    /// Overwrites a variant's price and compare-at price.
    ///
    /// A `None` compare-at explicitly clears the field rather than leaving
    /// it untouched.
    fn write_price(
        &self,
        variant_id: &str,
        price: &str,
        compare_at_price: Option<&str>,
    ) -> impl Future<Output = Result<(), PriceStoreError>> + Send;
}
