//! Shopify variant identifiers arrive either as bare numbers (`"4412"`) or as
//! Admin GraphQL global IDs (`"gid://shopify/ProductVariant/4412"`).

use crate::error::PriceStoreError;

const VARIANT_GID_PREFIX: &str = "gid://shopify/ProductVariant/";

/// Returns the numeric part of a variant id.
///
/// # Errors
///
/// Returns [`PriceStoreError::InvalidVariantId`] if the id is neither a
/// number nor a `ProductVariant` GID wrapping one.
pub fn numeric_variant_id(raw: &str) -> Result<&str, PriceStoreError> {
    let trimmed = raw.trim();
    let numeric = trimmed.strip_prefix(VARIANT_GID_PREFIX).unwrap_or(trimmed);

    if numeric.is_empty() || !numeric.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceStoreError::InvalidVariantId(raw.to_string()));
    }
    Ok(numeric)
}

/// Returns the Admin GraphQL global ID for a variant.
///
/// # Errors
///
/// Same as [`numeric_variant_id`].
pub fn variant_gid(raw: &str) -> Result<String, PriceStoreError> {
    numeric_variant_id(raw).map(|id| format!("{VARIANT_GID_PREFIX}{id}"))
}
