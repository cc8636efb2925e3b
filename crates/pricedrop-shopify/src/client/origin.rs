//! Admin API base-URL construction.

use reqwest::Url;

use crate::error::PriceStoreError;

/// Builds the shop origin from a configured store domain.
///
/// Accepts a bare domain (`"example.myshopify.com"`) or a full URL with any
/// path, which is dropped: `"https://example.myshopify.com/admin"` becomes
/// `"https://example.myshopify.com"`.
pub(super) fn store_origin(store_domain: &str) -> Result<Url, PriceStoreError> {
    let trimmed = store_domain.trim().trim_end_matches('/');
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| PriceStoreError::InvalidBaseUrl {
        base_url: store_domain.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(PriceStoreError::InvalidBaseUrl {
            base_url: store_domain.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Url::parse(&parsed.origin().ascii_serialization()).map_err(|e| {
        PriceStoreError::InvalidBaseUrl {
            base_url: store_domain.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Appends `admin/api/{version}/` to an origin, keeping a trailing slash so
/// relative joins land under the versioned root.
pub(super) fn admin_root(origin: &Url, api_version: &str) -> Result<Url, PriceStoreError> {
    let base = format!(
        "{}/admin/api/{}/",
        origin.as_str().trim_end_matches('/'),
        api_version.trim_matches('/')
    );
    Url::parse(&base).map_err(|e| PriceStoreError::InvalidBaseUrl {
        base_url: base.clone(),
        reason: e.to_string(),
    })
}
