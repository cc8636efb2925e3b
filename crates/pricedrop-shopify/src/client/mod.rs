//! HTTP client for the Shopify Admin API.

mod catalog;
mod origin;

use std::time::Duration;

use reqwest::{Client, Response, Url};

use crate::error::PriceStoreError;
use crate::store::{PriceStore, VariantPrice};
use crate::types::{VariantEnvelope, VariantUpdate, VariantUpdateEnvelope};
use crate::variant_id::numeric_variant_id;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Client for one shop's Admin API.
///
/// Prices are read and written through the REST `variants/{id}.json`
/// resource; catalog metadata comes from one GraphQL `nodes` query. Non-2xx
/// responses become typed errors and nothing is retried.
pub struct ShopifyClient {
    client: Client,
    admin_root: Url,
    access_token: String,
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("admin_root", &self.admin_root.as_str())
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl ShopifyClient {
    /// Creates a client for `store_domain` (e.g. `example.myshopify.com`).
    ///
    /// # Errors
    ///
    /// Returns [`PriceStoreError::InvalidBaseUrl`] if the domain cannot form a
    /// URL, or [`PriceStoreError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        store_domain: &str,
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, PriceStoreError> {
        let origin = origin::store_origin(store_domain)?;
        Self::with_origin(&origin, access_token, api_version, timeout_secs)
    }

    /// Creates a client against an explicit base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::new`].
    pub fn with_base_url(
        base_url: &str,
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, PriceStoreError> {
        let origin = Url::parse(base_url).map_err(|e| PriceStoreError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Self::with_origin(&origin, access_token, api_version, timeout_secs)
    }

    fn with_origin(
        origin: &Url,
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, PriceStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pricedrop/0.1 (scheduled-discounts)")
            .build()?;

        Ok(Self {
            client,
            admin_root: origin::admin_root(origin, api_version)?,
            access_token: access_token.to_owned(),
        })
    }

    /// Reads a variant's `price` and `compare_at_price`.
    ///
    /// # Errors
    ///
    /// - [`PriceStoreError::InvalidVariantId`] if `variant_id` is malformed.
    /// - [`PriceStoreError::NotFound`] on HTTP 404.
    /// - [`PriceStoreError::RateLimited`] on HTTP 429.
    /// - [`PriceStoreError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`PriceStoreError::Http`] on network failure.
    /// - [`PriceStoreError::Deserialize`] if the body is not a variant.
    pub async fn read_variant_price(
        &self,
        variant_id: &str,
    ) -> Result<VariantPrice, PriceStoreError> {
        let url = self.variant_url(variant_id)?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .send()
            .await?;
        let response = check_status(response, &url)?;

        let body = response.text().await?;
        let envelope: VariantEnvelope =
            serde_json::from_str(&body).map_err(|e| PriceStoreError::Deserialize {
                context: format!("variant {variant_id}"),
                source: e,
            })?;

        Ok(envelope.variant.into())
    }

    /// Writes a variant's `price` and `compare_at_price`.
    ///
    /// `compare_at_price: None` is sent as an explicit `null`, which clears
    /// the field in Shopify.
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::read_variant_price`], minus deserialization.
    pub async fn write_variant_price(
        &self,
        variant_id: &str,
        price: &str,
        compare_at_price: Option<&str>,
    ) -> Result<(), PriceStoreError> {
        let numeric = numeric_variant_id(variant_id)?;
        let id = numeric
            .parse::<u64>()
            .map_err(|_| PriceStoreError::InvalidVariantId(variant_id.to_string()))?;
        let url = self.variant_url(variant_id)?;

        let body = VariantUpdateEnvelope {
            variant: VariantUpdate {
                id,
                price,
                compare_at_price,
            },
        };

        let response = self
            .client
            .put(url.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&body)
            .send()
            .await?;
        check_status(response, &url)?;

        tracing::debug!(variant_id, price, compare_at_price, "shopify: variant price written");
        Ok(())
    }

    fn variant_url(&self, variant_id: &str) -> Result<Url, PriceStoreError> {
        let numeric = numeric_variant_id(variant_id)?;
        self.admin_root
            .join(&format!("variants/{numeric}.json"))
            .map_err(|e| PriceStoreError::InvalidBaseUrl {
                base_url: self.admin_root.to_string(),
                reason: e.to_string(),
            })
    }

    fn graphql_url(&self) -> Result<Url, PriceStoreError> {
        self.admin_root
            .join("graphql.json")
            .map_err(|e| PriceStoreError::InvalidBaseUrl {
                base_url: self.admin_root.to_string(),
                reason: e.to_string(),
            })
    }
}

impl PriceStore for ShopifyClient {
    async fn read_price(&self, variant_id: &str) -> Result<VariantPrice, PriceStoreError> {
        self.read_variant_price(variant_id).await
    }

    async fn write_price(
        &self,
        variant_id: &str,
        price: &str,
        compare_at_price: Option<&str>,
    ) -> Result<(), PriceStoreError> {
        self.write_variant_price(variant_id, price, compare_at_price)
            .await
    }
}

/// Maps non-2xx responses to typed errors.
fn check_status(response: Response, url: &Url) -> Result<Response, PriceStoreError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            // Shopify sends fractional seconds, e.g. `2.0`.
            .and_then(|s| s.trim().split('.').next()?.parse::<u64>().ok())
            .unwrap_or(2);
        return Err(PriceStoreError::RateLimited { retry_after_secs });
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PriceStoreError::NotFound {
            url: url.to_string(),
        });
    }

    if !status.is_success() {
        return Err(PriceStoreError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response)
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
