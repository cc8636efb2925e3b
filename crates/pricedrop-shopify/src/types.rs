//! Shopify Admin API request/response types.
//!
//! ## REST `variants/{id}.json`
//!
//! `price` is always a decimal string (`"19.99"`). `compare_at_price` is
//! `null` when the variant is not marked down; some older shops return an
//! empty string instead, which we fold into `None`.
//!
//! Writing `"compare_at_price": null` clears the field. Omitting it leaves the
//! current value in place, so the update body always serializes the key.
//!
//! ## GraphQL `nodes(ids:)`
//!
//! Unknown or deleted ids come back as `null` entries in `nodes`, in request
//! order. `price` on `ProductVariant` is a `Money` scalar, serialized as a
//! decimal string.

use serde::{Deserialize, Serialize};

use crate::store::VariantPrice;

/// Envelope for `GET /variants/{id}.json`.
#[derive(Debug, Deserialize)]
pub(crate) struct VariantEnvelope {
    pub variant: RestVariant,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestVariant {
    pub price: String,
    #[serde(default)]
    pub compare_at_price: Option<String>,
}

impl From<RestVariant> for VariantPrice {
    fn from(v: RestVariant) -> Self {
        Self {
            price: v.price,
            compare_at_price: v.compare_at_price.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Body for `PUT /variants/{id}.json`.
#[derive(Debug, Serialize)]
pub(crate) struct VariantUpdateEnvelope<'a> {
    pub variant: VariantUpdate<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VariantUpdate<'a> {
    pub id: u64,
    pub price: &'a str,
    /// Serialized as `null` when `None`; never skipped.
    pub compare_at_price: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodesData {
    pub nodes: Vec<Option<VariantNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantNode {
    pub id: String,
    pub title: String,
    pub price: String,
    #[serde(default)]
    pub image: Option<ImageNode>,
    pub product: ProductNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductNode {
    pub title: String,
    #[serde(default)]
    pub featured_image: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageNode {
    pub url: String,
}

/// Display metadata for one variant, used to enrich job listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSummary {
    /// Numeric variant id (GID prefix stripped).
    pub variant_id: String,
    pub title: String,
    pub product_title: String,
    /// Variant image, falling back to the product's featured image.
    pub image_url: Option<String>,
    pub price: String,
}

impl VariantSummary {
    pub(crate) fn from_node(node: VariantNode) -> Option<Self> {
        let variant_id = crate::variant_id::numeric_variant_id(&node.id)
            .ok()?
            .to_string();
        let image_url = node
            .image
            .or(node.product.featured_image)
            .map(|img| img.url);

        Some(Self {
            variant_id,
            title: node.title,
            product_title: node.product.title,
            image_url,
            price: node.price,
        })
    }
}
