//! Variant display metadata via Admin GraphQL.

use serde::Serialize;

use super::{check_status, ShopifyClient, ACCESS_TOKEN_HEADER};
use crate::error::PriceStoreError;
use crate::types::{GraphQlRequest, GraphQlResponse, NodesData, VariantSummary};
use crate::variant_id::variant_gid;

/// Shopify caps `nodes(ids:)` at 250 ids; stay well under it.
const NODES_CHUNK_SIZE: usize = 100;

const VARIANT_SUMMARIES_QUERY: &str = r"
query VariantSummaries($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on ProductVariant {
      id
      title
      price
      image { url }
      product { title featuredImage { url } }
    }
  }
}";

#[derive(Debug, Serialize)]
struct NodesVariables<'a> {
    ids: &'a [String],
}

impl ShopifyClient {
    /// Looks up title, product title, image and live price for each variant.
    ///
    /// Variants Shopify does not know about are silently absent from the
    /// result. Duplicate ids are queried once.
    ///
    /// # Errors
    ///
    /// - [`PriceStoreError::InvalidVariantId`] if any id is malformed.
    /// - [`PriceStoreError::GraphQl`] if Shopify returns GraphQL errors and no data.
    /// - HTTP and deserialization errors as for [`ShopifyClient::read_variant_price`].
    pub async fn variant_summaries(
        &self,
        variant_ids: &[String],
    ) -> Result<Vec<VariantSummary>, PriceStoreError> {
        let mut gids: Vec<String> = variant_ids
            .iter()
            .map(|id| variant_gid(id))
            .collect::<Result<_, _>>()?;
        gids.sort();
        gids.dedup();

        let mut summaries = Vec::with_capacity(gids.len());
        for chunk in gids.chunks(NODES_CHUNK_SIZE) {
            summaries.extend(self.fetch_summary_chunk(chunk).await?);
        }
        Ok(summaries)
    }

    async fn fetch_summary_chunk(
        &self,
        gids: &[String],
    ) -> Result<Vec<VariantSummary>, PriceStoreError> {
        let url = self.graphql_url()?;
        let request = GraphQlRequest {
            query: VARIANT_SUMMARIES_QUERY,
            variables: NodesVariables { ids: gids },
        };

        let response = self
            .client
            .post(url.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, &url)?;

        let body = response.text().await?;
        let parsed: GraphQlResponse<NodesData> =
            serde_json::from_str(&body).map_err(|e| PriceStoreError::Deserialize {
                context: "variant summaries".to_string(),
                source: e,
            })?;

        let Some(data) = parsed.data else {
            let message = parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PriceStoreError::GraphQl(if message.is_empty() {
                "response contained neither data nor errors".to_string()
            } else {
                message
            }));
        };

        if !parsed.errors.is_empty() {
            tracing::warn!(
                errors = parsed.errors.len(),
                "shopify: partial GraphQL errors in variant summaries"
            );
        }

        Ok(data
            .nodes
            .into_iter()
            .flatten()
            .filter_map(VariantSummary::from_node)
            .collect())
    }
}
