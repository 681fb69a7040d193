use crate::error::ProviderError;
use crate::model::{RawResult, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{status_error, ProductProvider, ProviderId};

/// Structured product-search REST API: query/country/language/page
/// parameters in, a paged product catalog out. Authenticates with an API
/// key header.
pub struct CatalogProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(alias = "items")]
    products: Vec<serde_json::Value>,
    #[serde(default, alias = "totalCount", alias = "total")]
    total_count: Option<u32>,
}

impl CatalogProvider {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Self {
        CatalogProvider {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ProductProvider for CatalogProvider {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<RawResult, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Auth("no catalog API key configured".into()))?;

        let page_param = page.to_string();
        let request = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", query.text.as_str()),
                ("country", query.country.as_str()),
                ("language", query.language.as_str()),
                ("page", page_param.as_str()),
            ])
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if let Some(err) = status_error(&response) {
            return Err(err);
        }

        let parsed: CatalogResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("catalog response: {}", e)))?;

        Ok(RawResult {
            total_count: parsed.total_count,
            items: parsed.products,
            diagnostics: Default::default(),
        })
    }

    fn name(&self) -> &'static str {
        "catalog"
    }

    fn id(&self) -> ProviderId {
        ProviderId::Catalog
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn priority(&self) -> u8 {
        30
    }
}
