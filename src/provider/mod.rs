pub mod ai_direct;
pub mod ai_proxy;
pub mod catalog;

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::model::{RawResult, SearchQuery};
use async_trait::async_trait;
use serde_json::Value;

/// Identifies one upstream family. Used for preference selection and
/// diagnostics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderId {
    Proxy,
    Direct,
    Catalog,
}

impl ProviderId {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proxy" | "relay" => Some(Self::Proxy),
            "direct" | "ai" => Some(Self::Direct),
            "catalog" => Some(Self::Catalog),
            _ => None,
        }
    }
}

/// One upstream product-data source. Implementations translate their
/// provider-specific response into a uniform `RawResult` and never decide
/// on fallback themselves; that is the coordinator's job.
#[async_trait]
pub trait ProductProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<RawResult, ProviderError>;

    /// Name used in logs and diagnostics counters.
    fn name(&self) -> &'static str;

    fn id(&self) -> ProviderId;

    /// Whether the provider is usable at all (configured key, endpoint).
    fn is_available(&self) -> bool {
        true
    }

    /// Chain position; lower is tried first.
    fn priority(&self) -> u8 {
        100
    }
}

/// Build the adapter chain from configuration, priority-ordered with the
/// user's preferred provider moved to the front. Adding a provider means
/// adding a variant here; the coordinator walks whatever this returns.
pub fn build_chain(config: &AppConfig) -> Vec<Box<dyn ProductProvider>> {
    let mut providers: Vec<Box<dyn ProductProvider>> = Vec::new();

    if let Some(relay_url) = &config.relay_url {
        providers.push(Box::new(ai_proxy::ProxiedAiProvider::new(
            relay_url.clone(),
            config.timeout,
        )));
        tracing::debug!("Relay provider enabled");
    }

    if config.ai_api_key.is_some() {
        providers.push(Box::new(ai_direct::DirectAiProvider::new(
            config.ai_endpoint.clone(),
            config.ai_model.clone(),
            config.ai_api_key.clone(),
            config.allow_direct_ai,
            config.timeout,
        )));
        tracing::debug!("Direct AI provider enabled");
    }

    if let Some(endpoint) = &config.catalog_endpoint {
        providers.push(Box::new(catalog::CatalogProvider::new(
            endpoint.clone(),
            config.catalog_api_key.clone(),
            config.timeout,
        )));
        tracing::debug!("Catalog provider enabled");
    }

    let preference = config.provider_preference;
    providers.sort_by_key(|p| (Some(p.id()) != preference, p.priority()));
    providers
}

/// Map a non-success HTTP status onto the error taxonomy.
pub(super) fn status_error(resp: &reqwest::Response) -> Option<ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return None;
    }
    Some(match status.as_u16() {
        401 | 403 => ProviderError::Auth(format!("upstream returned {}", status)),
        429 => {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            ProviderError::RateLimit { retry_after_secs }
        }
        _ => ProviderError::Network(format!("upstream returned {}", status)),
    })
}

/// Accept either a bare JSON array or an object wrapping one under a
/// conventional key.
pub(super) fn items_from_value(value: &Value) -> Option<Vec<Value>> {
    if let Some(arr) = value.as_array() {
        return Some(arr.clone());
    }
    for key in ["products", "items", "results"] {
        if let Some(arr) = value.get(key).and_then(Value::as_array) {
            return Some(arr.clone());
        }
    }
    None
}

/// First part of a payload for Malformed logging, bounded so a huge body
/// never floods the log.
pub(super) fn payload_snippet(payload: &str) -> String {
    payload.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockProvider {
        available: bool,
    }

    #[async_trait]
    impl ProductProvider for MockProvider {
        async fn search(
            &self,
            query: &SearchQuery,
            _page: u32,
        ) -> Result<RawResult, ProviderError> {
            Ok(RawResult {
                items: vec![json!({"title": format!("Result for {}", query.text)})],
                total_count: Some(1),
                diagnostics: Default::default(),
            })
        }

        fn name(&self) -> &'static str {
            "mock"
        }

        fn id(&self) -> ProviderId {
            ProviderId::Catalog
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    #[tokio::test]
    async fn mock_provider_search() {
        let provider = MockProvider { available: true };
        let q = SearchQuery::new("test", "us", "en");
        let raw = provider.search(&q, 1).await.unwrap();
        assert_eq!(raw.items.len(), 1);
        assert_eq!(raw.total_count, Some(1));
    }

    #[test]
    fn default_priority_is_100() {
        let provider = MockProvider { available: true };
        assert_eq!(provider.priority(), 100);
    }

    #[test]
    fn items_from_bare_array_and_wrapped_object() {
        let arr = json!([{"title": "a"}, {"title": "b"}]);
        assert_eq!(items_from_value(&arr).unwrap().len(), 2);

        let wrapped = json!({"products": [{"title": "a"}]});
        assert_eq!(items_from_value(&wrapped).unwrap().len(), 1);

        let other = json!({"results": []});
        assert_eq!(items_from_value(&other).unwrap().len(), 0);

        assert!(items_from_value(&json!({"unrelated": 1})).is_none());
        assert!(items_from_value(&json!("text")).is_none());
    }

    #[test]
    fn payload_snippet_is_bounded() {
        let long = "x".repeat(500);
        assert_eq!(payload_snippet(&long).len(), 120);
    }

    #[test]
    fn provider_id_parsing() {
        assert_eq!(ProviderId::parse("proxy"), Some(ProviderId::Proxy));
        assert_eq!(ProviderId::parse("relay"), Some(ProviderId::Proxy));
        assert_eq!(ProviderId::parse("direct"), Some(ProviderId::Direct));
        assert_eq!(ProviderId::parse("catalog"), Some(ProviderId::Catalog));
        assert_eq!(ProviderId::parse("bogus"), None);
    }
}
