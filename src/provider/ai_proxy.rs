use crate::error::ProviderError;
use crate::model::{RawResult, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{status_error, ProductProvider, ProviderId};

/// Routes the search intent through a backend relay function. Preferred
/// over the direct AI call when both are configured, since the relay works
/// where direct calls are policy-blocked.
pub struct ProxiedAiProvider {
    client: reqwest::Client,
    relay_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct RelayResponse {
    items: Vec<serde_json::Value>,
    #[serde(default, alias = "totalCount")]
    total_count: Option<u32>,
}

impl ProxiedAiProvider {
    pub fn new(relay_url: String, timeout: Duration) -> Self {
        ProxiedAiProvider {
            client: reqwest::Client::new(),
            relay_url,
            timeout,
        }
    }
}

#[async_trait]
impl ProductProvider for ProxiedAiProvider {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<RawResult, ProviderError> {
        let body = serde_json::json!({
            "query": query.text,
            "country": query.country,
            "language": query.language,
            "page": page,
        });

        let request = self.client.post(&self.relay_url).json(&body).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if let Some(err) = status_error(&response) {
            return Err(err);
        }

        let parsed: RelayResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("relay response: {}", e)))?;

        Ok(RawResult {
            total_count: parsed.total_count,
            items: parsed.items,
            diagnostics: Default::default(),
        })
    }

    fn name(&self) -> &'static str {
        "ai-relay"
    }

    fn id(&self) -> ProviderId {
        ProviderId::Proxy
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_response_accepts_both_count_spellings() {
        let camel: RelayResponse =
            serde_json::from_str(r#"{"items": [], "totalCount": 40}"#).unwrap();
        assert_eq!(camel.total_count, Some(40));

        let snake: RelayResponse =
            serde_json::from_str(r#"{"items": [{}], "total_count": 7}"#).unwrap();
        assert_eq!(snake.total_count, Some(7));
        assert_eq!(snake.items.len(), 1);

        let bare: RelayResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(bare.total_count, None);
    }

    #[test]
    fn relay_is_always_available_once_configured() {
        let p = ProxiedAiProvider::new("https://relay.invalid/search".into(), Duration::from_secs(5));
        assert!(p.is_available());
        assert_eq!(p.priority(), 10);
    }
}
