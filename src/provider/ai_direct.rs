use crate::error::ProviderError;
use crate::model::{RawResult, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{items_from_value, payload_snippet, status_error, ProductProvider, ProviderId};

/// Calls an OpenAI-style chat-completions endpoint directly, demanding a
/// strict JSON array of product objects. Runtime policy may forbid direct
/// calls entirely, in which case every search fails fast with `Blocked`.
pub struct DirectAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    allow_direct: bool,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl DirectAiProvider {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        allow_direct: bool,
        timeout: Duration,
    ) -> Self {
        DirectAiProvider {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
            allow_direct,
            timeout,
        }
    }

    fn prompt(query: &SearchQuery, page: u32) -> String {
        format!(
            "You are a product search backend. Respond with ONLY a JSON array of up to 24 \
             product objects matching the query, no surrounding text or markdown. Each object \
             must carry: id, title, subtitle, price, currency, image, link, rating, source, \
             description, availability, brand, specifications.\n\
             Query: {}\nCountry: {}\nLanguage: {}\nPage: {}",
            query.text, query.country, query.language, page
        )
    }
}

#[async_trait]
impl ProductProvider for DirectAiProvider {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<RawResult, ProviderError> {
        if !self.allow_direct {
            return Err(ProviderError::Blocked);
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Auth("no AI API key configured".into()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": Self::prompt(query, page)}
            ],
            "temperature": 0.2,
        });

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if let Some(err) = status_error(&response) {
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("completion envelope: {}", e)))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::Malformed("completion had no choices".into()))?;

        let stripped = strip_code_fences(content);
        let value: serde_json::Value = serde_json::from_str(stripped).map_err(|e| {
            tracing::warn!(
                "Direct AI returned unparseable content: {} ({})",
                payload_snippet(content),
                e
            );
            ProviderError::Malformed(format!("completion content: {}", e))
        })?;

        let items = items_from_value(&value).ok_or_else(|| {
            tracing::warn!(
                "Direct AI content is not a product array: {}",
                payload_snippet(content)
            );
            ProviderError::Malformed("completion content is not a product array".into())
        })?;

        let mut diagnostics = std::collections::BTreeMap::new();
        diagnostics.insert("model".to_string(), self.model.clone());

        Ok(RawResult {
            total_count: Some(items.len() as u32),
            items,
            diagnostics,
        })
    }

    fn name(&self) -> &'static str {
        "ai-direct"
    }

    fn id(&self) -> ProviderId {
        ProviderId::Direct
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn priority(&self) -> u8 {
        20
    }
}

/// Models love wrapping JSON in markdown fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(trimmed)
}
