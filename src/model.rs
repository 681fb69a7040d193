use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical product record. Every adapter's response is reduced to this
/// shape by the normalizer before anything downstream sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Display price as the upstream source formatted it (e.g. "CHF 23,90").
    pub price: String,
    pub currency: String,
    /// Parsed from `price` when possible; filtering and sorting read this.
    pub numeric_price: Option<f64>,
    pub image: Option<String>,
    pub link: String,
    /// 0.0 to 5.0; missing upstream ratings come through as 0.0.
    pub rating: f64,
    /// Store name, classified from the link domain when absent upstream.
    pub source: String,
    pub country: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Cached,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub products: Vec<Product>,
    /// Upstream-reported total when available, else the local count. Kept
    /// for display only; page navigation always derives from the local set.
    pub total_count: u32,
    pub total_pages: u32,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_diagnostics: BTreeMap<String, String>,
}

/// Uniform adapter output before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawResult {
    pub items: Vec<serde_json::Value>,
    pub total_count: Option<u32>,
    pub diagnostics: BTreeMap<String, String>,
}

/// A submitted search. Text is normalized on construction and the whole
/// value is immutable afterwards; two queries compare equal iff every
/// upstream-relevant field matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub country: String,
    pub language: String,
}

impl SearchQuery {
    pub fn new(text: &str, country: &str, language: &str) -> Self {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        SearchQuery {
            text,
            country: country.to_lowercase(),
            language: language.to_lowercase(),
        }
    }

    /// Namespace key for the cache: all pages of one query share it.
    pub fn namespace(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.text.to_lowercase().as_bytes());
        hasher.update(self.country.as_bytes());
        hasher.update(self.language.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    None,
    PriceAsc,
    PriceDesc,
    RatingDesc,
}

impl SortOption {
    pub fn from_str(s: &str) -> Self {
        match s {
            "price_asc" | "price-asc" => Self::PriceAsc,
            "price_desc" | "price-desc" => Self::PriceDesc,
            "rating_desc" | "rating-desc" | "rating" => Self::RatingDesc,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::RatingDesc => "rating_desc",
        }
    }
}

/// In-memory filters applied against the full result set. Country and
/// language are not here: changing those alters upstream semantics and is
/// handled by the coordinator as a refetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub brands: Vec<String>,
    pub sources: Vec<String>,
    pub sort: SortOption,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_rating.is_none()
            && self.brands.is_empty()
            && self.sources.is_empty()
            && self.sort == SortOption::None
    }
}

/// The coordinator's view state. Created on the first search, reset (not
/// destroyed) when the query text changes; filters survive the reset.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub last_query: Option<SearchQuery>,
    pub current_page: u32,
    pub total_pages: u32,
    pub all_results: Vec<Product>,
    pub visible_results: Vec<Product>,
    pub filters: Filters,
    pub provenance: Option<Provenance>,
    pub degraded_mode: bool,
    pub retry_attempt: u32,
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_text_is_whitespace_normalized() {
        let q = SearchQuery::new("  Nike   Air\tMax ", "US", "EN");
        assert_eq!(q.text, "Nike Air Max");
        assert_eq!(q.country, "us");
        assert_eq!(q.language, "en");
    }

    #[test]
    fn namespace_is_case_insensitive_on_text() {
        let a = SearchQuery::new("Vitamin C", "us", "en");
        let b = SearchQuery::new("vitamin c", "us", "en");
        assert_eq!(a.namespace(), b.namespace());

        let other_country = SearchQuery::new("Vitamin C", "de", "en");
        assert_ne!(a.namespace(), other_country.namespace());
    }

    #[test]
    fn sort_option_round_trips() {
        for s in ["none", "price_asc", "price_desc", "rating_desc"] {
            assert_eq!(SortOption::from_str(s).as_str(), s);
        }
        assert_eq!(SortOption::from_str("bogus"), SortOption::None);
    }

    #[test]
    fn product_serde_uses_camel_case() {
        let p = Product {
            id: "p1".into(),
            title: "Thing".into(),
            subtitle: String::new(),
            price: "$5.00".into(),
            currency: "USD".into(),
            numeric_price: Some(5.0),
            image: None,
            link: "https://example.com/p1".into(),
            rating: 4.0,
            source: "Example".into(),
            country: "us".into(),
            description: String::new(),
            availability: "in stock".into(),
            brand: "Acme".into(),
            specifications: BTreeMap::new(),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"numericPrice\":5.0"));
        let back: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
