use crate::model::{Product, SearchQuery};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Map one raw upstream item into the canonical product shape. Providers
/// disagree wildly on field names, so every lookup probes a chain of
/// aliases; anything still missing gets a safe default.
pub fn normalize(raw: &Value, index: usize, query: &SearchQuery) -> Product {
    let title = str_field(raw, &["title", "name", "productName"])
        .unwrap_or_else(|| format!("Result {}", index + 1));

    let brand = str_field(raw, &["brand", "brandName", "manufacturer"])
        .or_else(|| nested_str(raw, "brand", "name"))
        .unwrap_or_default();

    let subtitle = str_field(raw, &["subtitle", "tagline", "shortDescription"]).unwrap_or_default();

    let (price, numeric_price) = extract_price(raw);
    let currency = str_field(raw, &["currency", "currencyCode"]).unwrap_or_else(|| "USD".into());

    let image = str_field(raw, &["image", "imageUrl", "image_url", "thumbnail"])
        .filter(|s| !s.is_empty());

    let link = str_field(raw, &["link", "url", "productUrl", "product_url"]).unwrap_or_default();

    let rating = num_field(raw, &["rating", "stars", "averageRating"])
        .unwrap_or(0.0)
        .clamp(0.0, 5.0);

    let source = str_field(raw, &["source", "store", "merchant", "seller"])
        .filter(|s| !s.is_empty())
        .or_else(|| classify_store(&link))
        .unwrap_or_else(|| "Unknown".into());

    let country = str_field(raw, &["country"]).unwrap_or_else(|| query.country.clone());

    let description = str_field(raw, &["description", "summary"]).unwrap_or_default();

    let availability = str_field(raw, &["availability", "stockStatus"])
        .or_else(|| {
            raw.get("inStock").and_then(Value::as_bool).map(|b| {
                if b {
                    "in stock".to_string()
                } else {
                    "out of stock".to_string()
                }
            })
        })
        .unwrap_or_default();

    let specifications = extract_specifications(raw);

    let id = str_field(raw, &["id", "productId", "product_id"])
        .or_else(|| {
            raw.get("id")
                .or_else(|| raw.get("productId"))
                .and_then(Value::as_u64)
                .map(|n| n.to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| synthesize_id(&title, &price, index));

    Product {
        id,
        title,
        subtitle,
        price,
        currency,
        numeric_price,
        image,
        link,
        rating,
        source,
        country,
        description,
        availability,
        brand,
        specifications,
    }
}

fn str_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        raw.get(k)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn nested_str(raw: &Value, outer: &str, inner: &str) -> Option<String> {
    raw.get(outer)?
        .get(inner)?
        .as_str()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn num_field(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| {
        let v = raw.get(k)?;
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Display price plus its numeric derivation. Upstream may send a bare
/// number, a formatted string, or nothing at all.
fn extract_price(raw: &Value) -> (String, Option<f64>) {
    for key in ["price", "displayPrice", "priceString"] {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                let v = n.as_f64().unwrap_or(0.0);
                return (format!("{:.2}", v), Some(v));
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                let s = s.trim().to_string();
                let numeric = extract_numeric_price(&s);
                return (s, numeric);
            }
            _ => {}
        }
    }
    (String::new(), None)
}

/// Pull the first numeric token out of a free-form price string. A comma
/// is treated as the decimal separator unless a dot already serves that
/// role or the commas form repeated thousands groups.
pub fn extract_numeric_price(s: &str) -> Option<f64> {
    static TOKEN: OnceLock<regex::Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| {
        regex::Regex::new(r"\d+(?:[.,]\d+)*(?:[.,]\d+)?").expect("price token pattern")
    });
    let token = re.find(s)?.as_str();

    let has_dot = token.contains('.');
    let has_comma = token.contains(',');

    let normalized = if has_dot && has_comma {
        // Both present: the last separator is the decimal one
        let last_dot = token.rfind('.').unwrap();
        let last_comma = token.rfind(',').unwrap();
        if last_comma > last_dot {
            token.replace('.', "").replacen(',', ".", 1)
        } else {
            token.replace(',', "")
        }
    } else if has_comma {
        let last_comma = token.rfind(',').unwrap();
        let after = &token[last_comma + 1..];
        if after.len() == 3 && token.matches(',').count() > 1 {
            // Multiple groups of three: thousands separators (1,234,567)
            token.replace(',', "")
        } else {
            token.replacen(',', ".", 1)
        }
    } else {
        token.to_string()
    };

    normalized.parse().ok()
}

/// Derive a store label from the link's registrable domain, e.g.
/// "https://www.zalando.de/x" becomes "Zalando".
pub fn classify_store(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let host = parsed.host_str()?;
    let trimmed = host.strip_prefix("www.").unwrap_or(host);
    let label = trimmed.split('.').next().filter(|s| !s.is_empty())?;
    let mut chars = label.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().collect::<String>() + chars.as_str())
}

/// Stable per-result-set id for items the upstream left unidentified.
/// Derived from title, price and position so repeated fetches of the same
/// logical product keep the same id within a session.
fn synthesize_id(title: &str, price: &str, index: usize) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(price.as_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

fn extract_specifications(raw: &Value) -> BTreeMap<String, String> {
    let mut specs = BTreeMap::new();
    if let Some(obj) = raw
        .get("specifications")
        .or_else(|| raw.get("specs"))
        .and_then(Value::as_object)
    {
        for (k, v) in obj {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            specs.insert(k.clone(), rendered);
        }
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> SearchQuery {
        SearchQuery::new("test", "us", "en")
    }

    #[test]
    fn full_item_maps_through() {
        let raw = json!({
            "id": "sku-1",
            "title": "Running Shoe",
            "brand": "Nike",
            "price": "$129.99",
            "currency": "USD",
            "image": "https://cdn.example.com/shoe.jpg",
            "link": "https://store.example.com/shoe",
            "rating": 4.6,
            "source": "Example Store",
            "description": "Light trainer",
            "inStock": true,
            "specifications": {"weight": "240g", "sizes": [40, 41]}
        });
        let p = normalize(&raw, 0, &query());
        assert_eq!(p.id, "sku-1");
        assert_eq!(p.title, "Running Shoe");
        assert_eq!(p.numeric_price, Some(129.99));
        assert_eq!(p.rating, 4.6);
        assert_eq!(p.availability, "in stock");
        assert_eq!(p.specifications.get("weight").unwrap(), "240g");
        assert_eq!(p.specifications.get("sizes").unwrap(), "[40,41]");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = json!({"name": "Bare Item"});
        let p = normalize(&raw, 3, &query());
        assert_eq!(p.title, "Bare Item");
        assert!(p.image.is_none());
        assert_eq!(p.rating, 0.0);
        assert_eq!(p.currency, "USD");
        assert_eq!(p.country, "us");
        assert_eq!(p.source, "Unknown");
        assert!(!p.id.is_empty());
    }

    #[test]
    fn empty_object_still_yields_a_product() {
        let p = normalize(&json!({}), 5, &query());
        assert_eq!(p.title, "Result 6");
        assert!(!p.id.is_empty());
    }

    #[test]
    fn synthesized_ids_are_stable_and_unique_per_index() {
        let raw = json!({"title": "Same", "price": "9.99"});
        let a = normalize(&raw, 0, &query());
        let b = normalize(&raw, 0, &query());
        let c = normalize(&raw, 1, &query());
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn numeric_id_is_accepted() {
        let raw = json!({"id": 12345, "title": "Numbered"});
        let p = normalize(&raw, 0, &query());
        assert_eq!(p.id, "12345");
    }

    #[test]
    fn numeric_price_from_number_value() {
        let raw = json!({"title": "x", "price": 42.5});
        let p = normalize(&raw, 0, &query());
        assert_eq!(p.price, "42.50");
        assert_eq!(p.numeric_price, Some(42.5));
    }

    #[test]
    fn rating_is_clamped() {
        let raw = json!({"title": "x", "rating": 9.7});
        assert_eq!(normalize(&raw, 0, &query()).rating, 5.0);
        let raw = json!({"title": "x", "rating": -2.0});
        assert_eq!(normalize(&raw, 0, &query()).rating, 0.0);
    }

    #[test]
    fn price_token_extraction() {
        assert_eq!(extract_numeric_price("$129.99"), Some(129.99));
        assert_eq!(extract_numeric_price("CHF 23,90"), Some(23.90));
        assert_eq!(extract_numeric_price("1,234.56 USD"), Some(1234.56));
        assert_eq!(extract_numeric_price("1.234,56"), Some(1234.56));
        assert_eq!(extract_numeric_price("ab 12 cd 34"), Some(12.0));
        assert_eq!(extract_numeric_price("free"), None);
        assert_eq!(extract_numeric_price(""), None);
    }

    #[test]
    fn store_classification_from_domain() {
        assert_eq!(
            classify_store("https://www.zalando.de/shoe"),
            Some("Zalando".into())
        );
        assert_eq!(
            classify_store("https://shop.example.com/x"),
            Some("Shop".into())
        );
        assert_eq!(classify_store("not a url"), None);
        assert_eq!(classify_store(""), None);
    }

    #[test]
    fn explicit_store_beats_domain() {
        let raw = json!({
            "title": "x",
            "store": "MegaMart",
            "link": "https://www.othershop.com/x"
        });
        assert_eq!(normalize(&raw, 0, &query()).source, "MegaMart");
    }
}
