use crate::model::{Product, SearchQuery};
use crate::process::PAGE_SIZE;
use sha2::{Digest, Sha256};

/// Enough synthetic items that pagination controls stay exercised even in
/// the degraded path (always more than two pages).
pub const DEMO_RESULT_COUNT: usize = 2 * PAGE_SIZE + 3;

const DEMO_STORES: &[&str] = &["Demo Outlet", "Demo Bazaar", "Demo Depot", "Demo Market"];
const DEMO_BRANDS: &[&str] = &["Aurora", "Northwind", "Fieldstone", "Clearline", "Vantage"];
const DEMO_ADJECTIVES: &[&str] = &["Classic", "Premium", "Essential", "Compact", "Deluxe"];

/// Produce a synthetic result set for a query. Pure computation, never
/// fails, and deterministic: the same query always yields the same set.
/// Items are tagged so every layer can tell them from live data.
pub fn generate(query: &SearchQuery) -> Vec<Product> {
    let mut hasher = Sha256::new();
    hasher.update(query.text.to_lowercase().as_bytes());
    let seed = hasher.finalize();

    (0..DEMO_RESULT_COUNT)
        .map(|i| {
            let byte = seed[i % seed.len()] as usize;
            let price_value = 9.0 + ((byte * 7 + i * 13) % 290) as f64 + 0.99;
            let rating = 3.0 + ((byte + i) % 21) as f64 / 10.0;
            let brand = DEMO_BRANDS[(byte + i) % DEMO_BRANDS.len()];
            let store = DEMO_STORES[(byte / 3 + i) % DEMO_STORES.len()];
            let adjective = DEMO_ADJECTIVES[(byte / 5 + i) % DEMO_ADJECTIVES.len()];
            let id = format!("demo-{}-{:03}", &hex::encode(&seed[..4]), i + 1);

            Product {
                id: id.clone(),
                title: format!("{} {} (sample {})", adjective, query.text, i + 1),
                subtitle: format!("{} sample listing", brand),
                price: format!("${:.2}", price_value),
                currency: "USD".into(),
                numeric_price: Some(price_value),
                image: None,
                link: format!("https://demo.invalid/product/{}", id),
                rating,
                source: store.into(),
                country: query.country.clone(),
                description: format!(
                    "Placeholder listing generated while live providers are unavailable \
                     for \"{}\".",
                    query.text
                ),
                availability: "demo".into(),
                brand: brand.into(),
                specifications: Default::default(),
            }
        })
        .collect()
}
