use crate::coordinator::Diagnostics;
use crate::model::{Provenance, SessionState};
use crate::process::PAGE_SIZE;

pub fn format_session(state: &SessionState) -> String {
    let mut out = String::new();

    if state.degraded_mode {
        out.push_str("> Showing demonstration data: no live provider could be reached.\n\n");
    }

    let query_text = state
        .last_query
        .as_ref()
        .map(|q| q.text.as_str())
        .unwrap_or("");
    let mut markers = String::new();
    match state.provenance {
        Some(Provenance::Cached) => markers.push_str(" [cached]"),
        Some(Provenance::Demo) => markers.push_str(" [demo]"),
        _ => {}
    }
    if !state.filters.is_empty() {
        markers.push_str(" [filtered]");
    }
    out.push_str(&format!(
        "## Results for \"{}\" (page {} of {}){}\n\n",
        query_text, state.current_page, state.total_pages, markers
    ));

    if state.retry_attempt > 0 {
        out.push_str(&format!("*Retry attempt {}*\n\n", state.retry_attempt));
    }

    if state.visible_results.is_empty() {
        out.push_str("No results.\n");
        return out;
    }

    let offset = (state.current_page.max(1) - 1) as usize * PAGE_SIZE;
    for (i, product) in state.visible_results.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n", offset + i + 1, product.title));
        if !product.brand.is_empty() {
            out.push_str(&format!("- **Brand:** {}\n", product.brand));
        }
        if !product.price.is_empty() {
            out.push_str(&format!(
                "- **Price:** {} ({})\n",
                product.price, product.currency
            ));
        }
        if product.rating > 0.0 {
            out.push_str(&format!("- **Rating:** {:.1}/5\n", product.rating));
        }
        out.push_str(&format!("- **Store:** {}\n", product.source));
        if !product.availability.is_empty() {
            out.push_str(&format!("- **Availability:** {}\n", product.availability));
        }
        if !product.link.is_empty() {
            out.push_str(&format!("- **URL:** {}\n", product.link));
        }

        if i < state.visible_results.len() - 1 {
            out.push_str("\n---\n\n");
        }
    }

    out
}

pub fn format_diagnostics(diag: &Diagnostics) -> String {
    let mut out = String::new();
    out.push_str("## Diagnostics\n");
    out.push_str(&format!("- **Cache hits:** {}\n", diag.cache_hits));
    out.push_str(&format!("- **Cache misses:** {}\n", diag.cache_misses));
    if !diag.provider_failures.is_empty() {
        out.push_str("- **Provider failures:**\n");
        for (key, count) in &diag.provider_failures {
            out.push_str(&format!("  - {}: {}\n", key, count));
        }
    }
    if let Some(ref err) = diag.last_error {
        out.push_str(&format!("- **Last error:** {}\n", err));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Product, SearchQuery};

    fn product(id: &str, title: &str) -> Product {
        Product {
            id: id.into(),
            title: title.into(),
            subtitle: String::new(),
            price: "$10.00".into(),
            currency: "USD".into(),
            numeric_price: Some(10.0),
            image: None,
            link: "https://shop.example.com/p".into(),
            rating: 4.2,
            source: "Example".into(),
            country: "us".into(),
            description: String::new(),
            availability: "in stock".into(),
            brand: "Acme".into(),
            specifications: Default::default(),
        }
    }

    fn state_with(products: Vec<Product>) -> SessionState {
        SessionState {
            last_query: Some(SearchQuery::new("shoes", "us", "en")),
            current_page: 1,
            total_pages: 1,
            visible_results: products.clone(),
            all_results: products,
            ..Default::default()
        }
    }

    #[test]
    fn renders_header_and_products() {
        let rendered = format_session(&state_with(vec![product("a", "First"), product("b", "Second")]));
        assert!(rendered.contains("Results for \"shoes\" (page 1 of 1)"));
        assert!(rendered.contains("### 1. First"));
        assert!(rendered.contains("### 2. Second"));
        assert!(rendered.contains("- **Price:** $10.00 (USD)"));
    }

    #[test]
    fn degraded_state_gets_a_banner() {
        let mut state = state_with(vec![product("a", "Demo item")]);
        state.degraded_mode = true;
        state.provenance = Some(crate::model::Provenance::Demo);
        let rendered = format_session(&state);
        assert!(rendered.starts_with("> Showing demonstration data"));
        assert!(rendered.contains("[demo]"));
    }

    #[test]
    fn numbering_continues_across_pages() {
        let mut state = state_with(vec![product("x", "Thirteenth")]);
        state.current_page = 2;
        state.total_pages = 2;
        let rendered = format_session(&state);
        assert!(rendered.contains("### 13. Thirteenth"));
    }

    #[test]
    fn empty_view_says_no_results() {
        let rendered = format_session(&state_with(Vec::new()));
        assert!(rendered.contains("No results."));
    }

    #[test]
    fn diagnostics_include_counters_and_last_error() {
        let mut diag = Diagnostics::default();
        diag.cache_hits = 3;
        diag.provider_failures.insert("catalog:timeout".into(), 2);
        diag.last_error = Some("catalog: request timed out".into());
        let rendered = format_diagnostics(&diag);
        assert!(rendered.contains("**Cache hits:** 3"));
        assert!(rendered.contains("catalog:timeout: 2"));
        assert!(rendered.contains("request timed out"));
    }
}
