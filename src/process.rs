use crate::model::{Filters, Product, SortOption};

/// Fixed window size for client-side pagination.
pub const PAGE_SIZE: usize = 12;

/// Output of one processing pass over the full result set.
#[derive(Debug, Clone)]
pub struct Processed {
    pub visible: Vec<Product>,
    /// The page actually shown; out-of-range requests clamp to the last
    /// valid page instead of erroring.
    pub page: u32,
    pub total_pages: u32,
    pub filtered_count: usize,
}

/// Page count over a filtered set. This is the only pagination math in the
/// crate; everything else calls through here.
pub fn total_pages(count: usize) -> u32 {
    (count.div_ceil(PAGE_SIZE)).max(1) as u32
}

/// Apply filters, sort and pagination to the full result set. Predicates
/// are conjunctive; sorting is stable; unset numeric fields rank as zero.
pub fn apply(all: &[Product], filters: &Filters, page: u32) -> Processed {
    let mut filtered: Vec<Product> = all.iter().filter(|p| matches(p, filters)).cloned().collect();

    match filters.sort {
        SortOption::None => {}
        SortOption::PriceAsc => {
            filtered.sort_by(|a, b| sort_price(a).total_cmp(&sort_price(b)));
        }
        SortOption::PriceDesc => {
            filtered.sort_by(|a, b| sort_price(b).total_cmp(&sort_price(a)));
        }
        SortOption::RatingDesc => {
            filtered.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        }
    }

    let filtered_count = filtered.len();
    let total_pages = total_pages(filtered_count);
    let page = page.clamp(1, total_pages);

    let start = (page as usize - 1) * PAGE_SIZE;
    let visible = if start < filtered_count {
        filtered[start..(start + PAGE_SIZE).min(filtered_count)].to_vec()
    } else {
        Vec::new()
    };

    Processed {
        visible,
        page,
        total_pages,
        filtered_count,
    }
}

fn sort_price(p: &Product) -> f64 {
    p.numeric_price.unwrap_or(0.0)
}

fn matches(p: &Product, f: &Filters) -> bool {
    let price = p.numeric_price.unwrap_or(0.0);
    if let Some(min) = f.min_price {
        if price < min {
            return false;
        }
    }
    if let Some(max) = f.max_price {
        if price > max {
            return false;
        }
    }
    if let Some(floor) = f.min_rating {
        if p.rating < floor {
            return false;
        }
    }
    if !f.brands.is_empty() && !any_substring(&f.brands, &p.brand) {
        return false;
    }
    if !f.sources.is_empty() && !any_substring(&f.sources, &p.source) {
        return false;
    }
    true
}

fn any_substring(needles: &[String], haystack: &str) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|n| haystack.contains(&n.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: Option<f64>, rating: f64, brand: &str, source: &str) -> Product {
        Product {
            id: id.into(),
            title: format!("Item {}", id),
            subtitle: String::new(),
            price: price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
            currency: "USD".into(),
            numeric_price: price,
            image: None,
            link: String::new(),
            rating,
            source: source.into(),
            country: "us".into(),
            description: String::new(),
            availability: String::new(),
            brand: brand.into(),
            specifications: Default::default(),
        }
    }

    fn items(n: usize) -> Vec<Product> {
        (0..n)
            .map(|i| {
                product(
                    &format!("p{}", i + 1),
                    Some((i + 1) as f64 * 10.0),
                    3.0,
                    "Acme",
                    "Example",
                )
            })
            .collect()
    }

    #[test]
    fn total_pages_math() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(12), 1);
        assert_eq!(total_pages(13), 2);
        assert_eq!(total_pages(25), 3);
    }

    #[test]
    fn page_two_of_twenty_five_shows_items_13_to_24() {
        let all = items(25);
        let p = apply(&all, &Filters::default(), 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.visible.len(), 12);
        assert_eq!(p.visible[0].id, "p13");
        assert_eq!(p.visible[11].id, "p24");
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let all = items(25);
        let p = apply(&all, &Filters::default(), 3);
        assert_eq!(p.visible.len(), 1);
        assert_eq!(p.visible[0].id, "p25");
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let all = items(25);
        let p = apply(&all, &Filters::default(), 8);
        assert_eq!(p.page, 3);
        assert_eq!(p.visible.len(), 1);

        let p = apply(&all, &Filters::default(), 0);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn empty_set_is_one_empty_page() {
        let p = apply(&[], &Filters::default(), 1);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.page, 1);
        assert!(p.visible.is_empty());
    }

    #[test]
    fn price_range_filter_is_conjunctive() {
        // 25 items priced 10..=250; [100, 300] keeps 100..=250 => 16 items,
        // [100, 190] keeps exactly 10 of them
        let all = items(25);
        let filters = Filters {
            min_price: Some(100.0),
            max_price: Some(190.0),
            ..Default::default()
        };
        let p = apply(&all, &filters, 1);
        assert_eq!(p.filtered_count, 10);
        assert_eq!(p.total_pages, 1);
    }

    #[test]
    fn unpriced_items_rank_as_zero() {
        let all = vec![
            product("a", Some(10.0), 0.0, "", ""),
            product("b", None, 0.0, "", ""),
        ];
        let sorted = apply(
            &all,
            &Filters {
                sort: SortOption::PriceAsc,
                ..Default::default()
            },
            1,
        );
        assert_eq!(sorted.visible[0].id, "b");

        // a set min_price excludes them
        let filtered = apply(
            &all,
            &Filters {
                min_price: Some(1.0),
                ..Default::default()
            },
            1,
        );
        assert_eq!(filtered.filtered_count, 1);
    }

    #[test]
    fn price_desc_orders_50_10_5() {
        let all = vec![
            product("a", Some(10.0), 0.0, "", ""),
            product("b", Some(50.0), 0.0, "", ""),
            product("c", Some(5.0), 0.0, "", ""),
        ];
        let p = apply(
            &all,
            &Filters {
                sort: SortOption::PriceDesc,
                ..Default::default()
            },
            1,
        );
        let prices: Vec<f64> = p.visible.iter().filter_map(|x| x.numeric_price).collect();
        assert_eq!(prices, vec![50.0, 10.0, 5.0]);
    }

    #[test]
    fn sort_is_stable_on_equal_keys() {
        let all = vec![
            product("first", Some(10.0), 4.0, "", ""),
            product("second", Some(10.0), 4.0, "", ""),
        ];
        let p = apply(
            &all,
            &Filters {
                sort: SortOption::PriceAsc,
                ..Default::default()
            },
            1,
        );
        assert_eq!(p.visible[0].id, "first");
        assert_eq!(p.visible[1].id, "second");
    }

    #[test]
    fn rating_floor_and_brand_substring() {
        let all = vec![
            product("a", Some(10.0), 4.5, "Nike Inc", "Zalando"),
            product("b", Some(10.0), 3.0, "Nike Inc", "Zalando"),
            product("c", Some(10.0), 4.8, "Adidas", "Amazon"),
        ];
        let filters = Filters {
            min_rating: Some(4.0),
            brands: vec!["nike".into()],
            ..Default::default()
        };
        let p = apply(&all, &filters, 1);
        assert_eq!(p.filtered_count, 1);
        assert_eq!(p.visible[0].id, "a");
    }

    #[test]
    fn source_filter_matches_case_insensitively() {
        let all = vec![
            product("a", Some(10.0), 4.0, "", "Zalando"),
            product("b", Some(10.0), 4.0, "", "Amazon"),
        ];
        let filters = Filters {
            sources: vec!["ZAL".into()],
            ..Default::default()
        };
        let p = apply(&all, &filters, 1);
        assert_eq!(p.filtered_count, 1);
        assert_eq!(p.visible[0].id, "a");
    }
}
