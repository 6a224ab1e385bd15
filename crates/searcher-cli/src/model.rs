use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single listing returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub link: String,
}

impl Product {
    pub fn price_label(&self) -> String {
        self.price
            .map(|price| price.normalize().to_string())
            .unwrap_or_else(|| "n/a".to_string())
    }

    pub fn within_bounds(&self, min_price: Option<u64>, max_price: Option<u64>) -> bool {
        if min_price.is_none() && max_price.is_none() {
            return true;
        }

        let Some(price) = self.price else {
            return false;
        };

        let above_min = min_price.is_none_or(|min| price >= Decimal::from(min));
        let below_max = max_price.is_none_or(|max| price <= Decimal::from(max));
        above_min && below_max
    }
}

/// A saved search plus the listings already seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedQuery {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub min_price: Option<u64>,
    #[serde(default)]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl TrackedQuery {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        min_price: Option<u64>,
        max_price: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            min_price,
            max_price,
            products: Vec::new(),
        }
    }

    pub fn compact_line(&self) -> String {
        format!("search: {}\nquery url:{}", self.name, self.url)
    }
}

impl fmt::Display for TrackedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "search: {}", self.name)?;
        writeln!(f, "query url: {}", self.url)?;
        writeln!(f, "min price: {}", bound_label(self.min_price))?;
        writeln!(f, "max price: {}", bound_label(self.max_price))?;
        write!(f, "known products: {}", self.products.len())
    }
}

fn bound_label(bound: Option<u64>) -> String {
    bound
        .map(|value| value.to_string())
        .unwrap_or_else(|| "null".to_string())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(price: Option<&str>) -> Product {
        Product {
            title: "bici da corsa".to_string(),
            location: "Milano".to_string(),
            price: price.map(|raw| Decimal::from_str(raw).expect("decimal")),
            link: "https://www.subito.it/biciclette/bici-da-corsa-milano-1.htm".to_string(),
        }
    }

    #[test]
    fn product_without_bounds_is_always_within() {
        assert!(product(None).within_bounds(None, None));
        assert!(product(Some("10")).within_bounds(None, None));
    }

    #[test]
    fn product_bounds_are_inclusive() {
        assert!(product(Some("10")).within_bounds(Some(10), Some(100)));
        assert!(product(Some("100")).within_bounds(Some(10), Some(100)));
        assert!(!product(Some("9.99")).within_bounds(Some(10), None));
        assert!(!product(Some("100.5")).within_bounds(None, Some(100)));
    }

    #[test]
    fn product_without_price_is_excluded_when_a_bound_is_set() {
        assert!(!product(None).within_bounds(Some(1), None));
        assert!(!product(None).within_bounds(None, Some(1)));
    }

    #[test]
    fn product_price_label_trims_trailing_zeros() {
        assert_eq!(product(Some("150.00")).price_label(), "150");
        assert_eq!(product(None).price_label(), "n/a");
    }

    #[test]
    fn tracked_query_compact_line_shows_name_and_url() {
        let query = TrackedQuery::new("foo", "http://example", Some(10), Some(100));

        assert_eq!(query.compact_line(), "search: foo\nquery url:http://example");
    }

    #[test]
    fn tracked_query_long_rendering_shows_bounds_and_product_count() {
        let mut query = TrackedQuery::new("foo", "http://example", Some(10), None);
        query.products.push(product(Some("50")));
        query.products.push(product(None));

        assert_eq!(
            query.to_string(),
            "search: foo\nquery url: http://example\nmin price: 10\nmax price: null\nknown products: 2"
        );
    }
}
