use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Product, TrackedQuery};

const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.subito.it/annunci-italia/vendita/usato/";
const USER_AGENT: &str = concat!("subito-searcher/", env!("CARGO_PKG_VERSION"));
const NEXT_DATA_MARKER: &str = "id=\"__NEXT_DATA__\"";
const LISTING_POINTER: &str = "/props/pageProps/initialState/items/list";
const AD_KIND: &str = "AdItem";

/// Executes searches and tracks which listings have already been seen.
pub trait QueryRunner {
    fn run_query(
        &self,
        name: &str,
        url: &str,
        min_price: Option<u64>,
        max_price: Option<u64>,
    ) -> Result<TrackedQuery, RunnerError>;

    /// Re-run `query` and return listings not seen before, remembering them.
    fn refresh(&self, query: &mut TrackedQuery) -> Result<Vec<Product>, RunnerError>;
}

#[derive(Debug, Clone)]
pub struct SubitoRunner {
    client: Client,
    max_products: usize,
}

impl SubitoRunner {
    /// `max_products` caps how many seen listings each query remembers.
    pub fn new(timeout_secs: u64, max_products: usize) -> Result<Self, RunnerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(RunnerError::BuildClient)?;

        Ok(Self {
            client,
            max_products,
        })
    }

    fn fetch_products(
        &self,
        url: &str,
        min_price: Option<u64>,
        max_price: Option<u64>,
    ) -> Result<Vec<Product>, RunnerError> {
        tracing::debug!(url, "fetching search page");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .map_err(|source| RunnerError::Transport { source })?;

        let status_code = response.status().as_u16();
        let body = response
            .text()
            .map_err(|source| RunnerError::Transport { source })?;

        let products = parse_search_page(status_code, &body)?
            .into_iter()
            .filter(|product| product.within_bounds(min_price, max_price))
            .collect::<Vec<_>>();

        tracing::debug!(url, count = products.len(), "parsed search page");
        Ok(products)
    }
}

impl QueryRunner for SubitoRunner {
    fn run_query(
        &self,
        name: &str,
        url: &str,
        min_price: Option<u64>,
        max_price: Option<u64>,
    ) -> Result<TrackedQuery, RunnerError> {
        let url = search_url(name, url)?;
        let mut query = TrackedQuery::new(name, url, min_price, max_price);
        let fetched = self.fetch_products(&query.url, min_price, max_price)?;
        remember_new_products(&mut query, fetched, self.max_products);
        Ok(query)
    }

    fn refresh(&self, query: &mut TrackedQuery) -> Result<Vec<Product>, RunnerError> {
        let fetched = self.fetch_products(&query.url, query.min_price, query.max_price)?;
        Ok(remember_new_products(query, fetched, self.max_products))
    }
}

/// Use `url` as given, or build a site-wide search for `name` when it is blank.
pub fn search_url(name: &str, url: &str) -> Result<String, RunnerError> {
    let url = url.trim();
    if !url.is_empty() {
        return Ok(url.to_string());
    }

    reqwest::Url::parse_with_params(DEFAULT_SEARCH_ENDPOINT, &[("q", name.trim())])
        .map(|url| url.to_string())
        .map_err(|error| RunnerError::InvalidUrl(error.to_string()))
}

/// Append unseen products to the query memory and return them in page order.
///
/// The memory keeps at most `max_products` entries, dropping the oldest first.
pub fn remember_new_products(
    query: &mut TrackedQuery,
    fetched: Vec<Product>,
    max_products: usize,
) -> Vec<Product> {
    let mut seen: HashSet<String> = query
        .products
        .iter()
        .map(|product| product.link.clone())
        .collect();

    let fresh: Vec<Product> = fetched
        .into_iter()
        .filter(|product| seen.insert(product.link.clone()))
        .collect();

    query.products.extend(fresh.iter().cloned());
    if query.products.len() > max_products {
        let keep_from = query.products.len() - max_products;
        query.products = query.products.split_off(keep_from);
    }
    fresh
}

pub fn parse_search_page(status_code: u16, body: &str) -> Result<Vec<Product>, RunnerError> {
    if !(200..=299).contains(&status_code) {
        return Err(RunnerError::Http {
            status: status_code,
        });
    }

    let payload = extract_next_data(body).ok_or(RunnerError::MissingListingData)?;
    let document: Value = serde_json::from_str(payload).map_err(RunnerError::InvalidResponse)?;
    let Some(entries) = document.pointer(LISTING_POINTER).and_then(Value::as_array) else {
        return Err(RunnerError::MissingListingData);
    };

    Ok(entries.iter().filter_map(parse_listing).collect())
}

fn extract_next_data(body: &str) -> Option<&str> {
    let marker = body.find(NEXT_DATA_MARKER)?;
    let after_marker = &body[marker..];
    let open_end = after_marker.find('>')? + 1;
    let content = &after_marker[open_end..];
    let close = content.find("</script>")?;
    Some(content[..close].trim())
}

fn parse_listing(entry: &Value) -> Option<Product> {
    let item = entry.get("item").unwrap_or(entry);

    let kind = item.get("kind").and_then(Value::as_str);
    if kind.is_some_and(|kind| kind != AD_KIND) {
        return None;
    }

    let link = text_at(item, "/urls/default")?;
    let title = text_at(item, "/subject").unwrap_or_default();
    let location = text_at(item, "/geo/town/value")
        .or_else(|| text_at(item, "/geo/city/value"))
        .unwrap_or_default();
    let price = item.get("features").and_then(parse_price);

    Some(Product {
        title,
        location,
        price,
        link,
    })
}

fn text_at(item: &Value, pointer: &str) -> Option<String> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .map(collapse_spaces)
        .filter(|value| !value.is_empty())
}

fn parse_price(features: &Value) -> Option<Decimal> {
    let price_feature = match features {
        Value::Object(map) => map.get("/price"),
        Value::Array(list) => list
            .iter()
            .find(|feature| feature.get("uri").and_then(Value::as_str) == Some("/price")),
        _ => None,
    }?;

    let raw = price_feature.pointer("/values/0/key")?;
    match raw {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

fn collapse_spaces(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to build search client")]
    BuildClient(#[source] reqwest::Error),
    #[error("search request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("search site error (HTTP {status})")]
    Http { status: u16 },
    #[error("search page has no listing data")]
    MissingListingData,
    #[error("invalid listing data")]
    InvalidResponse(#[source] serde_json::Error),
    #[error("invalid search url: {0}")]
    InvalidUrl(String),
}
