//! DuckDuckGo provider, scraping the HTML-only endpoint.
//!
//! `https://html.duckduckgo.com/html/` needs no JavaScript and tolerates
//! automated requests. Result links are wrapped in a `/l/?uddg=` redirect
//! which is unwrapped during parsing.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::config::HttpConfig;
use crate::error::ProviderError;
use crate::http;
use crate::provider::Provider;
use crate::registry::descriptor_for;
use crate::types::{EngineDescriptor, Query, RawResult};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Results per HTML page, used to compute the `s` offset.
const PAGE_SIZE: u32 = 30;

/// `s`/`dc` offset for a 1-based page.
fn page_offset(page: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE)
}

/// DuckDuckGo HTML scraper.
pub struct DuckDuckGoProvider {
    descriptor: EngineDescriptor,
    client: reqwest::Client,
    config: HttpConfig,
}

impl DuckDuckGoProvider {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            descriptor: descriptor_for("duckduckgo"),
            client: http::build_client(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Provider for DuckDuckGoProvider {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        tracing::trace!(query = query.text(), page = query.page(), "DuckDuckGo search");

        let offset = page_offset(query.page()).to_string();
        let mut params = vec![
            ("q", query.text()),
            ("kp", if query.safe_search() { "1" } else { "-2" }),
        ];
        if query.page() > 1 {
            params.push(("s", offset.as_str()));
            params.push(("dc", offset.as_str()));
        }

        let request = self
            .client
            .post(ENDPOINT)
            .form(&params)
            .header(reqwest::header::USER_AGENT, http::user_agent(&self.config))
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.accept_language);
        let html = http::fetch_text(self.name(), request).await?;

        parse_duckduckgo_html(&html, &self.descriptor)
    }
}

/// Extract the target URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps URLs like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

fn selector(css: &str) -> Result<Selector, ProviderError> {
    Selector::parse(css).map_err(|e| ProviderError::parse(format!("invalid selector {css}: {e:?}")))
}

/// Parse a DuckDuckGo HTML page into raw results, stamping `source_rank` 1..N.
pub(crate) fn parse_duckduckgo_html(
    html: &str,
    descriptor: &EngineDescriptor,
) -> Result<Vec<RawResult>, ProviderError> {
    let document = Html::parse_document(html);

    let result_sel = selector(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;
    let container_sel = selector("#links, .results, .no-results")?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let Some(url) = title_el.value().attr("href").and_then(extract_url) else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(RawResult {
            title,
            url,
            snippet,
            source_rank: results.len() as u32 + 1,
            engine: descriptor.clone(),
        });
    }

    if results.is_empty() && document.select(&container_sel).next().is_none() {
        return Err(ProviderError::parse(
            "DuckDuckGo page has no recognisable result markup",
        ));
    }

    tracing::debug!(engine = %descriptor, count = results.len(), "results parsed");
    Ok(results)
}
