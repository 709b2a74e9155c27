//! Bing provider, scraping the public HTML results page.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::HttpConfig;
use crate::error::ProviderError;
use crate::http;
use crate::provider::Provider;
use crate::registry::descriptor_for;
use crate::types::{EngineDescriptor, Query, RawResult};

const ENDPOINT: &str = "https://www.bing.com/search";

/// Organic results per page, used for the 1-based `first` offset.
const PAGE_SIZE: u32 = 10;

/// Bing HTML scraper.
pub struct BingProvider {
    descriptor: EngineDescriptor,
    client: reqwest::Client,
    config: HttpConfig,
}

impl BingProvider {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            descriptor: descriptor_for("bing"),
            client: http::build_client(config)?,
            config: config.clone(),
        })
    }
}

/// `first` query parameter for a 1-based page.
fn first_offset(page: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE).saturating_add(1)
}

#[async_trait]
impl Provider for BingProvider {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        tracing::trace!(query = query.text(), page = query.page(), "Bing search");

        let first = first_offset(query.page()).to_string();
        let adult = if query.safe_search() { "strict" } else { "off" };

        let request = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("q", query.text()),
                ("setlang", "en"),
                ("first", first.as_str()),
                ("adlt", adult),
            ])
            .header(reqwest::header::USER_AGENT, http::user_agent(&self.config))
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.accept_language);
        let html = http::fetch_text(self.name(), request).await?;

        parse_bing_html(&html, &self.descriptor)
    }
}

fn selector(css: &str) -> Result<Selector, ProviderError> {
    Selector::parse(css).map_err(|e| ProviderError::parse(format!("invalid selector {css}: {e:?}")))
}

/// Parse a Bing HTML page into raw results, stamping `source_rank` 1..N.
pub(crate) fn parse_bing_html(
    html: &str,
    descriptor: &EngineDescriptor,
) -> Result<Vec<RawResult>, ProviderError> {
    let document = Html::parse_document(html);

    // Organic results live in li.b_algo under ol#b_results
    let container_sel = selector("#b_results, #b_content")?;
    let result_sel = selector("li.b_algo")?;
    let title_sel = selector("h2")?;
    let link_sel = selector("a")?;
    let snippet_sel = selector(".b_caption p, .b_lineclamp2")?;

    if document.select(&container_sel).next().is_none() {
        return Err(ProviderError::parse(
            "Bing page has no recognisable result markup",
        ));
    }

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let url = title_el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("http"));
        let Some(url) = url else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(RawResult {
            title,
            url: url.to_string(),
            snippet,
            source_rank: results.len() as u32 + 1,
            engine: descriptor.clone(),
        });
    }

    tracing::debug!(engine = %descriptor, count = results.len(), "results parsed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    const MOCK_BING_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<ol id="b_results">
<li class="b_algo">
  <h2><a href="https://www.rust-lang.org/" h="ID=SERP">Rust Programming Language</a></h2>
  <div class="b_caption"><p>A language empowering everyone to build reliable and efficient software.</p></div>
</li>
<li class="b_algo">
  <h2><a href="/relative/tracking">Internal link</a></h2>
</li>
<li class="b_algo">
  <h2><a href="https://doc.rust-lang.org/book/" h="ID=SERP">The Rust Programming Language Book</a></h2>
  <div class="b_caption"><p>An introductory book about Rust.</p></div>
</li>
<li class="b_ad"><h2><a href="https://ads.example.com/">Ad</a></h2></li>
</ol>
</body>
</html>"#;

    fn bing() -> EngineDescriptor {
        descriptor_for("bing")
    }

    #[test]
    fn first_offset_is_one_based() {
        assert_eq!(first_offset(1), 1);
        assert_eq!(first_offset(2), 11);
        assert_eq!(first_offset(5), 41);
    }

    #[test]
    fn first_offset_saturates_on_huge_pages() {
        assert_eq!(first_offset(u32::MAX), u32::MAX);
        assert_eq!(first_offset(0), 1);
    }

    #[test]
    fn parse_mock_html() {
        let results = parse_bing_html(MOCK_BING_HTML, &bing()).expect("parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[0].source_rank, 1);
        assert_eq!(results[0].engine.reliability_rank, 1);
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].snippet, "An introductory book about Rust.");
        assert_eq!(results[1].source_rank, 2);
    }

    #[test]
    fn parse_empty_results_list() {
        let html = r#"<html><body><ol id="b_results"></ol></body></html>"#;
        let results = parse_bing_html(html, &bing()).expect("parse");
        assert!(results.is_empty());
    }

    #[test]
    fn parse_captcha_page_is_parse_failure() {
        let html = "<html><body><div id=\"captcha\">Verify you are human</div></body></html>";
        let err = parse_bing_html(html, &bing()).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ParseFailure);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn live_bing_search() {
        let provider = BingProvider::new(&HttpConfig::default()).expect("client");
        let query = Query::new("rust programming language", 1, true).expect("query");
        let results = provider.search(&query).await.expect("live search");
        assert!(!results.is_empty());
    }
}
