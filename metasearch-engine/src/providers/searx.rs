//! SearXNG provider using an instance's JSON API.
//!
//! The instance must have the `json` output format enabled. Requests go to
//! `{base}/search?q=..&format=json&pageno=..&safesearch=..`.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::HttpConfig;
use crate::error::ProviderError;
use crate::http;
use crate::provider::Provider;
use crate::registry::descriptor_for;
use crate::types::{EngineDescriptor, Query, RawResult};

#[derive(Debug, Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Debug, Deserialize)]
struct SearxResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
}

/// Client for one SearXNG instance.
pub struct SearxProvider {
    descriptor: EngineDescriptor,
    endpoint: Url,
    client: reqwest::Client,
    config: HttpConfig,
}

impl SearxProvider {
    /// Provider for the instance rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails with `Unsupported` if `base_url` is not an http(s) URL, or
    /// `Network` if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &HttpConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            descriptor: descriptor_for("searx"),
            endpoint: search_endpoint(base_url)?,
            client: http::build_client(config)?,
            config: config.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn search_endpoint(base_url: &str) -> Result<Url, ProviderError> {
    let mut base = Url::parse(base_url.trim())
        .map_err(|e| ProviderError::unsupported(format!("invalid SearXNG url {base_url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ProviderError::unsupported(format!(
            "SearXNG url must be http(s), got {}",
            base.scheme()
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("search")
        .map_err(|e| ProviderError::unsupported(format!("invalid SearXNG url {base_url}: {e}")))
}

#[async_trait]
impl Provider for SearxProvider {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        tracing::trace!(query = query.text(), page = query.page(), "SearXNG search");

        let page = query.page().to_string();
        let safe = if query.safe_search() { "2" } else { "0" };

        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("q", query.text()),
                ("format", "json"),
                ("pageno", page.as_str()),
                ("safesearch", safe),
            ])
            .header(reqwest::header::USER_AGENT, http::user_agent(&self.config))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.accept_language);
        let body = http::fetch_text(self.name(), request).await?;

        parse_searx_json(&body, &self.descriptor)
    }
}

/// Parse a SearXNG JSON body into raw results, stamping `source_rank` 1..N.
///
/// Entries without a URL or title are skipped.
pub(crate) fn parse_searx_json(
    body: &str,
    descriptor: &EngineDescriptor,
) -> Result<Vec<RawResult>, ProviderError> {
    let response: SearxResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::parse(format!("SearXNG returned invalid JSON: {e}")))?;

    let mut results = Vec::with_capacity(response.results.len());
    for item in response.results {
        let title = item.title.trim();
        let url = item.url.trim();
        if title.is_empty() || url.is_empty() {
            continue;
        }
        results.push(RawResult {
            title: title.to_string(),
            url: url.to_string(),
            snippet: item.content.unwrap_or_default().trim().to_string(),
            source_rank: results.len() as u32 + 1,
            engine: descriptor.clone(),
        });
    }

    tracing::debug!(engine = %descriptor, count = results.len(), "results parsed");
    Ok(results)
}
