//! Shared HTTP client with User-Agent rotation for provider requests.
//!
//! Provides a configured [`reqwest::Client`] with browser-like headers and
//! cookie support, and maps transport failures onto [`ProviderError`].

use rand::seq::SliceRandom;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::ProviderError;

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for provider traffic.
///
/// The client keeps cookies across requests (consent pages), follows up to
/// ten redirects and bounds every request by `config.timeout_seconds`.
/// The User-Agent is chosen per request by [`user_agent`].
///
/// # Errors
///
/// Returns a [`ProviderError`] of kind `Network` if the client cannot be constructed.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ProviderError::network(format!("failed to build HTTP client: {e}")))
}

/// The configured User-Agent, or a random one from the rotation list.
pub fn user_agent(config: &HttpConfig) -> String {
    match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    }
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array; choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}

/// Map a transport error to the provider error taxonomy.
///
/// Timeouts become `Timeout`; connection, TLS, status and body errors become
/// `Network`; a body that fails to decode becomes `ParseFailure`.
pub fn classify(engine: &str, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(format!("{engine} request timed out"))
    } else if err.is_decode() {
        ProviderError::parse(format!("{engine} response could not be decoded: {err}"))
    } else if let Some(status) = err.status() {
        ProviderError::network(format!("{engine} returned HTTP {status}"))
    } else {
        ProviderError::network(format!("{engine} request failed: {err}"))
    }
}

/// Send `request` and return the body of a successful (2xx) response.
pub(crate) async fn fetch_text(
    engine: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify(engine, &e))?
        .error_for_status()
        .map_err(|e| classify(engine, &e))?;

    let body = response.text().await.map_err(|e| classify(engine, &e))?;
    tracing::trace!(engine, bytes = body.len(), "response received");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_user_agent_returns_valid_ua() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
        assert!(ua.contains("Mozilla/5.0"));
    }

    #[test]
    fn custom_user_agent_wins() {
        let config = HttpConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert_eq!(user_agent(&config), "CustomBot/1.0");
    }

    #[test]
    fn rotation_used_without_custom_agent() {
        let ua = user_agent(&HttpConfig::default());
        assert!(USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }
}
