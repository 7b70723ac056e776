use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use crate::config::ProviderSettings;
use crate::error::{AppError, Context};

use super::FetchResult;

/// Build the shared HTTP client: provider headers plus the per-request timeout.
pub fn build_client(settings: &ProviderSettings) -> FetchResult<Client> {
    let headers = build_headers(&settings.headers)?;
    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .build()
        .context("Failed to construct market data HTTP client")?;
    Ok(client)
}

/// Join `segments` onto `base`, percent-encoding each one.
pub fn endpoint(base: &str, segments: &[&str]) -> FetchResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|err| AppError::provider(format!("invalid provider URL `{base}`: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| AppError::provider(format!("provider URL `{base}` cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub fn expand_env_vars(value: &str) -> FetchResult<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                name.push(next);
            }

            if name.is_empty() {
                return Err(AppError::message(
                    "Encountered empty environment placeholder in header",
                ));
            }

            if !closed {
                return Err(AppError::message(
                    "Unterminated environment placeholder in header",
                ));
            }

            let value = std::env::var(&name).with_context(|| {
                format!("Environment variable {name} required by request header is not set")
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn build_headers(headers: &HashMap<String, String>) -> FetchResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid header name: {key}"))?;
        let expanded = expand_env_vars(value)?;
        let header_value = HeaderValue::from_str(&expanded)
            .with_context(|| format!("Invalid header value for {key}"))?;
        map.insert(name, header_value);
    }
    Ok(map)
}
