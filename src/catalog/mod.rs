//! Selectable-language catalog, fetched from the service with an offline
//! fallback.
//!
//! `CatalogResolver::fetch_catalog` never fails: every failure mode is
//! absorbed into a [`FetchError`] warning and the built-in fallback catalog
//! is returned with `degraded` set.

mod fallback;

pub use fallback::{FallbackLanguage, FallbackRegistry};

use crate::config::Config;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Mapping from language code to display name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageCatalog {
    languages: BTreeMap<String, String>,
}

impl LanguageCatalog {
    pub fn new(languages: BTreeMap<String, String>) -> Self {
        Self { languages }
    }

    /// The built-in catalog used in degraded mode.
    pub fn fallback() -> Self {
        let languages = FallbackRegistry::get()
            .list_all()
            .iter()
            .map(|lang| (lang.code.to_string(), lang.name.to_string()))
            .collect();
        Self { languages }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.languages.get(code).map(String::as_str)
    }

    /// Name of `code` in its own script, for languages the client knows offline.
    pub fn native_name(&self, code: &str) -> Option<&'static str> {
        FallbackRegistry::get()
            .get_by_code(code)
            .map(|lang| lang.native_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.languages
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl FromIterator<(String, String)> for LanguageCatalog {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            languages: iter.into_iter().collect(),
        }
    }
}

/// Why the remote catalog was not used. Never surfaced as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog request failed: {0}")]
    Network(String),

    #[error("catalog request returned HTTP {0}")]
    Status(u16),

    #[error("catalog response was not valid JSON: {0}")]
    Malformed(String),

    #[error("catalog response had no languages")]
    MissingLanguages,
}

/// Outcome of a catalog fetch: always a usable, non-empty catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResolution {
    pub catalog: LanguageCatalog,
    /// `true` when the fallback is in use
    pub degraded: bool,
    pub warning: Option<FetchError>,
}

impl CatalogResolution {
    fn remote(catalog: LanguageCatalog) -> Self {
        Self {
            catalog,
            degraded: false,
            warning: None,
        }
    }

    fn fallback(reason: FetchError) -> Self {
        Self {
            catalog: LanguageCatalog::fallback(),
            degraded: true,
            warning: Some(reason),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    languages: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct CatalogResolver {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl CatalogResolver {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.endpoint("languages"),
            timeout: config.catalog_timeout(),
        }
    }

    pub async fn fetch_catalog(&self) -> CatalogResolution {
        match self.fetch_remote().await {
            Ok(catalog) => {
                info!("Loaded {} languages from {}", catalog.len(), self.url);
                CatalogResolution::remote(catalog)
            }
            Err(e) => {
                warn!("Using fallback language catalog: {}", e);
                CatalogResolution::fallback(e)
            }
        }
    }

    async fn fetch_remote(&self) -> Result<LanguageCatalog, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_request_error)?;
        let parsed: LanguagesResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        match parsed.languages {
            Some(languages) if !languages.is_empty() => Ok(LanguageCatalog::new(languages)),
            _ => Err(FetchError::MissingLanguages),
        }
    }
}

fn classify_request_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error.to_string())
    }
}
