use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_LANGUAGE: &str = "hi";
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 7] = ["mp3", "wav", "mp4", "avi", "mov", "m4a", "ogg"];

#[derive(Debug, Clone)]
pub struct Config {
    // Remote service
    pub base_url: String,
    pub upload_timeout_ms: u64,
    pub catalog_timeout_ms: u64,

    // Validation
    pub allowed_extensions: Vec<String>,
    pub max_file_bytes: u64,

    // Session
    pub default_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            catalog_timeout_ms: DEFAULT_CATALOG_TIMEOUT_MS,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to the
    /// local development defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            // Remote service
            base_url: std::env::var("TRANSLATOR_API_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| normalize_base_url(&v))
                .unwrap_or(defaults.base_url),
            upload_timeout_ms: std::env::var("UPLOAD_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_timeout_ms),
            catalog_timeout_ms: std::env::var("CATALOG_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.catalog_timeout_ms),

            // Validation
            allowed_extensions: std::env::var("ALLOWED_EXTENSIONS")
                .ok()
                .map(|v| parse_extension_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.allowed_extensions),
            max_file_bytes: std::env::var("MAX_FILE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_file_bytes),

            // Session
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_language),
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Parse a comma-separated extension list ("mp3, .WAV,ogg")
fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
