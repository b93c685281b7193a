//! Built-in fallback languages.
//!
//! Used whenever the remote catalog cannot be obtained. The registry is
//! initialized once on first access and stays immutable thereafter.

use std::sync::OnceLock;

/// A language the client can offer without asking the service.
#[derive(Debug, Clone)]
pub struct FallbackLanguage {
    /// Short language code sent as `target_language` (e.g., "hi", "ta")
    pub code: &'static str,

    /// English display name (e.g., "Hindi")
    pub name: &'static str,

    /// Name in the language itself (e.g., "हिन्दी")
    pub native_name: &'static str,
}

pub struct FallbackRegistry {
    languages: Vec<FallbackLanguage>,
}

static REGISTRY: OnceLock<FallbackRegistry> = OnceLock::new();

impl FallbackRegistry {
    pub fn get() -> &'static FallbackRegistry {
        REGISTRY.get_or_init(|| FallbackRegistry {
            languages: fallback_languages(),
        })
    }

    pub fn get_by_code(&self, code: &str) -> Option<&FallbackLanguage> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    pub fn list_all(&self) -> &[FallbackLanguage] {
        &self.languages
    }
}

/// Regional languages served by the translation backend.
fn fallback_languages() -> Vec<FallbackLanguage> {
    vec![
        FallbackLanguage {
            code: "hi",
            name: "Hindi",
            native_name: "हिन्दी",
        },
        FallbackLanguage {
            code: "mr",
            name: "Marathi",
            native_name: "मराठी",
        },
        FallbackLanguage {
            code: "ta",
            name: "Tamil",
            native_name: "தமிழ்",
        },
        FallbackLanguage {
            code: "te",
            name: "Telugu",
            native_name: "తెలుగు",
        },
        FallbackLanguage {
            code: "bn",
            name: "Bengali",
            native_name: "বাংলা",
        },
        FallbackLanguage {
            code: "gu",
            name: "Gujarati",
            native_name: "ગુજરાતી",
        },
    ]
}
