use serde::{Deserialize, Serialize};
use tracing::warn;

/// Languages the client ships strings for. `Es` is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    Ca,
    En,
}

impl Language {
    /// Every supported language, primary first
    pub const ALL: [Language; 3] = [Language::Es, Language::Ca, Language::En];

    pub const DEFAULT: Language = Language::Es;

    /// Two-letter code as persisted and sent to the backend
    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::Ca => "ca",
            Language::En => "en",
        }
    }

    /// Name of the language in that language
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::Es => "Español",
            Language::Ca => "Català",
            Language::En => "English",
        }
    }

    /// Parse a language code or locale tag.
    /// Case-insensitive; region and encoding suffixes (`en-GB`, `ca_ES.UTF-8`) are ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let lower = value.to_ascii_lowercase();
        let lang = lower.split(['-', '_', '.', '@']).next().unwrap_or("");
        match lang {
            "es" => Some(Language::Es),
            "ca" => Some(Language::Ca),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Parse `value`, falling back to the default for anything unsupported
    pub fn coerce(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            warn!(code = value, fallback = Self::DEFAULT.code(), "Unsupported language code");
            Self::DEFAULT
        })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
