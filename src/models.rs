//! Data models and structures
//!
//! Defines the story document, the inbound generation request, persistence
//! keys, and environment-driven configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Number of pages every generated story must have.
pub const STORY_PAGE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
    De,
    Es,
    It,
    Tr,
    Zh,
    Ja,
    Ko,
}

impl Locale {
    /// Resolve a locale code, falling back to English for anything unknown.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "fr" => Locale::Fr,
            "de" => Locale::De,
            "es" => Locale::Es,
            "it" => Locale::It,
            "tr" => Locale::Tr,
            "zh" => Locale::Zh,
            "ja" => Locale::Ja,
            "ko" => Locale::Ko,
            _ => Locale::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Es => "es",
            Locale::It => "it",
            Locale::Tr => "tr",
            Locale::Zh => "zh",
            Locale::Ja => "ja",
            Locale::Ko => "ko",
        }
    }

    /// Language name the model is asked to write the narrative in.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Fr => "French",
            Locale::De => "German",
            Locale::Es => "Spanish",
            Locale::It => "Italian",
            Locale::Tr => "Turkish",
            Locale::Zh => "Simplified Chinese",
            Locale::Ja => "Japanese",
            Locale::Ko => "Korean",
        }
    }
}

/// A complete story generation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoryRequest {
    pub name: String,
    pub age: u32,
    pub interests: String,
    pub theme: String,
    pub locale: Locale,
}

impl StoryRequest {
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
            interests: String::new(),
            theme: String::new(),
            locale: Locale::default(),
        }
    }

    pub fn with_interests(mut self, interests: impl Into<String>) -> Self {
        self.interests = interests.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// Raw form input as it arrives from a browser form or query string.
///
/// Every field is optional; `age` may be a JSON number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryForm {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_age")]
    pub age: Option<String>,
    pub interests: Option<String>,
    pub theme: Option<String>,
    pub locale: Option<String>,
}

impl StoryForm {
    /// Returns `None` when the name or a numeric age is missing.
    pub fn into_request(self) -> Option<StoryRequest> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let age = self.age.and_then(|a| a.trim().parse::<u32>().ok())?;

        Some(StoryRequest {
            name: name.trim().to_string(),
            age,
            interests: self.interests.unwrap_or_default(),
            theme: self.theme.unwrap_or_default(),
            locale: self
                .locale
                .as_deref()
                .map(Locale::from_code)
                .unwrap_or_default(),
        })
    }
}

fn deserialize_age<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AgeField {
        Number(u64),
        Text(String),
    }

    Ok(Option::<AgeField>::deserialize(deserializer)?.map(|age| match age {
        AgeField::Number(n) => n.to_string(),
        AgeField::Text(s) => s,
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoryPage {
    pub text: String,
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_description: Option<String>,
    pub pages: Vec<StoryPage>,
}

impl Story {
    pub fn illustrated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.image_url.is_some()).count()
    }
}

/// Identifier a story is persisted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryKey(String);

impl StoryKey {
    const CURRENT: &'static str = "current_story";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Single shared record used by clients that only track one story.
    pub fn current() -> Self {
        Self(Self::CURRENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProvider {
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    Gemini,
    OpenAi,
    Pollinations,
}

/// How many page image requests may be in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageConcurrency {
    #[default]
    Unbounded,
    Bounded(usize),
}

impl ImageConcurrency {
    pub fn from_max_in_flight(max: usize) -> Self {
        if max == 0 {
            ImageConcurrency::Unbounded
        } else {
            ImageConcurrency::Bounded(max)
        }
    }

    /// Effective in-flight limit for `pages` requests, never below one.
    pub fn limit(&self, pages: usize) -> usize {
        match self {
            ImageConcurrency::Unbounded => pages.max(1),
            ImageConcurrency::Bounded(max) => (*max).clamp(1, pages.max(1)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub text_provider: TextProvider,
    pub text_model: String,
    pub image_provider: ImageProvider,
    pub image_model: String,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub story_dir: String,
    pub image_concurrency: ImageConcurrency,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let text_provider = match var("TEXT_PROVIDER").as_deref() {
            None | Some("gemini") => TextProvider::Gemini,
            Some("openai") => TextProvider::OpenAi,
            Some(other) => {
                return Err(crate::Error::Configuration(format!(
                    "Unknown TEXT_PROVIDER '{}'",
                    other
                )))
            }
        };

        let image_provider = match var("IMAGE_PROVIDER").as_deref() {
            None | Some("pollinations") => ImageProvider::Pollinations,
            Some("gemini") => ImageProvider::Gemini,
            Some("openai") => ImageProvider::OpenAi,
            Some(other) => {
                return Err(crate::Error::Configuration(format!(
                    "Unknown IMAGE_PROVIDER '{}'",
                    other
                )))
            }
        };

        let text_model = var("TEXT_MODEL").unwrap_or_else(|| match text_provider {
            TextProvider::Gemini => "gemini-flash-latest".to_string(),
            TextProvider::OpenAi => "gpt-4o-mini".to_string(),
        });

        let image_model = var("IMAGE_MODEL").unwrap_or_else(|| match image_provider {
            ImageProvider::Gemini => "gemini-2.5-flash-image".to_string(),
            ImageProvider::OpenAi => "gpt-image-1".to_string(),
            ImageProvider::Pollinations => String::new(),
        });

        let http_port = match var("HTTP_PORT") {
            Some(port) => port.parse().map_err(|_| {
                crate::Error::Configuration(format!("Invalid HTTP_PORT '{}'", port))
            })?,
            None => 3000,
        };

        let max_in_flight = match var("IMAGE_MAX_IN_FLIGHT") {
            Some(max) => max.parse().map_err(|_| {
                crate::Error::Configuration(format!("Invalid IMAGE_MAX_IN_FLIGHT '{}'", max))
            })?,
            None => 0,
        };

        Ok(Self {
            text_provider,
            text_model,
            image_provider,
            image_model,
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            openai_api_key: var("OPENAI_API_KEY"),
            http_host: var("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            http_port,
            story_dir: var("STORY_DIR").unwrap_or_else(|| "stories".to_string()),
            image_concurrency: ImageConcurrency::from_max_in_flight(max_in_flight),
        })
    }
}
