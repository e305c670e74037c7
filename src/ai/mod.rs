//! AI service integration for story text and page illustrations
//!
//! Provides interfaces to Gemini and OpenAI for text and image generation,
//! plus a keyless placeholder image service.

pub mod gemini;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod pollinations;

pub use gemini::{GeminiImageClient, GeminiTextClient};
pub use mock::{MockImageClient, MockTextClient};
pub use openai::{OpenAiImageClient, OpenAiTextClient};
pub use pollinations::PollinationsImageClient;

use crate::models::{Config, ImageProvider, TextProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Submits a fully rendered prompt and returns the model's raw text.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// Produces a displayable image reference (URL or `data:` URL) for a prompt.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// Stand-in for a provider whose configuration is incomplete. Every call
/// fails with [`Error::Configuration`].
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerationService for Unconfigured {
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        Err(Error::Configuration(self.reason.clone()))
    }
}

#[async_trait]
impl ImageGenerationService for Unconfigured {
    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        Err(Error::Configuration(self.reason.clone()))
    }
}

fn require_key(key: &Option<String>, name: &str) -> Result<String> {
    key.clone()
        .ok_or_else(|| Error::Configuration(format!("{} is not set", name)))
}

pub fn build_text_service(
    config: &Config,
    client: reqwest::Client,
) -> Result<Box<dyn TextGenerationService>> {
    match config.text_provider {
        TextProvider::Gemini => {
            let api_key = require_key(&config.gemini_api_key, "GEMINI_API_KEY")?;
            info!("Text provider: Gemini (model: {})", config.text_model);
            Ok(Box::new(GeminiTextClient::new_with_client(
                api_key,
                config.text_model.clone(),
                client,
            )))
        }
        TextProvider::OpenAi => {
            let api_key = require_key(&config.openai_api_key, "OPENAI_API_KEY")?;
            info!("Text provider: OpenAI (model: {})", config.text_model);
            Ok(Box::new(OpenAiTextClient::new_with_client(
                api_key,
                config.text_model.clone(),
                client,
            )))
        }
    }
}

pub fn build_image_service(
    config: &Config,
    client: reqwest::Client,
) -> Result<Box<dyn ImageGenerationService>> {
    match config.image_provider {
        ImageProvider::Gemini => {
            let api_key = require_key(&config.gemini_api_key, "GEMINI_API_KEY")?;
            info!("Image provider: Gemini (model: {})", config.image_model);
            Ok(Box::new(GeminiImageClient::new_with_client(
                api_key,
                config.image_model.clone(),
                client,
            )))
        }
        ImageProvider::OpenAi => {
            let api_key = require_key(&config.openai_api_key, "OPENAI_API_KEY")?;
            info!("Image provider: OpenAI (model: {})", config.image_model);
            Ok(Box::new(OpenAiImageClient::new_with_client(
                api_key,
                config.image_model.clone(),
                client,
            )))
        }
        ImageProvider::Pollinations => {
            info!("Image provider: Pollinations (keyless)");
            Ok(Box::new(PollinationsImageClient::new()))
        }
    }
}

/// Like [`build_text_service`], but a missing credential yields a service
/// that reports the configuration error per request instead of failing now.
pub fn text_service_or_unconfigured(
    config: &Config,
    client: reqwest::Client,
) -> Box<dyn TextGenerationService> {
    build_text_service(config, client).unwrap_or_else(|e| {
        warn!("Text generation unavailable: {}", e);
        Box::new(Unconfigured::new(e.to_string()))
    })
}

pub fn image_service_or_unconfigured(
    config: &Config,
    client: reqwest::Client,
) -> Box<dyn ImageGenerationService> {
    build_image_service(config, client).unwrap_or_else(|e| {
        warn!("Image generation unavailable: {}", e);
        Box::new(Unconfigured::new(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_missing_gemini_key_is_configuration_error() {
        let result = build_text_service(&config(&[]), reqwest::Client::new());
        match result {
            Err(Error::Configuration(message)) => assert!(message.contains("GEMINI_API_KEY")),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_pollinations_needs_no_key() {
        assert!(build_image_service(&config(&[]), reqwest::Client::new()).is_ok());
    }

    #[test]
    fn test_openai_providers_need_openai_key() {
        let cfg = config(&[("TEXT_PROVIDER", "openai"), ("IMAGE_PROVIDER", "openai")]);
        assert!(build_text_service(&cfg, reqwest::Client::new()).is_err());
        assert!(build_image_service(&cfg, reqwest::Client::new()).is_err());

        let cfg = config(&[
            ("TEXT_PROVIDER", "openai"),
            ("IMAGE_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);
        assert!(build_text_service(&cfg, reqwest::Client::new()).is_ok());
        assert!(build_image_service(&cfg, reqwest::Client::new()).is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_text_service_fails_per_call() {
        let service = text_service_or_unconfigured(&config(&[]), reqwest::Client::new());
        let err = service.generate_text("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
