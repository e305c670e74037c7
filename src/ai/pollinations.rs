//! Keyless public image service. The image is rendered lazily by the
//! service when the returned URL is fetched, so generation is only URL
//! construction.

use crate::ai::ImageGenerationService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;

const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai";
const IMAGE_SIZE: &str = "1024";

pub struct PollinationsImageClient {
    base_url: String,
}

impl PollinationsImageClient {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn image_url(&self, prompt: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("Invalid image base URL '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                Error::Configuration(format!("Image base URL '{}' cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .push("prompt")
            .push(prompt);

        url.query_pairs_mut()
            .append_pair("width", IMAGE_SIZE)
            .append_pair("height", IMAGE_SIZE)
            .append_pair("nologo", "true");

        Ok(url)
    }
}

impl Default for PollinationsImageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for PollinationsImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("image prompt is empty".to_string()));
        }
        Ok(self.image_url(prompt.trim())?.to_string())
    }
}
