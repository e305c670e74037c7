use super::client::OpenAiHttpClient;
use super::types::{ImageGenerationRequest, ImageGenerationResponse};
use crate::ai::{mime, ImageGenerationService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiImageClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(120), client),
            model,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageGenerationService for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: "1024x1024".to_string(),
            quality: "medium".to_string(),
        };

        let response: ImageGenerationResponse =
            self.http.post("/v1/images/generations", &request).await?;

        let image_data = response
            .data
            .first()
            .ok_or_else(|| Error::upstream(None, "No image data in OpenAI response"))?;

        if let Some(url) = image_data.url.as_ref().filter(|u| !u.is_empty()) {
            return Ok(url.clone());
        }

        let b64_json = image_data.b64_json.as_ref().ok_or_else(|| {
            Error::upstream(None, "No image data (neither base64 nor URL) in response")
        })?;

        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64_json)
            .map_err(|e| Error::upstream(None, format!("Failed to decode base64 image: {}", e)))?;

        Ok(mime::to_data_url(&bytes))
    }
}
