//! HTTP client for the story API, usable as the orchestrator's story and
//! image source when generation runs in a separate server.

use crate::ai::ImageGenerationService;
use crate::models::{Story, StoryRequest};
use crate::story::StorySource;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequestBody<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponseBody {
    image_url: Option<String>,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self::new_with_client(base_url, Client::new())
    }

    pub fn new_with_client(base_url: String, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    async fn post<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach story API at {}: {}", url, e);
                Error::upstream(None, format!("Failed to reach story API: {}", e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            Error::upstream(status.as_u16(), format!("Failed to read API response: {}", e))
        })?;

        if !status.is_success() {
            // Prefer the server's diagnostic detail, then its message, then the raw body.
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => body.details.or(body.error).unwrap_or(text),
                Err(_) => text,
            };
            tracing::error!("Story API error (status {}) on {}: {}", status, path, message);
            return Err(Error::upstream(status.as_u16(), message));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::upstream(
                status.as_u16(),
                format!("Unexpected story API response: {}", e),
            )
        })
    }
}

#[async_trait]
impl StorySource for ApiClient {
    async fn generate_story(&self, request: &StoryRequest) -> Result<Story> {
        self.post("/api/generate-story", request).await
    }
}

#[async_trait]
impl ImageGenerationService for ApiClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let body: ImageResponseBody = self
            .post("/api/generate-image", &ImageRequestBody { prompt })
            .await?;

        body.image_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::upstream(None, "Story API returned no imageUrl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Locale;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_story_posts_request_fields() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate-story"))
            .and(body_json(serde_json::json!({
                "name": "Ali",
                "age": 5,
                "interests": "dinosaurs",
                "theme": "space",
                "locale": "tr"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Uzay",
                "pages": [{ "text": "Bir", "imagePrompt": "a rocket" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(format!("{}/", server.uri()));
        let request = StoryRequest::new("Ali", 5)
            .with_interests("dinosaurs")
            .with_theme("space")
            .with_locale(Locale::Tr);

        let story = client.generate_story(&request).await.unwrap();
        assert_eq!(story.title, "Uzay");
        assert_eq!(story.pages[0].image_prompt, "a rocket");
    }

    #[tokio::test]
    async fn test_error_body_details_become_upstream_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate-story"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Malformed model response",
                "details": "not json"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client
            .generate_story(&StoryRequest::new("Ali", 5))
            .await
            .unwrap_err();

        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "not json");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_image_reads_image_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate-image"))
            .and(body_json(serde_json::json!({ "prompt": "a comet" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "imageUrl": "http://x/1.png" })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        assert_eq!(client.generate_image("a comet").await.unwrap(), "http://x/1.png");
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate-image"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.generate_image("a comet").await.unwrap_err();
        assert_eq!(err.to_string(), "Upstream error (status 502): bad gateway");
    }
}
