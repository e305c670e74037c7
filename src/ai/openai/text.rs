use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage, ResponseFormat};
use crate::ai::TextGenerationService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiTextClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiTextClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(60), client),
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
impl TextGenerationService for OpenAiTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_completion_tokens: 4000,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self.http.chat_completion(request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::upstream(None, "No response from OpenAI chat API"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("OpenAI story response was truncated at the token limit");
        }

        choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::upstream(None, "Empty response from OpenAI chat API"))
    }
}
