use super::{ImageGenerationService, TextGenerationService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct MockTextClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Option<(u16, String)>,
    prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTextClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Every call fails with an upstream error carrying this status.
    pub fn with_failure(mut self, status: u16, message: &str) -> Self {
        self.failure = Some((status, message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockTextClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerationService for MockTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some((status, message)) = &self.failure {
            return Err(Error::upstream(*status, message.clone()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(r#"{"title":"A Mock Story","pages":[{"text":"The end.","imagePrompt":"a closed book"}]}"#.to_string())
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockImageClient {
    response: Arc<Mutex<Option<String>>>,
    failing_prompts: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
    in_flight: Arc<Mutex<usize>>,
    max_in_flight: Arc<Mutex<usize>>,
}

impl MockImageClient {
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
            failing_prompts: Arc::new(Mutex::new(HashSet::new())),
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
            in_flight: Arc::new(Mutex::new(0)),
            max_in_flight: Arc::new(Mutex::new(0)),
        }
    }

    /// Fixed image reference returned for every successful call.
    pub fn with_image_url(self, url: String) -> Self {
        *self.response.lock().unwrap() = Some(url);
        self
    }

    /// Calls with exactly this prompt fail with a 500 upstream error.
    pub fn with_failing_prompt(self, prompt: String) -> Self {
        self.failing_prompts.lock().unwrap().insert(prompt);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Highest number of calls observed running at the same time.
    pub fn get_max_in_flight(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }
}

impl Default for MockImageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*in_flight);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        *self.in_flight.lock().unwrap() -= 1;

        if self.failing_prompts.lock().unwrap().contains(prompt) {
            return Err(Error::upstream(500, "mock image failure"));
        }

        let response = self.response.lock().unwrap().clone();
        Ok(response.unwrap_or_else(|| format!("https://mock-images.example.com/{}.png", count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_text_client_cycles_responses() {
        let client = MockTextClient::new()
            .with_response("first".to_string())
            .with_response("second".to_string());

        assert_eq!(client.generate_text("a").await.unwrap(), "first");
        assert_eq!(client.generate_text("b").await.unwrap(), "second");
        // Should cycle back
        assert_eq!(client.generate_text("c").await.unwrap(), "first");
        assert_eq!(client.get_call_count(), 3);
        assert_eq!(client.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_image_client_failing_prompt() {
        let client = MockImageClient::new()
            .with_image_url("http://x/1.png".to_string())
            .with_failing_prompt("bad".to_string());

        assert_eq!(client.generate_image("good").await.unwrap(), "http://x/1.png");
        assert!(client.generate_image("bad").await.is_err());
        assert_eq!(client.get_call_count(), 2);
    }
}
