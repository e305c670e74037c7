use crate::ai::TextGenerationService;
use crate::models::{Story, StoryRequest};
use crate::story::extract_story;
use crate::{prompts, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Anything that can turn a request into a text-only story.
#[async_trait]
pub trait StorySource: Send + Sync {
    async fn generate_story(&self, request: &StoryRequest) -> Result<Story>;
}

/// In-process story generation: prompt builder, one model call, extraction.
pub struct StoryGenerator {
    text: Box<dyn TextGenerationService>,
}

impl StoryGenerator {
    pub fn new(text: Box<dyn TextGenerationService>) -> Self {
        Self { text }
    }
}

#[async_trait]
impl StorySource for StoryGenerator {
    async fn generate_story(&self, request: &StoryRequest) -> Result<Story> {
        let prompt = prompts::build_story_prompt(request);
        info!(
            "Requesting story for {} (age {}, locale {}, template {})",
            request.name,
            request.age,
            request.locale.code(),
            prompt.version
        );

        let raw = self.text.generate_text(&prompt.text).await?;
        debug!("Model returned {} chars", raw.len());

        let story = extract_story(&raw)?;
        info!("Generated story '{}' with {} pages", story.title, story.pages.len());
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockTextClient;
    use crate::Error;

    #[tokio::test]
    async fn test_generator_extracts_fenced_response() {
        let text = MockTextClient::new().with_response(
            "```json\n{\"title\":\"T\",\"characterDescription\":\"a girl\",\"pages\":[{\"text\":\"a\",\"sceneAction\":\"jumps\"}]}\n```"
                .to_string(),
        );
        let probe = text.clone();
        let generator = StoryGenerator::new(Box::new(text));

        let story = generator
            .generate_story(&StoryRequest::new("Mia", 6))
            .await
            .unwrap();

        assert_eq!(story.title, "T");
        assert!(story.pages[0].image_prompt.contains("a girl jumps"));
        assert_eq!(probe.get_call_count(), 1);
        assert!(probe.prompts()[0].contains("named Mia"));
    }

    #[tokio::test]
    async fn test_generator_propagates_upstream_error() {
        let text = MockTextClient::new().with_failure(503, "overloaded");
        let generator = StoryGenerator::new(Box::new(text));

        let err = generator
            .generate_story(&StoryRequest::new("Mia", 6))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: Some(503), .. }));
    }
}
