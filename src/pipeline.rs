//! Generation orchestration: story text, incremental persistence, and the
//! per-page image fan-out.

use crate::ai::ImageGenerationService;
use crate::models::{ImageConcurrency, Story, StoryForm, StoryKey, StoryRequest};
use crate::story::StorySource;
use crate::store::StoryStore;
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// User-facing message for any failed generation.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong while creating your story. Please try again.";

const READY_REDIRECT_DELAY: Duration = Duration::from_secs(1);
const ERROR_REDIRECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    RequestingText,
    PersistingInitial,
    RequestingImages,
    PersistedFinal,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The form where name, age, interests and theme are entered.
    Entry,
    Reader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Screen,
    pub after: Duration,
}

#[derive(Debug)]
pub enum Outcome {
    /// Name or age was missing; nothing was requested.
    Incomplete { redirect: Redirect },
    Completed {
        key: StoryKey,
        story: Story,
        redirect: Redirect,
    },
    Failed {
        message: &'static str,
        error: Error,
        redirect: Redirect,
    },
}

impl Outcome {
    pub fn redirect(&self) -> Redirect {
        match self {
            Outcome::Incomplete { redirect }
            | Outcome::Completed { redirect, .. }
            | Outcome::Failed { redirect, .. } => *redirect,
        }
    }
}

/// Drives one story from form input to a persisted, illustrated story.
pub struct Orchestrator {
    stories: Box<dyn StorySource>,
    images: Box<dyn ImageGenerationService>,
    store: Box<dyn StoryStore>,
    concurrency: ImageConcurrency,
}

/// Injectable service bundle used to construct [`Orchestrator`].
pub struct OrchestratorServices {
    pub stories: Box<dyn StorySource>,
    pub images: Box<dyn ImageGenerationService>,
    pub store: Box<dyn StoryStore>,
}

impl Orchestrator {
    pub fn with_services(services: OrchestratorServices, concurrency: ImageConcurrency) -> Self {
        Self {
            stories: services.stories,
            images: services.images,
            store: services.store,
            concurrency,
        }
    }

    pub async fn run(&self, form: StoryForm, key: StoryKey) -> Outcome {
        self.run_with_progress(form, key, None).await
    }

    /// Run one generation, publishing the current state on `progress`.
    /// The state is reset to [`GenerationState::Idle`] before anything else.
    pub async fn run_with_progress(
        &self,
        form: StoryForm,
        key: StoryKey,
        progress: Option<watch::Sender<GenerationState>>,
    ) -> Outcome {
        let report = |state: GenerationState| {
            if let Some(tx) = &progress {
                tx.send_replace(state);
            }
        };
        report(GenerationState::Idle);

        let Some(request) = form.into_request() else {
            info!("Story form is missing name or age, returning to entry screen");
            return Outcome::Incomplete {
                redirect: Redirect {
                    to: Screen::Entry,
                    after: Duration::ZERO,
                },
            };
        };

        match self.generate(&request, &key, &report).await {
            Ok(story) => {
                report(GenerationState::Done);
                Outcome::Completed {
                    key,
                    story,
                    redirect: Redirect {
                        to: Screen::Reader,
                        after: READY_REDIRECT_DELAY,
                    },
                }
            }
            Err(e) => {
                error!("[{}] Story generation failed: {}", key, e);
                report(GenerationState::Error);
                Outcome::Failed {
                    message: GENERIC_ERROR_MESSAGE,
                    error: e,
                    redirect: Redirect {
                        to: Screen::Entry,
                        after: ERROR_REDIRECT_DELAY,
                    },
                }
            }
        }
    }

    async fn generate(
        &self,
        request: &StoryRequest,
        key: &StoryKey,
        report: &(dyn Fn(GenerationState) + Sync),
    ) -> Result<Story> {
        report(GenerationState::RequestingText);
        info!("[{}] Creating a story for {}", key, request.name);
        let mut story = self.stories.generate_story(request).await?;

        report(GenerationState::PersistingInitial);
        self.store.save(key, &story).await?;
        info!("[{}] Saved text-only story '{}'", key, story.title);

        report(GenerationState::RequestingImages);
        self.illustrate(key, &mut story).await;

        self.store.save(key, &story).await?;
        report(GenerationState::PersistedFinal);
        info!(
            "[{}] Saved story with {}/{} illustrated pages",
            key,
            story.illustrated_pages(),
            story.pages.len()
        );

        Ok(story)
    }

    /// Request one image per page. Failures only leave that page without an
    /// image.
    async fn illustrate(&self, key: &StoryKey, story: &mut Story) {
        let limit = self.concurrency.limit(story.pages.len());
        info!(
            "[{}] Requesting {} page images ({} in flight)",
            key,
            story.pages.len(),
            limit
        );

        let results: Vec<(usize, Option<String>)> =
            stream::iter(story.pages.iter().enumerate().map(|(index, page)| {
                let prompt = page.image_prompt.clone();
                async move { (index, self.page_image(key, index, &prompt).await) }
            }))
            .buffer_unordered(limit)
            .collect()
            .await;

        for (index, image_url) in results {
            if let Some(page) = story.pages.get_mut(index) {
                page.image_url = image_url;
            }
        }
    }

    async fn page_image(&self, key: &StoryKey, index: usize, prompt: &str) -> Option<String> {
        match self.images.generate_image(prompt).await {
            Ok(url) if !url.trim().is_empty() => {
                info!("[{}] Page {} image ready", key, index + 1);
                Some(url)
            }
            Ok(_) => {
                warn!("[{}] Page {} image service returned no image", key, index + 1);
                None
            }
            Err(e) => {
                warn!("[{}] Page {} image failed: {}", key, index + 1, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockImageClient, MockTextClient};
    use crate::story::StoryGenerator;
    use crate::store::{MemoryStoryStore, StoryStore};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn five_page_story() -> String {
        serde_json::json!({
            "title": "Ali in Space",
            "characterDescription": "a small boy with a green dinosaur backpack",
            "pages": (1..=5).map(|i| serde_json::json!({
                "text": format!("Page {}", i),
                "sceneAction": format!("scene {}", i),
            })).collect::<Vec<_>>(),
        })
        .to_string()
    }

    fn form() -> StoryForm {
        StoryForm {
            name: Some("Ali".to_string()),
            age: Some("5".to_string()),
            interests: Some("dinosaurs".to_string()),
            theme: Some("space".to_string()),
            locale: Some("en".to_string()),
        }
    }

    fn build(
        text: MockTextClient,
        images: MockImageClient,
        store: MemoryStoryStore,
        concurrency: ImageConcurrency,
    ) -> Orchestrator {
        Orchestrator::with_services(
            OrchestratorServices {
                stories: Box::new(StoryGenerator::new(Box::new(text))),
                images: Box::new(images),
                store: Box::new(store),
            },
            concurrency,
        )
    }

    /// Records the published generation state at every save.
    #[derive(Clone)]
    struct StateRecordingStore {
        state: watch::Receiver<GenerationState>,
        seen: Arc<Mutex<Vec<GenerationState>>>,
    }

    #[async_trait]
    impl StoryStore for StateRecordingStore {
        async fn save(&self, _key: &StoryKey, _story: &Story) -> Result<()> {
            self.seen.lock().unwrap().push(*self.state.borrow());
            Ok(())
        }

        async fn load(&self, _key: &StoryKey) -> Result<Option<Story>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_states_follow_the_happy_path() {
        let (tx, rx) = watch::channel(GenerationState::Idle);
        let store = StateRecordingStore {
            state: tx.subscribe(),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let orchestrator = Orchestrator::with_services(
            OrchestratorServices {
                stories: Box::new(StoryGenerator::new(Box::new(
                    MockTextClient::new().with_response(five_page_story()),
                ))),
                images: Box::new(MockImageClient::new()),
                store: Box::new(store.clone()),
            },
            ImageConcurrency::Unbounded,
        );

        let outcome = orchestrator
            .run_with_progress(form(), StoryKey::generate(), Some(tx))
            .await;
        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert_eq!(
            outcome.redirect(),
            Redirect {
                to: Screen::Reader,
                after: Duration::from_secs(1)
            }
        );

        assert_eq!(
            *store.seen.lock().unwrap(),
            vec![
                GenerationState::PersistingInitial,
                GenerationState::RequestingImages,
            ]
        );
        assert_eq!(*rx.borrow(), GenerationState::Done);
    }

    #[tokio::test]
    async fn test_progress_starts_idle_and_stays_idle_for_incomplete_form() {
        let (tx, rx) = watch::channel(GenerationState::Error);
        let text = MockTextClient::new();
        let probe = text.clone();
        let orchestrator = build(
            text,
            MockImageClient::new(),
            MemoryStoryStore::new(),
            ImageConcurrency::Unbounded,
        );

        let outcome = orchestrator
            .run_with_progress(StoryForm::default(), StoryKey::generate(), Some(tx))
            .await;

        assert!(matches!(outcome, Outcome::Incomplete { .. }));
        assert_eq!(*rx.borrow(), GenerationState::Idle);
        assert_eq!(probe.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_story_is_saved_before_images() {
        let store = MemoryStoryStore::new();
        let orchestrator = build(
            MockTextClient::new().with_response(five_page_story()),
            MockImageClient::new().with_image_url("http://x/1.png".to_string()),
            store.clone(),
            ImageConcurrency::Unbounded,
        );
        let key = StoryKey::generate();

        orchestrator.run(form(), key.clone()).await;

        let saves = store.get_saves();
        assert_eq!(saves.len(), 2);
        assert!(saves.iter().all(|(k, _)| *k == key));
        assert_eq!(saves[0].1.illustrated_pages(), 0);
        assert_eq!(saves[1].1.illustrated_pages(), 5);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_caps_in_flight_images() {
        let images = MockImageClient::new().with_delay(Duration::from_millis(20));
        let probe = images.clone();
        let orchestrator = build(
            MockTextClient::new().with_response(five_page_story()),
            images,
            MemoryStoryStore::new(),
            ImageConcurrency::Bounded(2),
        );

        let outcome = orchestrator.run(form(), StoryKey::generate()).await;

        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert_eq!(probe.get_call_count(), 5);
        assert_eq!(probe.get_max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_concurrency_issues_all_at_once() {
        let images = MockImageClient::new().with_delay(Duration::from_millis(20));
        let probe = images.clone();
        let orchestrator = build(
            MockTextClient::new().with_response(five_page_story()),
            images,
            MemoryStoryStore::new(),
            ImageConcurrency::Unbounded,
        );

        orchestrator.run(form(), StoryKey::generate()).await;

        assert_eq!(probe.get_max_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_text_failure_reports_error_and_saves_nothing() {
        let store = MemoryStoryStore::new();
        let images = MockImageClient::new();
        let image_probe = images.clone();
        let orchestrator = build(
            MockTextClient::new().with_failure(500, "boom"),
            images,
            store.clone(),
            ImageConcurrency::Unbounded,
        );
        let (tx, rx) = watch::channel(GenerationState::Idle);

        let outcome = orchestrator
            .run_with_progress(form(), StoryKey::generate(), Some(tx))
            .await;

        match outcome {
            Outcome::Failed {
                message,
                error,
                redirect,
            } => {
                assert_eq!(message, GENERIC_ERROR_MESSAGE);
                assert!(matches!(error, Error::Upstream { .. }));
                assert_eq!(redirect.to, Screen::Entry);
                assert_eq!(redirect.after, Duration::from_secs(3));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(store.get_save_count(), 0);
        assert_eq!(image_probe.get_call_count(), 0);

        assert_eq!(*rx.borrow(), GenerationState::Error);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_before_images() {
        let images = MockImageClient::new();
        let probe = images.clone();
        let orchestrator = build(
            MockTextClient::new().with_response(five_page_story()),
            images,
            MemoryStoryStore::failing(),
            ImageConcurrency::Unbounded,
        );

        let outcome = orchestrator.run(form(), StoryKey::generate()).await;

        assert!(matches!(
            outcome,
            Outcome::Failed {
                error: Error::Storage(_),
                ..
            }
        ));
        assert_eq!(probe.get_call_count(), 0);
    }
}
