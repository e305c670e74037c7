use super::StoryStore;
use crate::models::{Story, StoryKey};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemoryStoryStore {
    stories: Arc<Mutex<HashMap<StoryKey, Story>>>,
    saves: Arc<Mutex<Vec<(StoryKey, Story)>>>,
    fail_saves: bool,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails with a storage error.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn get_save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    /// Every story passed to `save`, in call order.
    pub fn get_saves(&self) -> Vec<(StoryKey, Story)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn save(&self, key: &StoryKey, story: &Story) -> Result<()> {
        if self.fail_saves {
            return Err(Error::Storage("store is unavailable".to_string()));
        }

        self.saves
            .lock()
            .unwrap()
            .push((key.clone(), story.clone()));
        self.stories
            .lock()
            .unwrap()
            .insert(key.clone(), story.clone());
        Ok(())
    }

    async fn load(&self, key: &StoryKey) -> Result<Option<Story>> {
        Ok(self.stories.lock().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(title: &str) -> Story {
        Story {
            title: title.to_string(),
            character_description: None,
            pages: vec![],
        }
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryStoryStore::new();
        let a = StoryKey::generate();
        let b = StoryKey::generate();

        store.save(&a, &story("A")).await.unwrap();
        store.save(&b, &story("B")).await.unwrap();
        store.save(&a, &story("A2")).await.unwrap();

        assert_eq!(store.load(&a).await.unwrap().unwrap().title, "A2");
        assert_eq!(store.load(&b).await.unwrap().unwrap().title, "B");
        assert_eq!(store.get_save_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MemoryStoryStore::failing();
        let err = store.save(&StoryKey::current(), &story("A")).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.load(&StoryKey::current()).await.unwrap().is_none());
    }
}
