//! Persistence for generated stories
//!
//! A story is stored whole under a [`StoryKey`]; every save overwrites the
//! previous record for that key.

pub mod file;
pub mod memory;

pub use file::FileStoryStore;
pub use memory::MemoryStoryStore;

use crate::models::{Story, StoryKey};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn save(&self, key: &StoryKey, story: &Story) -> Result<()>;
    async fn load(&self, key: &StoryKey) -> Result<Option<Story>>;
}
