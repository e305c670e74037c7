use super::StoryStore;
use crate::models::{Story, StoryKey};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk record: the story plus its key and save time.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStory {
    id: StoryKey,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    story: Story,
}

/// One pretty-printed JSON file per story key.
pub struct FileStoryStore {
    dir: PathBuf,
}

impl FileStoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &StoryKey) -> Result<PathBuf> {
        let valid = !key.as_str().is_empty()
            && key
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Storage(format!("Invalid story key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl StoryStore for FileStoryStore {
    async fn save(&self, key: &StoryKey, story: &Story) -> Result<()> {
        let path = self.path_for(key)?;
        let record = StoredStory {
            id: key.clone(),
            saved_at: Utc::now(),
            story: story.clone(),
        };
        let json = serde_json::to_vec_pretty(&record)?;

        // Write then rename so readers never observe a half-written record.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved story {} to {}", key, path.display());
        Ok(())
    }

    async fn load(&self, key: &StoryKey) -> Result<Option<Story>> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: StoredStory = serde_json::from_slice(&bytes)?;
        Ok(Some(record.story))
    }
}
