//! Illustration file persistence.
//!
//! Generated images are the session's only durable artifact. They are
//! written under a configurable directory using the
//! `story_chapter_<N>.png` naming scheme, with `_edited` variants for
//! regenerated scenes.

use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes chapter illustrations to addressable file storage.
#[derive(Debug, Clone)]
pub struct ImageGallery {
    dir: PathBuf,
}

impl ImageGallery {
    /// Create a gallery rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a chapter illustration, returning the written path.
    pub async fn save_chapter(&self, chapter: u32, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        self.write(format!("story_chapter_{chapter}.png"), bytes)
            .await
    }

    /// Save an edited variant of a chapter illustration.
    pub async fn save_edited(&self, chapter: u32, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        self.write(format!("story_chapter_{chapter}_edited.png"), bytes)
            .await
    }

    async fn write(&self, name: String, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }
}
