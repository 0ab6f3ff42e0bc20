//! Story orchestration.
//!
//! Contains the narrator agent, the bounded story log, intent tagging, and
//! the generation backend seam.

mod agent;
pub mod backend;
pub mod intent;
pub mod log;

pub use agent::{extract_character_name, should_illustrate, Narrator, StoryTurn};
pub use backend::{GeminiBackend, Illustration, StoryBackend, IMAGE_MODEL, TEXT_MODEL};
pub use intent::{classify, Intent};
pub use log::{ChapterRecord, StoryLog};
