//! Bounded story memory.
//!
//! Keeps the generated chapters for prompt context. Long sessions are
//! trimmed with the origin chapter pinned: the opening establishes the
//! character and premise, so it must survive even when the middle of the
//! story falls out of the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of chapters kept in the log.
const MAX_CHAPTERS: usize = 10;

/// Chapters retained alongside the origin chapter when trimming.
const RECENT_KEPT: usize = 8;

/// Chapter content characters included in prompt context.
const CONTEXT_CONTENT_CHARS: usize = 100;

/// User-input characters included in prompt context.
const CONTEXT_INPUT_CHARS: usize = 50;

/// One generated chapter and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// 1-based chapter number; keeps counting across trims.
    pub chapter: u32,
    /// The generated narrative text.
    pub content: String,
    /// The user request that produced this chapter; `None` for the opening.
    pub user_input: Option<String>,
    /// The learning subject active when the chapter was written.
    pub learning_focus: String,
    /// The protagonist's name at the time.
    pub character_name: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only chapter log with origin-pinned retention.
///
/// Invariant: at most [`MAX_CHAPTERS`] records. When an append would exceed
/// that, the origin chapter plus the [`RECENT_KEPT`] most recent records
/// survive and the middle is dropped. This is position-pinned truncation,
/// not LRU.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryLog {
    chapters: Vec<ChapterRecord>,
    current_chapter: u32,
}

impl StoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new chapter and return its number.
    pub fn append(
        &mut self,
        content: impl Into<String>,
        user_input: Option<String>,
        learning_focus: impl Into<String>,
        character_name: impl Into<String>,
    ) -> u32 {
        self.current_chapter += 1;
        self.chapters.push(ChapterRecord {
            chapter: self.current_chapter,
            content: content.into(),
            user_input,
            learning_focus: learning_focus.into(),
            character_name: character_name.into(),
            created_at: Utc::now(),
        });
        self.trim();
        self.current_chapter
    }

    fn trim(&mut self) {
        if self.chapters.len() > MAX_CHAPTERS {
            let recent_from = self.chapters.len() - RECENT_KEPT;
            let mut kept = Vec::with_capacity(1 + RECENT_KEPT);
            kept.push(self.chapters[0].clone());
            kept.extend(self.chapters[recent_from..].iter().cloned());
            self.chapters = kept;
        }
    }

    /// Number of retained chapters (not the current chapter number).
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// The highest chapter number written so far; 0 before the opening.
    pub fn current_chapter(&self) -> u32 {
        self.current_chapter
    }

    /// All retained chapters in story order.
    pub fn chapters(&self) -> &[ChapterRecord] {
        &self.chapters
    }

    /// The pinned opening chapter.
    pub fn origin(&self) -> Option<&ChapterRecord> {
        self.chapters.first()
    }

    pub fn latest(&self) -> Option<&ChapterRecord> {
        self.chapters.last()
    }

    /// Summarize the last `last_n` chapters for prompt context.
    ///
    /// Content and user input are truncated so a handful of chapters never
    /// dominates the prompt.
    pub fn recent_context(&self, last_n: usize) -> String {
        if self.chapters.is_empty() {
            return "아직 이야기가 시작되지 않았습니다.".to_string();
        }

        let from = self.chapters.len().saturating_sub(last_n);
        let mut lines = Vec::with_capacity(self.chapters.len() - from);
        for record in &self.chapters[from..] {
            let mut line = format!(
                "챕터 {}: {}",
                record.chapter,
                truncate_chars(&record.content, CONTEXT_CONTENT_CHARS)
            );
            if let Some(ref input) = record.user_input {
                line.push_str(&format!(
                    " (사용자 요청: {})",
                    truncate_chars(input, CONTEXT_INPUT_CHARS)
                ));
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    /// Learning subjects covered so far, in chapter order.
    pub fn topics_covered(&self) -> Vec<&str> {
        self.chapters
            .iter()
            .map(|record| record.learning_focus.as_str())
            .collect()
    }
}

/// Truncate to `max` characters, appending an ellipsis when cut.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    }
}
