//! Testing utilities.
//!
//! Provides a scripted generation backend and a session harness so the
//! full conversation flow can be exercised deterministically, without
//! network access. Failure injection goes through the real narrator, so
//! the fallback substitution paths are the ones under test.

use crate::narrator::{Illustration, StoryBackend};
use crate::session::{Reply, Stage, StorySession, StoryConfig};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Stub PNG bytes returned when no illustration reply is scripted.
pub const STUB_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47];

/// Text returned when no text reply is scripted.
const DEFAULT_TEXT: &str = "이야기가 계속 이어집니다.";

/// A scripted text-generation reply.
#[derive(Debug, Clone)]
enum MockText {
    Reply(String),
    Failure,
}

/// A scripted illustration reply.
#[derive(Debug, Clone)]
enum MockIllustration {
    Image(Vec<u8>),
    Description(String),
    Failure,
}

/// Scripted generation backend.
///
/// Replies are consumed in order per call kind. When a queue runs dry the
/// backend succeeds with a canned reply, so only the calls a test cares
/// about need scripting.
#[derive(Default)]
pub struct MockBackend {
    texts: Mutex<VecDeque<MockText>>,
    illustrations: Mutex<VecDeque<MockIllustration>>,
    text_prompts: Mutex<Vec<String>>,
    illustration_prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    pub fn queue_text(&self, text: impl Into<String>) {
        self.texts
            .lock()
            .unwrap()
            .push_back(MockText::Reply(text.into()));
    }

    /// Queue a text-generation failure.
    pub fn queue_text_failure(&self) {
        self.texts.lock().unwrap().push_back(MockText::Failure);
    }

    /// Queue an illustration reply with image bytes.
    pub fn queue_image(&self, png: impl Into<Vec<u8>>) {
        self.illustrations
            .lock()
            .unwrap()
            .push_back(MockIllustration::Image(png.into()));
    }

    /// Queue a degraded illustration reply (scene description).
    pub fn queue_description(&self, description: impl Into<String>) {
        self.illustrations
            .lock()
            .unwrap()
            .push_back(MockIllustration::Description(description.into()));
    }

    /// Queue an illustration failure.
    pub fn queue_illustration_failure(&self) {
        self.illustrations
            .lock()
            .unwrap()
            .push_back(MockIllustration::Failure);
    }

    /// Prompts received by `generate_text`, in call order.
    pub fn text_prompts(&self) -> Vec<String> {
        self.text_prompts.lock().unwrap().clone()
    }

    /// Prompts received by `generate_illustration`, in call order.
    pub fn illustration_prompts(&self) -> Vec<String> {
        self.illustration_prompts.lock().unwrap().clone()
    }

    pub fn text_call_count(&self) -> usize {
        self.text_prompts.lock().unwrap().len()
    }

    pub fn illustration_call_count(&self) -> usize {
        self.illustration_prompts.lock().unwrap().len()
    }
}

fn scripted_failure() -> gemini::Error {
    gemini::Error::Network("scripted failure".to_string())
}

#[async_trait]
impl StoryBackend for MockBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, gemini::Error> {
        self.text_prompts.lock().unwrap().push(prompt.to_string());
        match self.texts.lock().unwrap().pop_front() {
            Some(MockText::Reply(text)) => Ok(text),
            Some(MockText::Failure) => Err(scripted_failure()),
            None => Ok(DEFAULT_TEXT.to_string()),
        }
    }

    async fn generate_illustration(&self, prompt: &str) -> Result<Illustration, gemini::Error> {
        self.illustration_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());
        match self.illustrations.lock().unwrap().pop_front() {
            Some(MockIllustration::Image(png)) => Ok(Illustration::Image(png)),
            Some(MockIllustration::Description(text)) => Ok(Illustration::Description(text)),
            Some(MockIllustration::Failure) => Err(scripted_failure()),
            None => Ok(Illustration::Image(STUB_PNG.to_vec())),
        }
    }
}

/// Harness wrapping a session over a [`MockBackend`].
pub struct StoryHarness {
    pub backend: Arc<MockBackend>,
    pub session: StorySession,
}

impl StoryHarness {
    pub fn new() -> Self {
        Self::with_config(StoryConfig::new())
    }

    pub fn with_config(config: StoryConfig) -> Self {
        let backend = Arc::new(MockBackend::new());
        let session = StorySession::with_config(
            Arc::clone(&backend) as Arc<dyn StoryBackend>,
            config,
        );
        Self { backend, session }
    }

    /// Send one message through the session.
    pub async fn send(&mut self, input: &str) -> Reply {
        self.session.handle_message(input).await
    }

    /// Run the standard intake answers (숫자 / 6살 호기심 많은 아이 /
    /// 강아지와 파란색), landing on ReadyToStart.
    pub async fn complete_intake(&mut self) {
        self.send("숫자").await;
        self.send("6살이고 호기심이 많아요").await;
        self.send("강아지와 파란색").await;
    }

    /// Complete intake and issue the start trigger.
    pub async fn start_story(&mut self) -> Reply {
        self.complete_intake().await;
        self.send("동화 시작").await
    }

    /// Chapters written so far (0 before the story opens).
    pub fn current_chapter(&self) -> u32 {
        self.session
            .narrator()
            .map(|n| n.log().current_chapter())
            .unwrap_or(0)
    }

    pub fn character_name(&self) -> Option<&str> {
        self.session.narrator().map(|n| n.character_name())
    }
}

impl Default for StoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session is at the expected stage.
#[track_caller]
pub fn assert_stage(harness: &StoryHarness, stage: Stage) {
    assert_eq!(
        harness.session.stage(),
        stage,
        "Expected session stage {stage:?}"
    );
}

/// Assert a reply carries a binary image attachment.
#[track_caller]
pub fn assert_illustrated(reply: &Reply) {
    assert!(
        reply.attachment.is_some(),
        "Expected an image attachment, got none. Reply text: {}",
        reply.text
    );
}

/// Assert a reply carries no binary image attachment.
#[track_caller]
pub fn assert_not_illustrated(reply: &Reply) {
    assert!(
        reply.attachment.is_none(),
        "Expected no image attachment for this chapter"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_scripted_text() {
        let backend = MockBackend::new();
        backend.queue_text("첫 번째");
        backend.queue_text_failure();

        assert_eq!(backend.generate_text("p1").await.unwrap(), "첫 번째");
        assert!(backend.generate_text("p2").await.is_err());
        // Exhausted queue falls back to the canned reply.
        assert_eq!(backend.generate_text("p3").await.unwrap(), DEFAULT_TEXT);
        assert_eq!(backend.text_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_scripted_illustrations() {
        let backend = MockBackend::new();
        backend.queue_description("🎨 상상해보세요");
        backend.queue_illustration_failure();

        assert_eq!(
            backend.generate_illustration("p1").await.unwrap(),
            Illustration::Description("🎨 상상해보세요".to_string())
        );
        assert!(backend.generate_illustration("p2").await.is_err());
        assert_eq!(
            backend.generate_illustration("p3").await.unwrap(),
            Illustration::Image(STUB_PNG.to_vec())
        );
    }

    #[tokio::test]
    async fn test_harness_intake_shortcut() {
        let mut harness = StoryHarness::new();
        harness.complete_intake().await;
        assert_stage(&harness, Stage::ReadyToStart);
    }
}
