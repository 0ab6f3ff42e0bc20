//! The AI story narrator.
//!
//! Owns the story log and character identity for one session and turns
//! user requests into chapters via the generation backend. Backend
//! failures never escape: every generation call site substitutes a
//! deterministic fallback so the conversation can always proceed.

use super::backend::{Illustration, StoryBackend};
use super::intent::{classify, Intent};
use super::log::StoryLog;
use crate::profile::Profile;
use std::sync::Arc;
use tracing::{debug, warn};

/// Chapters of context included in continuation prompts.
const CONTEXT_CHAPTERS: usize = 3;

/// Story text characters included in illustration prompts.
const ILLUSTRATION_CONTEXT_CHARS: usize = 200;

/// Slots in the progress gauge.
const GAUGE_SLOTS: usize = 5;

/// Animal keywords scanned in priority order, with the display name each
/// maps to.
const CHARACTER_NAMES: &[(&str, &str)] = &[
    ("강아지", "멍멍이"),
    ("고양이", "야옹이"),
    ("토끼", "토토"),
    ("곰", "곰돌이"),
];

/// Protagonist name when no animal keyword matches.
const DEFAULT_CHARACTER_NAME: &str = "꼬마";

/// Derive the protagonist's name from the favorites answer.
///
/// Deterministic: the first animal keyword in priority order wins, and the
/// same favorites always produce the same name.
pub fn extract_character_name(favorites: &str) -> &'static str {
    let lowered = favorites.to_lowercase();
    for (keyword, name) in CHARACTER_NAMES {
        if lowered.contains(keyword) {
            return name;
        }
    }
    DEFAULT_CHARACTER_NAME
}

/// Illustration cadence: the opening chapter always, then every third.
///
/// Image calls are the expensive part of a turn; this bounds them to
/// roughly one in three chapters.
pub fn should_illustrate(chapter: u32) -> bool {
    chapter == 1 || chapter % 3 == 0
}

/// One produced chapter, ready for presentation.
#[derive(Debug, Clone)]
pub struct StoryTurn {
    pub chapter: u32,
    pub text: String,
    /// Intent tag of the triggering request; `None` for the opening.
    pub intent: Option<Intent>,
    pub illustration: Option<Illustration>,
    /// True when the text came from the fallback template rather than the
    /// backend.
    pub fallback: bool,
}

/// A posed quiz question and its expected answer letter.
#[derive(Debug, Clone)]
struct Quiz {
    answer: String,
}

/// The story narrator for one session.
pub struct Narrator {
    backend: Arc<dyn StoryBackend>,
    profile: Profile,
    character_name: &'static str,
    log: StoryLog,
    quiz: Option<Quiz>,
}

impl Narrator {
    /// Create a narrator for a completed profile.
    pub fn new(backend: Arc<dyn StoryBackend>, profile: Profile) -> Self {
        let character_name = extract_character_name(&profile.favorites);
        debug!(character_name, "narrator created");
        Self {
            backend,
            profile,
            character_name,
            log: StoryLog::new(),
            quiz: None,
        }
    }

    pub fn character_name(&self) -> &str {
        self.character_name
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn log(&self) -> &StoryLog {
        &self.log
    }

    /// Generate the opening chapter. Always illustrated (cadence rule for
    /// chapter 1).
    pub async fn open_story(&mut self) -> StoryTurn {
        let prompt = self.opening_prompt();
        let (text, fallback) = match self.backend.generate_text(&prompt).await {
            Ok(text) => (text, false),
            Err(error) => {
                warn!(%error, "opening generation failed, using fallback text");
                (fallback_opening(&self.profile), true)
            }
        };

        let chapter = self.log.append(
            text.clone(),
            None,
            &self.profile.learning_subject,
            self.character_name,
        );
        let illustration = self.illustrate(chapter, &text, "story_start").await;

        StoryTurn {
            chapter,
            text,
            intent: None,
            illustration,
            fallback,
        }
    }

    /// Generate the next chapter from a user request.
    pub async fn continue_story(&mut self, user_input: &str) -> StoryTurn {
        let intent = classify(user_input);
        debug!(intent = intent.name(), "continuing story");

        let prompt = self.continuation_prompt(user_input);
        let (text, fallback) = match self.backend.generate_text(&prompt).await {
            Ok(text) => (text, false),
            Err(error) => {
                warn!(%error, "continuation generation failed, using fallback text");
                (fallback_continuation(self.character_name, user_input), true)
            }
        };

        let chapter = self.log.append(
            text.clone(),
            Some(user_input.to_string()),
            &self.profile.learning_subject,
            self.character_name,
        );
        let illustration = self.illustrate(chapter, &text, user_input).await;

        StoryTurn {
            chapter,
            text,
            intent: Some(intent),
            illustration,
            fallback,
        }
    }

    /// Request an illustration if the cadence calls for one. Failure means
    /// no illustration, never a failed turn.
    async fn illustrate(
        &mut self,
        chapter: u32,
        story_text: &str,
        user_input: &str,
    ) -> Option<Illustration> {
        if !should_illustrate(chapter) {
            return None;
        }

        let prompt = self.illustration_prompt(chapter, story_text, user_input);
        match self.backend.generate_illustration(&prompt).await {
            Ok(illustration) => Some(illustration),
            Err(error) => {
                warn!(chapter, %error, "illustration failed, continuing without one");
                None
            }
        }
    }

    /// Regenerate the latest scene with an edit applied.
    ///
    /// Returns the chapter the edit belongs to alongside the new
    /// illustration.
    pub async fn edit_illustration(
        &mut self,
        edit_request: &str,
    ) -> Result<(u32, Illustration), gemini::Error> {
        let chapter = self.log.current_chapter();
        let mut prompt = String::from(include_str!("prompts/illustration.txt"));
        prompt.push_str(&format!("\nPrevious scene modified: {edit_request}\n"));
        prompt.push_str(&format!("Character: {} and friends\n", self.character_name));

        let illustration = self.backend.generate_illustration(&prompt).await?;
        Ok((chapter, illustration))
    }

    /// Pose a quiz question about the learning subject, remembering the
    /// expected answer letter.
    pub async fn pose_question(&mut self) -> Result<String, gemini::Error> {
        let prompt = self.quiz_prompt();
        let question = self.backend.generate_text(&prompt).await?;

        let answer = parse_answer_letter(&question);
        self.quiz = Some(Quiz {
            answer: answer.to_string(),
        });
        Ok(question)
    }

    /// Check a quiz answer: case-insensitive, trimmed. `None` when no
    /// question is pending.
    pub fn check_answer(&self, user_answer: &str) -> Option<bool> {
        let quiz = self.quiz.as_ref()?;
        Some(user_answer.trim().to_uppercase() == quiz.answer)
    }

    /// Grade a quiz answer and clear the pending question.
    pub fn answer_question(&mut self, user_answer: &str) -> Option<bool> {
        let correct = self.check_answer(user_answer)?;
        self.quiz = None;
        Some(correct)
    }

    pub fn has_pending_question(&self) -> bool {
        self.quiz.is_some()
    }

    /// Visual progress gauge: one filled slot per completed chapter, up to
    /// five. Purely presentational.
    pub fn progress_gauge(&self) -> String {
        let total = self.log.current_chapter() as usize;
        let filled = total.min(GAUGE_SLOTS);
        let mut gauge = "🟢".repeat(filled);
        gauge.push_str(&"⚪".repeat(GAUGE_SLOTS - filled));
        format!("진행도: {gauge} ({total}/{GAUGE_SLOTS}+ 챕터)")
    }

    fn opening_prompt(&self) -> String {
        let mut prompt = String::from(include_str!("prompts/opening.txt"));
        prompt.push_str("\n사용자 정보:\n");
        prompt.push_str(&format!("- 학습 주제: {}\n", self.profile.learning_subject));
        prompt.push_str(&format!("- 사용자 특성: {}\n", self.profile.description));
        prompt.push_str(&format!("- 좋아하는 것들: {}\n", self.profile.favorites));
        prompt
    }

    fn continuation_prompt(&self, user_input: &str) -> String {
        let mut prompt = String::from(include_str!("prompts/continuation.txt"));
        prompt.push_str("\n현재 상황:\n");
        prompt.push_str(&self.log.recent_context(CONTEXT_CHAPTERS));
        prompt.push_str("\n\n캐릭터 정보:\n");
        prompt.push_str(&self.character_block());
        prompt.push_str(&format!("\n사용자 요청: {user_input}\n"));
        prompt
    }

    fn illustration_prompt(&self, chapter: u32, story_text: &str, user_input: &str) -> String {
        let excerpt: String = story_text
            .chars()
            .take(ILLUSTRATION_CONTEXT_CHARS)
            .collect();

        let mut prompt = String::from(include_str!("prompts/illustration.txt"));
        prompt.push_str(&format!("\nChapter {chapter}\n"));
        prompt.push_str(&format!("Story content: {excerpt}\n"));
        prompt.push_str(&format!(
            "Character: {} ({})\n",
            self.character_name, self.profile.description
        ));
        prompt.push_str(&format!("Favorite elements: {}\n", self.profile.favorites));
        prompt.push_str(&format!(
            "Learning subject: {}\n",
            self.profile.learning_subject
        ));
        prompt.push_str(&format!("User request context: {user_input}\n"));
        prompt
    }

    fn quiz_prompt(&self) -> String {
        let mut prompt = String::from(include_str!("prompts/quiz.txt"));
        prompt.push_str(&format!("\n학습 주제: {}\n", self.profile.learning_subject));
        prompt.push_str(&format!("주인공: {}\n", self.character_name));
        prompt.push_str(&format!("좋아하는 것들: {}\n", self.profile.favorites));
        prompt
    }

    /// Stable character description block, repeated in every continuation
    /// prompt for consistency.
    fn character_block(&self) -> String {
        format!(
            "주인공: {}\n사용자 특성: {}\n좋아하는 것들: {}\n학습 주제: {}\n",
            self.character_name,
            self.profile.description,
            self.profile.favorites,
            self.profile.learning_subject
        )
    }
}

/// Fixed opening used when the backend fails: embeds the profile so the
/// story still feels personal, and is never empty.
fn fallback_opening(profile: &Profile) -> String {
    format!(
        "안녕하세요! 저는 {}을(를) 좋아하는 친구예요!\n\
         오늘은 {}에 대해 재미있는 모험을 떠나볼 거예요.\n\n\
         어떤 일이 일어날지 궁금하지 않나요?\n\
         함께 모험을 시작해보아요!",
        profile.favorites, profile.learning_subject
    )
}

/// Fixed continuation used when the backend fails: keeps the protagonist
/// and the child's request in the scene.
fn fallback_continuation(character_name: &str, user_input: &str) -> String {
    format!(
        "{character_name}이(가) {user_input}을(를) 보며 신기해했어요!\n\n\
         \"와, 정말 재미있겠다!\" {character_name}이(가) 말했어요.\n\n\
         여러분이라면 {character_name}과(와) 함께 무엇을 하고 싶나요?"
    )
}

/// Pull the expected answer letter out of a generated quiz.
///
/// Looks for the last "정답:" marker; defaults to "A" when the model
/// ignored the requested format.
fn parse_answer_letter(question: &str) -> &'static str {
    if let Some(tail) = question.rsplit("정답:").next() {
        if question.contains("정답:") {
            for c in tail.chars() {
                match c.to_ascii_uppercase() {
                    'A' => return "A",
                    'B' => return "B",
                    'C' => return "C",
                    c if c.is_whitespace() || c == '[' || c == '*' => continue,
                    _ => break,
                }
            }
        }
    }
    "A"
}
