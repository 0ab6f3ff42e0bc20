//! StorySession - the primary public API for one conversation.
//!
//! Wraps the profile intake and the narrator behind a single
//! message-handling entry point. One session is owned by one chat
//! conversation; the host feeds it messages sequentially and renders the
//! replies. Every path through [`StorySession::handle_message`] produces
//! user-visible text; no backend failure crosses this boundary.

use crate::narrator::{Illustration, Narrator, StoryBackend, StoryTurn};
use crate::profile::{IntakeOutcome, IntakeStage, ProfileCollector, DEFAULT_MAX_ATTEMPTS};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Commands recognized at every stage, matched exactly (case-insensitive).
const HELP_COMMANDS: &[&str] = &["도움말", "help", "도움", "헬프"];
const RESTART_COMMANDS: &[&str] = &["처음부터", "다시시작", "restart", "새로시작"];
const BACK_COMMANDS: &[&str] = &["이전단계", "뒤로", "back", "이전"];

/// Trigger phrases, matched by containment.
const START_KEYWORDS: &[&str] = &["동화", "시작", "만들어", "스토리"];
const EDIT_KEYWORDS: &[&str] = &["이미지 편집", "편집"];
const QUIZ_KEYWORDS: &[&str] = &["퀴즈", "quiz", "문제 내", "문제 풀"];

/// Where the conversation is.
///
/// A typed stage makes the source's "unexpected state" branch
/// unrepresentable; its recovery suggestions survive in the help menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Collecting one of the three profile answers.
    Intake(IntakeStage),
    /// Profile complete, waiting for the start trigger.
    ReadyToStart,
    /// Chapters are being generated.
    StoryOngoing,
}

/// Configuration for a story session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Rejected answers tolerated before a stage defaults.
    pub max_attempts: u32,
}

impl StoryConfig {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// An image attachment paired with a reply.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Chapter the image belongs to; determines the storage filename.
    pub chapter: u32,
    /// PNG bytes from the image backend.
    pub png: Vec<u8>,
    /// True when this replaces an earlier image for the same chapter.
    pub edited: bool,
}

/// One response to the user.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }
}

/// A storytelling conversation session.
pub struct StorySession {
    id: Uuid,
    backend: Arc<dyn StoryBackend>,
    config: StoryConfig,
    collector: ProfileCollector,
    narrator: Option<Narrator>,
}

impl StorySession {
    /// Create a new session at the first intake question.
    pub fn new(backend: Arc<dyn StoryBackend>) -> Self {
        Self::with_config(backend, StoryConfig::new())
    }

    pub fn with_config(backend: Arc<dyn StoryBackend>, config: StoryConfig) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "session created");
        Self {
            id,
            backend,
            collector: ProfileCollector::with_max_attempts(config.max_attempts),
            config,
            narrator: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current conversation stage, derived from session state.
    pub fn stage(&self) -> Stage {
        if self.narrator.is_some() {
            Stage::StoryOngoing
        } else if let Some(stage) = self.collector.current_stage() {
            Stage::Intake(stage)
        } else {
            Stage::ReadyToStart
        }
    }

    /// The narrator, once the story has started.
    pub fn narrator(&self) -> Option<&Narrator> {
        self.narrator.as_ref()
    }

    /// The greeting shown when a conversation opens.
    pub fn welcome_message(&self) -> String {
        format!(
            "🍌 **동화 나노바나나에 오신 것을 환영합니다!** 📚✨\n\n\
             저는 여러분만의 특별한 동화책을 만들어드리는 AI 도우미입니다.\n\n\
             📝 **3단계로 여러분만의 동화를 만들어요:**\n\
             ┌─ **1단계**: 학습하고 싶은 주제 ➜\n\
             ├─ **2단계**: 여러분 소개 ➜\n\
             └─ **3단계**: 좋아하는 것들 ➜ 🎉 동화 완성!\n\n\
             **1단계 시작! {}**\n\
             💡 추천: {}",
            IntakeStage::Subject.question(),
            IntakeStage::Subject.examples()
        )
    }

    /// Handle one inbound message and produce the reply.
    ///
    /// Infallible by design: validation failures, backend failures, and
    /// unexpected inputs all end in a user-visible message.
    pub async fn handle_message(&mut self, input: &str) -> Reply {
        let input = input.trim();

        // Global commands win over stage handling.
        if is_command(input, HELP_COMMANDS) {
            return Reply::text(self.help_menu());
        }
        if is_command(input, RESTART_COMMANDS) {
            return self.restart();
        }
        if is_command(input, BACK_COMMANDS) {
            return self.step_back();
        }

        match self.stage() {
            Stage::Intake(_) => self.handle_intake(input),
            Stage::ReadyToStart => self.handle_ready(input).await,
            Stage::StoryOngoing => self.handle_ongoing(input).await,
        }
    }

    // ========================================================================
    // Intake
    // ========================================================================

    fn handle_intake(&mut self, input: &str) -> Reply {
        match self.collector.submit(input) {
            IntakeOutcome::Accepted { stage, next } => {
                let mut text = format!(
                    "✅ **{}단계 완료!** {}: {}\n\n",
                    stage.ordinal(),
                    stage.name(),
                    self.collector.answer(stage).unwrap_or_default()
                );
                text.push_str(&self.intake_checklist());
                text.push('\n');
                match next {
                    Some(next) => text.push_str(&Self::stage_question(next)),
                    None => text.push_str(&self.intake_summary()),
                }
                Reply::text(text)
            }
            IntakeOutcome::Rejected {
                stage,
                reason,
                attempt,
                max_attempts,
            } => Reply::text(format!(
                "❌ {reason}\n\n\
                 ({attempt}/{max_attempts}번째 시도)\n\
                 **다시 한번, {}**\n\
                 💡 예시: {}",
                stage.question(),
                stage.examples()
            )),
            IntakeOutcome::Defaulted {
                stage,
                reason,
                value,
                next,
            } => {
                let mut text = format!(
                    "❌ {reason}\n\n\
                     입력 시도 횟수를 초과했습니다. 기본값으로 '{value}'(으)로 설정하겠습니다.\n\n"
                );
                match next {
                    Some(next) => text.push_str(&Self::stage_question(next)),
                    None => {
                        text.push_str("🎉 **정보 수집이 완료되었습니다!**\n\n");
                        text.push_str(&self.intake_summary());
                    }
                }
                Reply::text(text)
            }
        }
    }

    fn stage_question(stage: IntakeStage) -> String {
        format!(
            "**{}단계: {}**\n💡 예시: {}",
            stage.ordinal(),
            stage.question(),
            stage.examples()
        )
    }

    /// Progress tree shown after each accepted answer.
    fn intake_checklist(&self) -> String {
        let current = self.collector.current_stage();
        let mut lines = Vec::with_capacity(3);
        for stage in IntakeStage::all() {
            let connector = match stage {
                IntakeStage::Subject => "┌─",
                IntakeStage::Description => "├─",
                IntakeStage::Favorites => "└─",
            };
            let marker = if self.collector.answer(*stage).is_some() {
                "✅"
            } else if current == Some(*stage) {
                "⏳"
            } else {
                "⚪"
            };
            let here = if current == Some(*stage) {
                " ← 지금 여기!"
            } else {
                ""
            };
            lines.push(format!(
                "{connector} {marker} **{}단계**: {}{here}",
                stage.ordinal(),
                stage.name()
            ));
        }
        lines.join("\n") + "\n"
    }

    /// Recap of the collected answers plus the start instructions.
    fn intake_summary(&self) -> String {
        format!(
            "📋 **여러분의 동화 재료**:\n\
             🎯 **학습 주제**: {}\n\
             👤 **주인공 특성**: {}\n\
             💝 **특별 요소**: {}\n\n\
             🪄 **이제 마법이 시작됩니다!**\n\
             여러분만을 위한 특별한 동화를 만들어보겠습니다! 🍌📚\n\n\
             🚀 **'동화 시작'**이라고 말하면 모험이 시작됩니다!",
            self.collector.answer(IntakeStage::Subject).unwrap_or("-"),
            self.collector
                .answer(IntakeStage::Description)
                .unwrap_or("-"),
            self.collector.answer(IntakeStage::Favorites).unwrap_or("-"),
        )
    }

    // ========================================================================
    // Story
    // ========================================================================

    async fn handle_ready(&mut self, input: &str) -> Reply {
        let lowered = input.to_lowercase();
        if !START_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Reply::text(
                "**'동화 시작'**이라고 말씀해주시면 여러분만의 동화가 시작됩니다! 🍌",
            );
        }

        // Unreachable while stage() is derived from this state, but a state
        // mismatch must end in a recovery message, not a panic.
        let Some(profile) = self.collector.profile() else {
            warn!(session = %self.id, "ready stage without a complete profile");
            return self.lost_reply();
        };
        let mut narrator = Narrator::new(Arc::clone(&self.backend), profile);
        let turn = narrator.open_story().await;
        info!(session = %self.id, chapter = turn.chapter, fallback = turn.fallback, "story opened");

        let mut text = format!("📖 **{}의 모험이 시작됩니다!**\n\n", narrator.character_name());
        let attachment = Self::render_illustration(&turn, &mut text);
        text.push_str(&turn.text);
        text.push_str(
            "\n\n**다음에 어떤 일이 일어났으면 좋겠나요?**\n\
             자유롭게 말해보세요! 여러분의 아이디어로 이야기가 계속됩니다! 🌟",
        );

        self.narrator = Some(narrator);
        Reply { text, attachment }
    }

    async fn handle_ongoing(&mut self, input: &str) -> Reply {
        let lowered = input.to_lowercase();

        if EDIT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return self.handle_image_edit(input).await;
        }

        let Some(narrator) = self.narrator.as_mut() else {
            warn!(session = %self.id, "ongoing stage without a narrator");
            return self.lost_reply();
        };

        // Quiz sub-feature: a pending question consumes single-letter
        // answers; a quiz request poses one.
        if is_answer_letter(input) {
            if let Some(correct) = narrator.answer_question(input) {
                return Reply::text(if correct {
                    "🎉 **정답이에요!** 정말 잘했어요! 이야기를 계속 이어가볼까요?"
                } else {
                    "아쉬워요! 다음엔 맞힐 수 있을 거예요. 이야기를 계속 이어가볼까요?"
                });
            }
        }
        if QUIZ_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return match narrator.pose_question().await {
                Ok(question) => Reply::text(format!(
                    "{question}\n\nA, B, C 중에 하나로 답해보세요!"
                )),
                Err(error) => {
                    warn!(session = %self.id, %error, "quiz generation failed");
                    Reply::text("문제를 만드는 중 오류가 발생했어요. 이야기를 계속 이어가볼까요?")
                }
            };
        }

        let turn = narrator.continue_story(input).await;
        info!(
            session = %self.id,
            chapter = turn.chapter,
            intent = turn.intent.map(|i| i.name()).unwrap_or("none"),
            fallback = turn.fallback,
            "chapter continued"
        );

        let mut text = format!(
            "📖 **{}의 모험 - 챕터 {}**\n\n",
            narrator.character_name(),
            turn.chapter
        );
        let attachment = Self::render_illustration(&turn, &mut text);
        text.push_str(&turn.text);
        text.push_str("\n\n");

        if let Some(banner) = turn.intent.and_then(|intent| intent.banner()) {
            text.push_str(banner);
            text.push_str("\n\n");
        }

        text.push_str(&format!("📊 **{}**\n\n", narrator.progress_gauge()));
        text.push_str("**또 어떤 일이 일어났으면 좋겠나요?**\n");
        let suggestions = turn
            .intent
            .unwrap_or(crate::narrator::Intent::Continuation)
            .suggestions();
        text.push_str(&format!("💡 **제안**: {}\n\n", suggestions.join(" | ")));
        text.push_str("🌟 자유롭게 여러분의 아이디어를 말해주세요!");

        Reply { text, attachment }
    }

    async fn handle_image_edit(&mut self, input: &str) -> Reply {
        let Some(narrator) = self.narrator.as_mut() else {
            warn!(session = %self.id, "image edit without a narrator");
            return self.lost_reply();
        };
        let edit_request = input
            .replace("이미지 편집:", "")
            .replace("이미지 편집", "")
            .replace("편집:", "")
            .trim()
            .to_string();

        match narrator.edit_illustration(&edit_request).await {
            Ok((chapter, Illustration::Image(png))) => Reply {
                text: format!(
                    "✨ **이미지가 편집되었습니다!**\n\n\
                     편집 내용: {edit_request}\n\n\
                     계속해서 이야기를 이어가거나 추가 편집을 요청해주세요!"
                ),
                attachment: Some(Attachment {
                    chapter,
                    png,
                    edited: true,
                }),
            },
            Ok((_, Illustration::Description(description))) => Reply::text(format!(
                "{description}\n\n계속해서 이야기를 이어가거나 다시 편집을 요청해주세요!"
            )),
            Err(error) => {
                warn!(session = %self.id, %error, "image edit failed");
                Reply::text("이미지 편집에 실패했습니다. 다시 시도해주세요.")
            }
        }
    }

    /// Split a turn's illustration into an attachment (binary image) or an
    /// inline scene description, mirroring how the chat surface shows them.
    fn render_illustration(turn: &StoryTurn, text: &mut String) -> Option<Attachment> {
        match &turn.illustration {
            Some(Illustration::Image(png)) => Some(Attachment {
                chapter: turn.chapter,
                png: png.clone(),
                edited: false,
            }),
            Some(Illustration::Description(description)) => {
                text.push_str(description);
                text.push_str("\n\n");
                None
            }
            None => None,
        }
    }

    /// Reply used when session state does not match the dispatched stage.
    fn lost_reply(&self) -> Reply {
        let mut text = String::from(
            "😅 **잠깐, 어디에 있는지 모르겠어요!**\n\n\
             무언가 예상하지 못한 일이 일어난 것 같아요.\n\n\
             **해결 방법:**\n",
        );
        for suggestion in recovery_suggestions(self.stage()) {
            text.push_str(&format!("• {suggestion}\n"));
        }
        text.push_str("\n💬 또는 '도움말'을 입력해보세요!");
        Reply::text(text)
    }

    // ========================================================================
    // Global commands
    // ========================================================================

    fn restart(&mut self) -> Reply {
        info!(session = %self.id, "session restarted");
        self.collector = ProfileCollector::with_max_attempts(self.config.max_attempts);
        self.narrator = None;
        Reply::text(format!(
            "🔄 **처음부터 다시 시작합니다!**\n\n\
             🍌 **동화 나노바나나에 다시 오신 것을 환영합니다!**\n\n\
             **1단계 시작! {}**\n\
             💡 추천: {}",
            IntakeStage::Subject.question(),
            IntakeStage::Subject.examples()
        ))
    }

    fn step_back(&mut self) -> Reply {
        if let Stage::Intake(_) = self.stage() {
            if let Some(stage) = self.collector.step_back() {
                return Reply::text(format!(
                    "⬅️ **{}단계로 돌아갑니다.**\n\n{}",
                    stage.ordinal(),
                    Self::stage_question(stage)
                ));
            }
        }
        Reply::text("⚠️ 더 이상 뒤로 갈 수 없어요. '처음부터'를 입력하면 다시 시작할 수 있어요.")
    }

    fn help_menu(&self) -> String {
        let mut text = String::from(
            "🆘 **동화 나노바나나 도움말**\n\n\
             **🚀 다시 시작하기:**\n\
             • '처음부터' - 모든 것을 처음부터 다시 시작\n\
             • '이전 단계' - 바로 전 단계로 돌아가기\n\n\
             **💡 이야기 진행 팁:**\n\
             • 간단하고 명확하게 말해보세요\n\
             • '친구를 만났어요', '숲에 갔어요' 같은 표현\n\
             • 궁금한 것이나 하고 싶은 것을 자유롭게 말해보세요\n\n\
             **🎨 이미지 관련:**\n\
             • 첫 번째 장과 3장마다 특별한 그림이 나와요\n\
             • 이미지가 안 나와도 이야기는 계속돼요\n\n\
             **❓ 기타:**\n\
             • '도움말' - 이 메뉴를 다시 볼 수 있어요\n\
             • 언제든 자유롭게 대화해보세요!\n\n\
             **🧭 지금 단계에서 막혔다면:**\n",
        );
        for suggestion in recovery_suggestions(self.stage()) {
            text.push_str(&format!("• {suggestion}\n"));
        }
        text
    }
}

/// Per-stage recovery suggestions, surfaced through the help menu.
pub fn recovery_suggestions(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Intake(IntakeStage::Subject) => &[
            "🔄 '처음부터'라고 말하면 다시 시작할 수 있어요",
            "💭 '숫자', '색깔', '동물' 같은 간단한 주제를 시도해보세요",
        ],
        Stage::Intake(IntakeStage::Description) => &[
            "🔄 '이전 단계'라고 말하면 학습 주제부터 다시 시작해요",
            "💭 '6살', '활발함', '책 좋아함' 같이 간단히 말해보세요",
        ],
        Stage::Intake(IntakeStage::Favorites) => &[
            "🔄 '이전 단계'라고 말하면 자기소개부터 다시 시작해요",
            "💭 '강아지', '파란색', '자동차' 같이 좋아하는 것을 말해보세요",
        ],
        Stage::ReadyToStart => &[
            "🚀 '동화 시작'이라고 말하면 모험이 시작돼요",
            "🔄 '처음부터'라고 말하면 정보를 다시 입력할 수 있어요",
        ],
        Stage::StoryOngoing => &[
            "🔄 '처음부터'라고 말하면 새로운 이야기를 시작해요",
            "💭 간단한 단어나 짧은 문장으로 말해보세요",
            "🎲 '놀라운 일이 일어났어요'라고 말해보세요",
        ],
    }
}

/// Exact command match, case-insensitive and whitespace-tolerant.
fn is_command(input: &str, commands: &[&str]) -> bool {
    let normalized = input.trim().to_lowercase().replace(' ', "");
    commands.iter().any(|c| normalized == *c)
}

/// A single-letter quiz answer.
fn is_answer_letter(input: &str) -> bool {
    matches!(
        input.trim(),
        "A" | "B" | "C" | "a" | "b" | "c"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command("도움말", HELP_COMMANDS));
        assert!(is_command("HELP", HELP_COMMANDS));
        assert!(is_command("  이전 단계  ", BACK_COMMANDS));
        assert!(!is_command("도움말 좀", HELP_COMMANDS));
    }

    #[test]
    fn test_is_answer_letter() {
        assert!(is_answer_letter(" a "));
        assert!(is_answer_letter("B"));
        assert!(!is_answer_letter("D"));
        assert!(!is_answer_letter("AB"));
    }

    #[test]
    fn test_recovery_suggestions_cover_every_stage() {
        for stage in [
            Stage::Intake(IntakeStage::Subject),
            Stage::Intake(IntakeStage::Description),
            Stage::Intake(IntakeStage::Favorites),
            Stage::ReadyToStart,
            Stage::StoryOngoing,
        ] {
            assert!(!recovery_suggestions(stage).is_empty());
        }
    }

    #[test]
    fn test_config_builder() {
        let config = StoryConfig::new().with_max_attempts(5);
        assert_eq!(config.max_attempts, 5);
    }
}
