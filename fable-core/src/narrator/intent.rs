//! Keyword-based intent tagging for continuation requests.
//!
//! The tag steers presentation (suggestions, encouragement lines); the
//! user's words still go to the narrator verbatim.

use serde::{Deserialize, Serialize};

/// What a continuation request seems to be about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    FearConcern,
    PositiveEmotion,
    HelpAction,
    SocialInteraction,
    MovementAdventure,
    LearningFocus,
    /// Nothing matched; continue the story generically.
    Continuation,
}

/// Ordered classification rules. Evaluated top to bottom; the first entry
/// with a matching keyword wins and later entries are not checked. Extend
/// by adding rows, not branches.
const RULES: &[(Intent, &[&str])] = &[
    (Intent::FearConcern, &["무서", "겁", "두려"]),
    (Intent::PositiveEmotion, &["기쁘", "행복", "좋아", "재미"]),
    (Intent::HelpAction, &["도움", "도와", "구해"]),
    (Intent::SocialInteraction, &["만나", "친구", "같이"]),
    (Intent::MovementAdventure, &["가자", "가고", "이동", "떠나"]),
    (Intent::LearningFocus, &["배우", "공부", "알아", "학습"]),
];

/// Classify one user message.
pub fn classify(input: &str) -> Intent {
    let lowered = input.to_lowercase();
    for (intent, keywords) in RULES {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *intent;
        }
    }
    Intent::Continuation
}

impl Intent {
    /// Short identifier for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::FearConcern => "fear_concern",
            Intent::PositiveEmotion => "positive_emotion",
            Intent::HelpAction => "help_action",
            Intent::SocialInteraction => "social_interaction",
            Intent::MovementAdventure => "movement_adventure",
            Intent::LearningFocus => "learning_focus",
            Intent::Continuation => "continuation",
        }
    }

    /// Three follow-up prompts offered to the user. Categories without
    /// their own list share the generic one.
    pub fn suggestions(&self) -> &'static [&'static str; 3] {
        match self {
            Intent::LearningFocus => &[
                "📚 새로운 걸 배우게 해주세요",
                "🧮 문제를 풀어보게 해주세요",
                "🔍 탐험하며 발견하게 해주세요",
            ],
            Intent::SocialInteraction => &[
                "👫 친구와 함께 놀게 해주세요",
                "🤝 누군가를 도와주게 해주세요",
                "🎉 파티나 축제에 가게 해주세요",
            ],
            Intent::MovementAdventure => &[
                "🚀 새로운 곳으로 여행하게 해주세요",
                "🏔️ 산이나 바다에 가게 해주세요",
                "🌈 마법의 문을 통과하게 해주세요",
            ],
            _ => &[
                "💡 새로운 친구를 만나게 해주세요",
                "🌟 신비한 것을 발견하게 해주세요",
                "🎯 문제를 해결하게 해주세요",
            ],
        }
    }

    /// Encouragement line shown with the chapter, when the intent has one.
    pub fn banner(&self) -> Option<&'static str> {
        match self {
            Intent::LearningFocus => {
                Some("📚 **학습 포인트**: 이번 장면에서 새로운 것을 배웠네요!")
            }
            Intent::PositiveEmotion => {
                Some("😊 **기분 좋은 순간**: 즐거운 모험이 계속되고 있어요!")
            }
            Intent::HelpAction => Some("🤝 **도움주기**: 친구를 도와주는 마음이 아름다워요!"),
            Intent::SocialInteraction => {
                Some("👫 **친구 만들기**: 새로운 친구와의 만남이 기대되네요!")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_category() {
        assert_eq!(classify("너무 무서워요"), Intent::FearConcern);
        assert_eq!(classify("정말 행복해요"), Intent::PositiveEmotion);
        assert_eq!(classify("친구를 도와주세요"), Intent::HelpAction);
        assert_eq!(classify("친구를 만나고 싶어요"), Intent::SocialInteraction);
        assert_eq!(classify("바다로 떠나요"), Intent::MovementAdventure);
        assert_eq!(classify("숫자를 배우고 싶어요"), Intent::LearningFocus);
    }

    #[test]
    fn test_default_category() {
        assert_eq!(classify("그 다음엔 어떻게 될까"), Intent::Continuation);
        assert_eq!(classify(""), Intent::Continuation);
    }

    #[test]
    fn test_first_match_wins() {
        // "무서" (fear) outranks "재미" (positive) regardless of word order.
        assert_eq!(classify("재미있지만 무서워요"), Intent::FearConcern);
        // "도와" (help) outranks "친구" (social).
        assert_eq!(classify("친구가 도와줬어요"), Intent::HelpAction);
    }

    #[test]
    fn test_suggestions_fallback() {
        // Categories without their own table share the generic list.
        assert_eq!(
            Intent::FearConcern.suggestions(),
            Intent::Continuation.suggestions()
        );
        assert_ne!(
            Intent::LearningFocus.suggestions(),
            Intent::Continuation.suggestions()
        );
        assert_eq!(Intent::MovementAdventure.suggestions().len(), 3);
    }

    #[test]
    fn test_banners() {
        assert!(Intent::LearningFocus.banner().is_some());
        assert!(Intent::Continuation.banner().is_none());
        assert!(Intent::FearConcern.banner().is_none());
    }
}
