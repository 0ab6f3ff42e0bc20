//! Profile intake for story personalization.
//!
//! Collects the three answers that seed a personalized story (learning
//! subject, a short self-description, favorite things) through a fixed
//! question sequence with per-answer validation and a bounded
//! retry-to-default policy, so intake always terminates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rejected answers before a stage falls back to its
/// built-in value.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Keywords rejected in the learning-subject answer.
const DISALLOWED_SUBJECT_KEYWORDS: &[&str] = &["욕설", "폭력", "성인"];

/// The three intake questions, asked in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeStage {
    /// What the child wants to learn about.
    Subject,
    /// Who the child is (age, personality, traits).
    Description,
    /// Favorite animals, colors, toys, games.
    Favorites,
}

impl IntakeStage {
    pub fn name(&self) -> &'static str {
        match self {
            IntakeStage::Subject => "학습 주제",
            IntakeStage::Description => "여러분 소개",
            IntakeStage::Favorites => "좋아하는 것들",
        }
    }

    /// 1-based position in the intake sequence.
    pub fn ordinal(&self) -> usize {
        match self {
            IntakeStage::Subject => 1,
            IntakeStage::Description => 2,
            IntakeStage::Favorites => 3,
        }
    }

    /// The question shown when this stage becomes active.
    pub fn question(&self) -> &'static str {
        match self {
            IntakeStage::Subject => "어떤 주제를 학습하고 싶으신가요?",
            IntakeStage::Description => "여러분에 대해 소개해주세요",
            IntakeStage::Favorites => "좋아하는 것들을 알려주세요",
        }
    }

    /// Example answers appended to the question.
    pub fn examples(&self) -> &'static str {
        match self {
            IntakeStage::Subject => "숫자, 색깔, 동물, 한글, 영어, 모양 등",
            IntakeStage::Description => "'6살이고 호기심이 많아요', '조용하고 책 읽기를 좋아해요'",
            IntakeStage::Favorites => "'강아지와 파란색', '공주님과 성', '자동차와 로봇'",
        }
    }

    /// Value filled in when the retry budget is exhausted.
    pub fn default_value(&self) -> &'static str {
        match self {
            IntakeStage::Subject => "숫자",
            IntakeStage::Description => "호기심 많은 아이",
            IntakeStage::Favorites => "강아지와 파란색",
        }
    }

    pub fn next(&self) -> Option<IntakeStage> {
        match self {
            IntakeStage::Subject => Some(IntakeStage::Description),
            IntakeStage::Description => Some(IntakeStage::Favorites),
            IntakeStage::Favorites => None,
        }
    }

    pub fn previous(&self) -> Option<IntakeStage> {
        match self {
            IntakeStage::Subject => None,
            IntakeStage::Description => Some(IntakeStage::Subject),
            IntakeStage::Favorites => Some(IntakeStage::Description),
        }
    }

    pub fn all() -> &'static [IntakeStage] {
        &[
            IntakeStage::Subject,
            IntakeStage::Description,
            IntakeStage::Favorites,
        ]
    }
}

/// Why an answer was rejected. Rules are checked in declaration order and
/// the first failing rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("입력이 비어있습니다. 다시 입력해주세요.")]
    Empty,

    #[error("너무 짧습니다. 조금 더 자세히 알려주세요.")]
    TooShort,

    #[error("너무 깁니다. 간단히 요약해서 알려주세요.")]
    TooLong,

    #[error("적절하지 않은 내용입니다. 학습에 도움이 되는 주제를 입력해주세요.")]
    Inappropriate,
}

/// Validate one answer against the rules for the given stage.
///
/// Length limits count characters, not bytes; Korean answers routinely
/// exceed 100 bytes well before 100 characters.
pub fn validate(input: &str, stage: IntakeStage) -> Result<(), ValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let len = trimmed.chars().count();
    if len < 2 {
        return Err(ValidationError::TooShort);
    }
    if len > 100 {
        return Err(ValidationError::TooLong);
    }

    if stage == IntakeStage::Subject {
        let lowered = trimmed.to_lowercase();
        if DISALLOWED_SUBJECT_KEYWORDS
            .iter()
            .any(|word| lowered.contains(word))
        {
            return Err(ValidationError::Inappropriate);
        }
    }

    Ok(())
}

/// A completed user profile. Immutable once all three fields are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// What the story should teach.
    pub learning_subject: String,
    /// How the child described themselves.
    pub description: String,
    /// Favorite things, woven into characters and scenery.
    pub favorites: String,
}

/// What the collector did with one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Answer accepted and stored; `next` is `None` when intake finished.
    Accepted {
        stage: IntakeStage,
        next: Option<IntakeStage>,
    },
    /// Answer rejected; intake stays on the same stage.
    Rejected {
        stage: IntakeStage,
        reason: ValidationError,
        attempt: u32,
        max_attempts: u32,
    },
    /// Retry budget exhausted; the stage default was filled in and intake
    /// force-advanced.
    Defaulted {
        stage: IntakeStage,
        reason: ValidationError,
        value: &'static str,
        next: Option<IntakeStage>,
    },
}

/// Collects the user profile through the fixed question sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCollector {
    /// `None` once all three answers are in.
    stage: Option<IntakeStage>,
    learning_subject: Option<String>,
    description: Option<String>,
    favorites: Option<String>,
    /// Failed attempts since the last accepted or defaulted answer. Shared
    /// across stages; only reset on success.
    attempts: u32,
    max_attempts: u32,
}

impl ProfileCollector {
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            stage: Some(IntakeStage::Subject),
            learning_subject: None,
            description: None,
            favorites: None,
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The stage currently awaiting an answer, or `None` when complete.
    pub fn current_stage(&self) -> Option<IntakeStage> {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_none()
    }

    /// Failed attempts on the current stage run.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Submit one answer for the current stage.
    ///
    /// Callers should check [`ProfileCollector::is_complete`] afterwards and
    /// take the finished [`Profile`].
    pub fn submit(&mut self, input: &str) -> IntakeOutcome {
        let stage = match self.stage {
            Some(stage) => stage,
            // A completed collector accepts nothing further.
            None => {
                return IntakeOutcome::Rejected {
                    stage: IntakeStage::Favorites,
                    reason: ValidationError::Empty,
                    attempt: self.attempts,
                    max_attempts: self.max_attempts,
                }
            }
        };

        match validate(input, stage) {
            Ok(()) => {
                self.store(stage, input.trim().to_string());
                self.attempts = 0;
                self.stage = stage.next();
                IntakeOutcome::Accepted {
                    stage,
                    next: self.stage,
                }
            }
            Err(reason) => {
                self.attempts += 1;
                if self.attempts >= self.max_attempts {
                    let value = stage.default_value();
                    self.store(stage, value.to_string());
                    self.attempts = 0;
                    self.stage = stage.next();
                    IntakeOutcome::Defaulted {
                        stage,
                        reason,
                        value,
                        next: self.stage,
                    }
                } else {
                    IntakeOutcome::Rejected {
                        stage,
                        reason,
                        attempt: self.attempts,
                        max_attempts: self.max_attempts,
                    }
                }
            }
        }
    }

    /// Return to the previous stage, clearing its stored answer.
    ///
    /// Returns the stage now awaiting an answer, or `None` when on the
    /// first question or already complete.
    pub fn step_back(&mut self) -> Option<IntakeStage> {
        let previous = self.stage?.previous()?;
        self.clear(previous);
        self.attempts = 0;
        self.stage = Some(previous);
        Some(previous)
    }

    /// The finished profile, available once intake is complete.
    pub fn profile(&self) -> Option<Profile> {
        match (&self.learning_subject, &self.description, &self.favorites) {
            (Some(subject), Some(description), Some(favorites)) => Some(Profile {
                learning_subject: subject.clone(),
                description: description.clone(),
                favorites: favorites.clone(),
            }),
            _ => None,
        }
    }

    /// Answers collected so far, for the intake summary.
    pub fn answer(&self, stage: IntakeStage) -> Option<&str> {
        match stage {
            IntakeStage::Subject => self.learning_subject.as_deref(),
            IntakeStage::Description => self.description.as_deref(),
            IntakeStage::Favorites => self.favorites.as_deref(),
        }
    }

    fn store(&mut self, stage: IntakeStage, value: String) {
        match stage {
            IntakeStage::Subject => self.learning_subject = Some(value),
            IntakeStage::Description => self.description = Some(value),
            IntakeStage::Favorites => self.favorites = Some(value),
        }
    }

    fn clear(&mut self, stage: IntakeStage) {
        match stage {
            IntakeStage::Subject => self.learning_subject = None,
            IntakeStage::Description => self.description = None,
            IntakeStage::Favorites => self.favorites = None,
        }
    }
}

impl Default for ProfileCollector {
    fn default() -> Self {
        Self::new()
    }
}
