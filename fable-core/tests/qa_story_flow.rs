//! QA tests for story generation, fallbacks, cadence, and the quiz.
//!
//! All generation goes through the scripted mock backend; the narrator's
//! real fallback and cadence logic is what's under test.

use fable_core::session::Stage;
use fable_core::testing::{
    assert_illustrated, assert_not_illustrated, assert_stage, StoryHarness, STUB_PNG,
};

#[tokio::test]
async fn test_start_trigger_opens_illustrated_first_chapter() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text("옛날 옛적에 멍멍이가 살았어요.");
    harness.backend.queue_image(b"png-1".to_vec());

    let reply = harness.start_story().await;

    assert_stage(&harness, Stage::StoryOngoing);
    assert_eq!(harness.current_chapter(), 1);
    // 강아지 favorites map to the dog name.
    assert_eq!(harness.character_name(), Some("멍멍이"));
    assert!(reply.text.contains("멍멍이의 모험이 시작됩니다"));
    assert!(reply.text.contains("옛날 옛적에 멍멍이가 살았어요."));

    // Chapter 1 is always illustrated.
    assert_illustrated(&reply);
    let attachment = reply.attachment.unwrap();
    assert_eq!(attachment.chapter, 1);
    assert_eq!(attachment.png, b"png-1");
    assert!(!attachment.edited);
}

#[tokio::test]
async fn test_non_trigger_input_nudges() {
    let mut harness = StoryHarness::new();
    harness.complete_intake().await;

    let reply = harness.send("안녕하세요").await;
    assert!(reply.text.contains("'동화 시작'"));
    assert_stage(&harness, Stage::ReadyToStart);
    assert_eq!(harness.backend.text_call_count(), 0);
}

#[tokio::test]
async fn test_default_character_name_without_animal_keyword() {
    let mut harness = StoryHarness::new();
    harness.send("숫자").await;
    harness.send("6살이고 호기심이 많아요").await;
    harness.send("자동차와 로봇").await;
    harness.send("동화 시작").await;

    assert_eq!(harness.character_name(), Some("꼬마"));
}

#[tokio::test]
async fn test_illustration_cadence_over_chapters() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;

    // Chapter 2: no illustration, no image call.
    let calls_before = harness.backend.illustration_call_count();
    let reply = harness.send("바다에 가요").await;
    assert_eq!(harness.current_chapter(), 2);
    assert_not_illustrated(&reply);
    assert_eq!(harness.backend.illustration_call_count(), calls_before);

    // Chapter 3: illustrated.
    let reply = harness.send("물고기를 세요").await;
    assert_eq!(harness.current_chapter(), 3);
    assert_illustrated(&reply);
    assert_eq!(reply.attachment.unwrap().chapter, 3);

    // Chapters 4 and 5: not illustrated; chapter 6: illustrated.
    assert_not_illustrated(&harness.send("계속").await);
    assert_not_illustrated(&harness.send("계속").await);
    assert_illustrated(&harness.send("계속").await);
}

#[tokio::test]
async fn test_opening_failure_uses_profile_fallback() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text_failure();

    let reply = harness.start_story().await;

    // Fallback embeds the profile fields and the turn still lands.
    assert!(reply.text.contains("숫자"));
    assert!(reply.text.contains("강아지와 파란색"));
    assert_eq!(harness.current_chapter(), 1);
    assert_stage(&harness, Stage::StoryOngoing);
    // The opening is still illustrated even when the text fell back.
    assert_illustrated(&reply);
}

#[tokio::test]
async fn test_continuation_failure_uses_character_fallback() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;

    harness.backend.queue_text_failure();
    let reply = harness.send("무지개 다리를 건너요").await;

    assert!(reply.text.contains("멍멍이"));
    assert!(reply.text.contains("무지개 다리를 건너요"));
    assert_eq!(harness.current_chapter(), 2);
    assert_stage(&harness, Stage::StoryOngoing);
}

#[tokio::test]
async fn test_illustration_failure_never_halts_the_turn() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text("첫 장면이에요.");
    harness.backend.queue_illustration_failure();

    let reply = harness.start_story().await;

    assert_not_illustrated(&reply);
    assert!(reply.text.contains("첫 장면이에요."));
    assert_eq!(harness.current_chapter(), 1);
}

#[tokio::test]
async fn test_degraded_illustration_is_inlined() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text("첫 장면이에요.");
    harness
        .backend
        .queue_description("🎨 파란 하늘 아래 강아지를 상상해보세요!");

    let reply = harness.start_story().await;

    assert_not_illustrated(&reply);
    assert!(reply.text.contains("🎨 파란 하늘 아래 강아지를 상상해보세요!"));
}

#[tokio::test]
async fn test_continuation_prompt_carries_context() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text("멍멍이가 숲으로 갔어요.");
    harness.start_story().await;

    harness.send("친구를 만나요").await;

    let prompts = harness.backend.text_prompts();
    let continuation_prompt = prompts.last().unwrap();
    // Prior chapter content, the character block, and the new request all
    // reach the backend.
    assert!(continuation_prompt.contains("멍멍이가 숲으로 갔어요."));
    assert!(continuation_prompt.contains("주인공: 멍멍이"));
    assert!(continuation_prompt.contains("학습 주제: 숫자"));
    assert!(continuation_prompt.contains("사용자 요청: 친구를 만나요"));
}

#[tokio::test]
async fn test_ongoing_reply_presentation() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;

    let reply = harness.send("친구를 만나고 싶어요").await;

    assert!(reply.text.contains("멍멍이의 모험 - 챕터 2"));
    // Social-interaction intent: banner and matching suggestions.
    assert!(reply.text.contains("친구 만들기"));
    assert!(reply.text.contains("👫 친구와 함께 놀게 해주세요"));
    assert!(reply.text.contains("진행도"));
    assert!(reply.text.contains("🟢🟢⚪⚪⚪"));
}

#[tokio::test]
async fn test_generic_suggestions_for_plain_continuation() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;

    let reply = harness.send("그 다음은?").await;
    assert!(reply.text.contains("💡 새로운 친구를 만나게 해주세요"));
}

#[tokio::test]
async fn test_long_session_keeps_origin_chapter() {
    let mut harness = StoryHarness::new();
    harness.backend.queue_text("모험의 시작이에요.");
    harness.start_story().await;

    for i in 0..12 {
        harness.send(&format!("다음 {i}")).await;
    }

    let narrator = harness.session.narrator().unwrap();
    assert_eq!(narrator.log().current_chapter(), 13);
    assert_eq!(narrator.log().len(), 9);
    // The opening survives every trim.
    let origin = narrator.log().origin().unwrap();
    assert_eq!(origin.chapter, 1);
    assert_eq!(origin.content, "모험의 시작이에요.");
}

#[tokio::test]
async fn test_image_edit_flow() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;
    harness.backend.queue_image(b"edited-png".to_vec());

    let reply = harness.send("이미지 편집: 배경을 밤하늘로 바꿔주세요").await;

    assert!(reply.text.contains("이미지가 편집되었습니다"));
    assert!(reply.text.contains("배경을 밤하늘로 바꿔주세요"));
    let attachment = reply.attachment.unwrap();
    assert!(attachment.edited);
    assert_eq!(attachment.chapter, 1);
    // Editing regenerates an image without adding a chapter.
    assert_eq!(harness.current_chapter(), 1);
}

#[tokio::test]
async fn test_image_edit_failure_is_friendly() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;
    harness.backend.queue_illustration_failure();

    let reply = harness.send("편집: 더 밝게").await;
    assert!(reply.text.contains("이미지 편집에 실패했습니다"));
    assert_eq!(harness.current_chapter(), 1);
}

#[tokio::test]
async fn test_quiz_pose_and_answer() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;
    harness
        .backend
        .queue_text("문제: 1 더하기 1은?\nA) 1\nB) 2\nC) 3\n정답: B");

    let reply = harness.send("퀴즈 내줘").await;
    assert!(reply.text.contains("1 더하기 1은?"));
    assert!(reply.text.contains("A, B, C 중에"));
    assert!(harness.session.narrator().unwrap().has_pending_question());

    // Case-insensitive, trimmed answer check.
    let reply = harness.send("  b  ").await;
    assert!(reply.text.contains("정답이에요"));
    assert!(!harness.session.narrator().unwrap().has_pending_question());

    // The question is consumed; the same letter now reads as story input.
    let reply = harness.send("b").await;
    assert!(reply.text.contains("챕터 2"));
}

#[tokio::test]
async fn test_quiz_wrong_answer() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;
    harness
        .backend
        .queue_text("문제: 하늘 색은?\nA) 파랑\nB) 빨강\nC) 초록\n정답: A");

    harness.send("퀴즈").await;
    let reply = harness.send("C").await;
    assert!(reply.text.contains("아쉬워요"));
}

#[tokio::test]
async fn test_quiz_generation_failure_is_friendly() {
    let mut harness = StoryHarness::new();
    harness.start_story().await;
    harness.backend.queue_text_failure();

    let reply = harness.send("퀴즈 내줘").await;
    assert!(reply.text.contains("문제를 만드는 중 오류가 발생했어요"));
    assert_stage(&harness, Stage::StoryOngoing);
}

#[tokio::test]
async fn test_stub_image_round_trip() {
    let mut harness = StoryHarness::new();
    let reply = harness.start_story().await;
    assert_eq!(reply.attachment.unwrap().png, STUB_PNG);
}
