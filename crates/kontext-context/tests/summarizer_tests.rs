// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summarization engine against a scripted transport.

use kontext_context::{
    SUMMARY_HEADER, SummaryTarget, auto_summarize, draft_summary, estimate, estimate_for_messages,
};
use kontext_core::{KontextError, MessageKind, Role, SummaryStyle, models};
use kontext_test_utils::MockTransport;
use kontext_test_utils::fixtures::{alternating_messages, heavy_messages};
use secrecy::SecretString;

fn key() -> SecretString {
    SecretString::from("sk-test-key".to_string())
}

fn target(credential: &SecretString) -> SummaryTarget<'_> {
    SummaryTarget {
        model: models::lookup("gpt-4").unwrap(),
        credential,
    }
}

#[tokio::test]
async fn folds_prefix_and_keeps_suffix_in_order() {
    let transport = MockTransport::with_replies(["The user asked ten questions."]);
    let messages = alternating_messages(15);
    let credential = key();

    let outcome = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        10,
        SummaryStyle::Concise,
    )
    .await
    .unwrap();

    assert_eq!(outcome.summarized_count, 5);
    assert_eq!(outcome.messages.len(), 11);
    assert_eq!(&outcome.messages[1..], &messages[5..]);
    assert_eq!(
        outcome.summarized_ids,
        messages[..5].iter().map(|m| m.id.clone()).collect::<Vec<_>>()
    );

    // Only the first five messages reach the transport.
    let requests = transport.requests().await;
    assert_eq!(requests.len(), 1);
    let transcript = &requests[0].messages[1].content;
    for m in &messages[..5] {
        assert!(transcript.contains(&m.content));
    }
    for m in &messages[5..] {
        assert!(!transcript.contains(&m.content));
    }
    assert_eq!(requests[0].credential, "sk-test-key");
    assert_eq!(requests[0].max_output_tokens, 2000);
}

#[tokio::test]
async fn summary_message_is_tagged() {
    let transport = MockTransport::with_replies(["short digest"]);
    let messages = alternating_messages(4);
    let credential = key();

    let outcome = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        2,
        SummaryStyle::Research,
    )
    .await
    .unwrap();

    let summary = &outcome.messages[0];
    assert_eq!(summary.role, Role::System);
    assert_eq!(summary.content, format!("{SUMMARY_HEADER}short digest"));
    assert!(summary.is_auto_summary());
    let meta = summary.metadata.as_ref().unwrap();
    assert_eq!(meta.kind, Some(MessageKind::AutoSummary));
    assert_eq!(meta.original_message_count, Some(2));
    assert_eq!(meta.summary_style, Some(SummaryStyle::Research));
    assert_eq!(meta.tokens, Some(estimate("short digest")));
    assert_eq!(outcome.summary, "short digest");
}

#[tokio::test]
async fn token_accounting_matches_new_history() {
    let transport = MockTransport::with_replies(["digest"]);
    let messages = heavy_messages(12, 100);
    let credential = key();

    let outcome = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        4,
        SummaryStyle::Structured,
    )
    .await
    .unwrap();

    assert_eq!(outcome.tokens_saved, 800 - i64::from(estimate("digest")));
    assert_eq!(
        outcome.new_token_total,
        estimate_for_messages(&outcome.messages)
    );
    assert_eq!(
        i64::from(estimate_for_messages(&messages)) - outcome.tokens_saved,
        i64::from(outcome.new_token_total)
    );
}

#[tokio::test]
async fn verbose_summary_reports_negative_savings() {
    let verbose = "word ".repeat(500);
    let transport = MockTransport::with_replies([verbose]);
    let messages = alternating_messages(3);
    let credential = key();

    let outcome = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        1,
        SummaryStyle::Narrative,
    )
    .await
    .unwrap();
    assert!(outcome.tokens_saved < 0);
}

#[tokio::test]
async fn insufficient_history_never_calls_transport() {
    let transport = MockTransport::new();
    let messages = alternating_messages(10);
    let credential = key();

    let err = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        10,
        SummaryStyle::Concise,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, KontextError::InsufficientHistory { .. }));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn transport_failure_becomes_summarization_failure() {
    let transport = MockTransport::new();
    transport.push_failure("Rate limit reached", 429).await;
    let messages = alternating_messages(12);
    let credential = key();

    let err = auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        10,
        SummaryStyle::Concise,
    )
    .await
    .unwrap_err();

    match err {
        KontextError::SummarizationFailed { message, source } => {
            assert_eq!(message, "Rate limit reached");
            assert!(source.is_some());
        }
        other => panic!("expected SummarizationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn draft_appends_summary_prompt_to_full_history() {
    let transport = MockTransport::with_replies(["draft text"]);
    let messages = alternating_messages(3);
    let credential = key();

    let draft = draft_summary(&transport, &target(&credential), &messages, 0.3, 512)
        .await
        .unwrap();
    assert_eq!(draft, "draft text");

    let requests = transport.requests().await;
    assert_eq!(requests[0].messages.len(), 4);
    assert_eq!(requests[0].messages[..3], messages[..]);
    assert!(requests[0].messages[3].content.starts_with("Please provide a concise summary"));
    assert_eq!(requests[0].temperature, 0.3);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn summarization_is_logged() {
    let transport = MockTransport::with_replies(["digest"]);
    let messages = alternating_messages(6);
    let credential = key();

    auto_summarize(
        &transport,
        &target(&credential),
        &messages,
        2,
        SummaryStyle::Concise,
    )
    .await
    .unwrap();

    assert!(logs_contain("history summarized"));
    assert!(!logs_contain("sk-test-key"));
}
