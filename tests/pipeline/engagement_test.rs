//! End-to-end engagement scenarios over in-memory stores.

use std::sync::Arc;

use tarpit::evidence::{EvidenceError, EvidenceRecorder, MemoryEvidenceRecorder};
use tarpit::pipeline::{Honeypot, StorageFailure, PROMPT_FOR_INPUT};
use tarpit::responder::{DecodingParams, ResponseGenerator, FALLBACK_REPLY};
use tarpit::store::memory::MemoryConversationStore;
use tarpit::store::ConversationStore;
use tarpit::triage::{Persona, RiskLevel, ScamCategory};

use crate::support::{
    honeypot, BrokenRecorder, BrokenStore, DownProvider, RecordingProvider,
};

#[tokio::test]
async fn phishing_with_urgency_panics_the_bank_customer() {
    let provider = RecordingProvider::new("Which account is this about?");
    let (honeypot, store, evidence) = honeypot(provider);

    let engagement = honeypot
        .handle(
            "scammer-1",
            "Your account will be BLOCKED in 24 hours, click http://verify-bank.xyz now",
        )
        .await;

    let verdict = engagement.verdict.expect("verdict");
    assert_eq!(verdict.category, ScamCategory::Phishing);
    assert_eq!(verdict.risk, RiskLevel::High);
    assert_eq!(verdict.persona, Persona::PanickedBankCustomer);
    assert_eq!(engagement.reply, "Which account is this about?");
    assert!(!engagement.degraded);
    assert!(engagement.storage_failures.is_empty());

    assert_eq!(store.len().await, 1);
    assert!(evidence.export().await.is_ok());
}

#[tokio::test]
async fn lottery_bait_gets_the_excited_winner() {
    let provider = RecordingProvider::new("Really? How do I claim it?");
    let (honeypot, _, _) = honeypot(provider);

    let engagement = honeypot
        .handle(
            "scammer-2",
            "Congratulations! You have WON the lottery jackpot, pay a small processing fee to claim",
        )
        .await;

    let verdict = engagement.verdict.expect("verdict");
    assert_eq!(verdict.category, ScamCategory::Lottery);
    assert_eq!(verdict.risk, RiskLevel::Low);
    assert_eq!(verdict.persona, Persona::ExcitedLotteryWinner);
}

#[tokio::test]
async fn blank_message_prompts_without_side_effects() {
    let provider = RecordingProvider::new("unused");
    let (honeypot, store, evidence) = honeypot(Arc::clone(&provider) as _);

    for message in ["", "   ", "\n\t"] {
        let engagement = honeypot.handle("scammer-3", message).await;
        assert_eq!(engagement.reply, PROMPT_FOR_INPUT);
        assert!(engagement.verdict.is_none());
    }

    assert!(store.is_empty().await);
    assert!(matches!(evidence.export().await, Err(EvidenceError::NotFound)));
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn backend_outage_still_records_the_turn() {
    let (honeypot, store, evidence) = honeypot(Arc::new(DownProvider));

    let engagement = honeypot.handle("scammer-4", "share your OTP").await;

    assert!(engagement.degraded);
    assert_eq!(engagement.reply, FALLBACK_REPLY);
    let verdict = engagement.verdict.expect("verdict");
    assert_eq!(verdict.category, ScamCategory::Otp);
    assert_eq!(verdict.risk, RiskLevel::High);

    let turns = store.turns("scammer-4").await.expect("turns");
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].agent_reply, FALLBACK_REPLY);

    let csv = String::from_utf8(evidence.export().await.expect("export")).expect("utf8");
    assert!(csv.contains("share your OTP"));
}

#[tokio::test]
async fn later_turns_see_earlier_ones() {
    let provider = RecordingProvider::new("Go on.");
    let (honeypot, _, _) = honeypot(Arc::clone(&provider) as _);

    honeypot.handle("c1", "hello from your bank").await;
    honeypot.handle("c2", "unrelated chat").await;
    honeypot.handle("c1", "now share the code").await;

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("Scammer: hello from your bank\nAgent: Go on."));
    assert!(!prompts[2].contains("unrelated chat"));
}

#[tokio::test]
async fn history_window_is_bounded() {
    let provider = RecordingProvider::new("ok");
    let (honeypot, _, _) = honeypot(Arc::clone(&provider) as _);
    let honeypot = honeypot.with_history_limit(Some(1));

    for message in ["first", "second", "third"] {
        honeypot.handle("c1", message).await;
    }

    let prompts = provider.prompts();
    let last = prompts.last().expect("prompt");
    assert!(last.contains("Scammer: second"));
    assert!(!last.contains("Scammer: first"));
}

#[tokio::test]
async fn storage_failure_is_reported_not_fatal() {
    let provider = RecordingProvider::new("Who is this?");
    let evidence = Arc::new(MemoryEvidenceRecorder::new());
    let honeypot = Honeypot::new(
        Arc::new(BrokenStore),
        Arc::clone(&evidence) as Arc<dyn EvidenceRecorder>,
        ResponseGenerator::new(provider, DecodingParams::default()),
    );

    let engagement = honeypot.handle("c1", "pay now").await;

    assert_eq!(engagement.reply, "Who is this?");
    assert_eq!(engagement.storage_failures.len(), 1);
    assert!(matches!(
        engagement.storage_failures[0],
        StorageFailure::Conversation(_)
    ));
    // The evidence channel is independent and still records the turn.
    assert!(evidence.export().await.is_ok());
}

#[tokio::test]
async fn evidence_failure_is_reported_and_turn_still_lands() {
    let provider = RecordingProvider::new("Which bank is this?");
    let store = Arc::new(MemoryConversationStore::new());
    let honeypot = Honeypot::new(
        Arc::clone(&store) as Arc<dyn ConversationStore>,
        Arc::new(BrokenRecorder),
        ResponseGenerator::new(provider, DecodingParams::default()),
    );

    let engagement = honeypot.handle("c1", "Your account is blocked").await;

    assert_eq!(engagement.reply, "Which bank is this?");
    assert!(engagement.verdict.is_some());
    assert_eq!(engagement.storage_failures.len(), 1);
    assert!(matches!(
        engagement.storage_failures[0],
        StorageFailure::Evidence(_)
    ));
    let turns = store.turns("c1").await.expect("turns");
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].agent_reply, "Which bank is this?");
}
