//! Risk scoring tests.

use tarpit::triage::risk::RISK_RULES;
use tarpit::triage::{score, RiskLevel};

#[test]
fn urgency_triggers_score_high() {
    for trigger in RISK_RULES[0].triggers {
        let message = format!("please {trigger} thanks, verify it");
        assert_eq!(score(&message), RiskLevel::High, "{message:?}");
    }
}

#[test]
fn soft_triggers_alone_score_medium() {
    assert_eq!(score("Kindly confirm your address"), RiskLevel::Medium);
    assert_eq!(score("UPDATE your details"), RiskLevel::Medium);
}

#[test]
fn plain_message_scores_low() {
    assert_eq!(score("hello, is this Ravi?"), RiskLevel::Low);
    assert_eq!(score(""), RiskLevel::Low);
}

#[test]
fn levels_are_ordered() {
    assert!(RiskLevel::High > RiskLevel::Medium);
    assert!(RiskLevel::Medium > RiskLevel::Low);
}

#[test]
fn levels_serialize_uppercase() {
    let json = serde_json::to_string(&RiskLevel::Medium).expect("serialize");
    assert_eq!(json, "\"MEDIUM\"");
    assert_eq!(RiskLevel::parse("HIGH"), Ok(RiskLevel::High));
    assert!(RiskLevel::parse("high").is_err());
}

#[test]
fn look_alike_letters_do_not_hide_urgency() {
    assert_eq!(score("verıfy your details"), RiskLevel::Medium);
    assert_eq!(score("VERıFY your details"), RiskLevel::Medium);
    assert_eq!(score("urgent, account blocked"), RiskLevel::High);
    assert_eq!(score("URGENT"), RiskLevel::High);
}
