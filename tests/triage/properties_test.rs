//! Property tests for the triage passes over arbitrary Unicode text.

use proptest::prelude::*;

use tarpit::triage::classifier::CATEGORY_RULES;
use tarpit::triage::risk::RISK_RULES;
use tarpit::triage::{classify, fold_case, score, RiskLevel, ScamCategory};

fn rank(category: ScamCategory) -> usize {
    CATEGORY_RULES
        .iter()
        .position(|rule| rule.outcome == category)
        .unwrap_or(CATEGORY_RULES.len())
}

fn any_category_trigger() -> impl Strategy<Value = (usize, &'static str)> {
    (0..CATEGORY_RULES.len()).prop_flat_map(|index| {
        let triggers = CATEGORY_RULES[index].triggers;
        (Just(index), proptest::sample::select(triggers))
    })
}

proptest! {
    #[test]
    fn classification_ignores_case(text in "\\PC{0,80}") {
        let category = classify(&text);
        prop_assert_eq!(category, classify(&text.to_uppercase()));
        prop_assert_eq!(category, classify(&text.to_lowercase()));
    }

    #[test]
    fn risk_ignores_case(text in "\\PC{0,80}") {
        let risk = score(&text);
        prop_assert_eq!(risk, score(&text.to_uppercase()));
        prop_assert_eq!(risk, score(&text.to_lowercase()));
    }

    #[test]
    fn unknown_iff_no_trigger(text in "\\PC{0,80}") {
        let folded = fold_case(&text);
        let any_trigger = CATEGORY_RULES
            .iter()
            .any(|rule| rule.triggers.iter().any(|t| folded.contains(t)));
        prop_assert_eq!(classify(&text) == ScamCategory::Unknown, !any_trigger);
    }

    #[test]
    fn trigger_bounds_priority(
        prefix in "\\PC{0,30}",
        suffix in "\\PC{0,30}",
        (index, trigger) in any_category_trigger(),
    ) {
        let message = format!("{prefix}{trigger}{suffix}");
        // Surrounding noise may only promote the message to a higher rule.
        prop_assert!(rank(classify(&message)) <= index);
    }

    #[test]
    fn urgency_always_scores_high(
        prefix in "\\PC{0,30}",
        suffix in "\\PC{0,30}",
        trigger in proptest::sample::select(RISK_RULES[0].triggers),
    ) {
        let message = format!("{prefix}{}{suffix}", trigger.to_uppercase());
        prop_assert_eq!(score(&message), RiskLevel::High);
    }

    #[test]
    fn medium_requires_soft_trigger_without_urgency(text in "\\PC{0,80}") {
        let folded = fold_case(&text);
        let urgent = RISK_RULES[0].triggers.iter().any(|t| folded.contains(t));
        let soft = RISK_RULES[1].triggers.iter().any(|t| folded.contains(t));
        let expected = if urgent {
            RiskLevel::High
        } else if soft {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        prop_assert_eq!(score(&text), expected);
    }
}
