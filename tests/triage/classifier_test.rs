//! Category classification tests.

use tarpit::triage::classifier::CATEGORY_RULES;
use tarpit::triage::{classify, explain, ScamCategory};

#[test]
fn phishing_wins_over_every_other_category() {
    let phishing = CATEGORY_RULES[0].triggers[0];
    for rule in CATEGORY_RULES {
        for trigger in rule.triggers {
            let message = format!("{trigger} and also {phishing}");
            assert_eq!(
                classify(&message),
                ScamCategory::Phishing,
                "message {message:?} should classify as phishing"
            );
        }
    }
}

#[test]
fn otp_outranks_lottery() {
    assert_eq!(
        classify("Share the OTP to claim your lottery prize"),
        ScamCategory::Otp
    );
}

#[test]
fn every_rule_is_reachable_on_its_own_triggers() {
    // Each rule's first trigger must not be shadowed by a higher rule.
    for rule in CATEGORY_RULES {
        let trigger = rule.triggers[0];
        assert_eq!(classify(trigger), rule.outcome, "trigger {trigger:?}");
    }
}

#[test]
fn no_trigger_means_unknown() {
    let result = explain("good morning, how are you today");
    assert_eq!(result.category, ScamCategory::Unknown);
    assert_eq!(result.trigger, None);
}

#[test]
fn explain_reports_deciding_trigger() {
    let result = explain("Your FedEx parcel is held at customs");
    assert_eq!(result.category, ScamCategory::Courier);
    assert_eq!(result.trigger, Some("parcel"));
}

#[test]
fn matching_is_substring_based() {
    // "link" inside another word still counts.
    assert_eq!(classify("we are linked via friends"), ScamCategory::Phishing);
}

#[test]
fn labels_round_trip_through_parse() {
    for category in ScamCategory::ALL {
        assert_eq!(ScamCategory::parse(category.as_str()), Ok(category));
    }
    assert!(ScamCategory::parse("Pig Butchering").is_err());
}

#[test]
fn categories_serialize_to_labels() {
    let json = serde_json::to_string(&ScamCategory::PaymentFraud).expect("serialize");
    assert_eq!(json, "\"Payment / UPI Fraud\"");
}

#[test]
fn look_alike_letters_classify_like_their_upper_case() {
    let disguised = "clıck the lınk to get paid";
    assert_eq!(classify(disguised), ScamCategory::Phishing);
    assert_eq!(classify(&disguised.to_uppercase()), ScamCategory::Phishing);
    assert_eq!(classify("ſcan qr to receive"), ScamCategory::PaymentFraud);
}
