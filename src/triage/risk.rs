//! Risk tier scoring, independent of the category classifier.
//!
//! Some triggers here ("otp", "arrest") also appear in category rules. The
//! two passes stay separate on purpose: a message can be HIGH risk in any
//! category.

use super::{first_match, fold_case, RiskLevel, Rule};

/// Ordered risk rules; anything unmatched is [`RiskLevel::Low`].
pub const RISK_RULES: &[Rule<RiskLevel>] = &[
    Rule {
        outcome: RiskLevel::High,
        triggers: &[
            "otp",
            "urgent",
            "blocked",
            "arrest",
            "pay now",
            "click immediately",
        ],
    },
    Rule {
        outcome: RiskLevel::Medium,
        triggers: &["verify", "confirm", "update"],
    },
];

/// Score the urgency of a message.
pub fn score(message: &str) -> RiskLevel {
    let folded = fold_case(message);
    first_match(RISK_RULES, &folded).map_or(RiskLevel::Low, |hit| hit.outcome)
}
