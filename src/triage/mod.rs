//! Message triage: scam category, risk tier, and victim persona.
//!
//! All three stages are pure, total functions over ordered keyword tables.
//! The tables are data ([`Rule`] slices) consulted by a single generic
//! first-match routine ([`first_match`]), so editing a trigger list never
//! touches control flow.

pub mod classifier;
pub mod persona;
pub mod risk;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use classifier::{classify, explain, Classification};
pub use persona::{select_persona, Persona};
pub use risk::score;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Social-engineering pattern detected in a message.
///
/// Serializes to the human-readable label the admin dashboard and evidence
/// export have always shown (e.g. `"Payment / UPI Fraud"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScamCategory {
    /// Links, fake login pages, "verify your account".
    #[serde(rename = "Phishing Scam")]
    Phishing,
    /// One-time-password harvesting and account takeover.
    #[serde(rename = "OTP Scam")]
    Otp,
    /// UPI / wallet transfer fraud, fake refunds.
    #[serde(rename = "Payment / UPI Fraud")]
    PaymentFraud,
    /// Lottery, prize and lucky-draw bait.
    #[serde(rename = "Lottery Scam")]
    Lottery,
    /// Fake jobs with registration fees.
    #[serde(rename = "Job Scam")]
    Job,
    /// Fake technical support, remote-access tools.
    #[serde(rename = "Tech Support Scam")]
    TechSupport,
    /// Romance and honey-trap.
    #[serde(rename = "Romance Scam")]
    Romance,
    /// Instant loans and credit offers.
    #[serde(rename = "Loan Scam")]
    Loan,
    /// Crypto, trading and guaranteed-return schemes.
    #[serde(rename = "Investment Scam")]
    Investment,
    /// Police, tax or customs impersonation.
    #[serde(rename = "Impersonation Scam")]
    Impersonation,
    /// Parcel held, delivery fee, customs duty.
    #[serde(rename = "Courier Scam")]
    Courier,
    /// No rule matched.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl ScamCategory {
    /// Every category, in classifier priority order, `Unknown` last.
    pub const ALL: [ScamCategory; 12] = [
        Self::Phishing,
        Self::Otp,
        Self::PaymentFraud,
        Self::Lottery,
        Self::Job,
        Self::TechSupport,
        Self::Romance,
        Self::Loan,
        Self::Investment,
        Self::Impersonation,
        Self::Courier,
        Self::Unknown,
    ];

    /// Returns the label stored in SQLite and the evidence CSV.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phishing => "Phishing Scam",
            Self::Otp => "OTP Scam",
            Self::PaymentFraud => "Payment / UPI Fraud",
            Self::Lottery => "Lottery Scam",
            Self::Job => "Job Scam",
            Self::TechSupport => "Tech Support Scam",
            Self::Romance => "Romance Scam",
            Self::Loan => "Loan Scam",
            Self::Investment => "Investment Scam",
            Self::Impersonation => "Impersonation Scam",
            Self::Courier => "Courier Scam",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a stored label.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLabel`] if the value is not a recognised label.
    pub fn parse(s: &str) -> Result<Self, UnknownLabel> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                field: "scam_category",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for ScamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency / coercion tier of a message. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// No urgency or verification language.
    Low,
    /// Soft verification requests ("confirm", "update").
    Medium,
    /// Urgency, threats or account-block language.
    High,
}

impl RiskLevel {
    /// All tiers, lowest first.
    pub const ALL: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    /// Returns the string representation stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Parse from a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLabel`] if the value is not a recognised tier.
    pub fn parse(s: &str) -> Result<Self, UnknownLabel> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(UnknownLabel {
                field: "risk_level",
                value: other.to_owned(),
            }),
        }
    }

    /// Tone the decoy adopts at this tier.
    pub fn tone(&self) -> &'static str {
        match self {
            Self::Low => "curious and calm",
            Self::Medium => "confused and cautious",
            Self::High => "panicked and emotional",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored label did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} value: {value:?}")]
pub struct UnknownLabel {
    /// Which field contained the bad value.
    pub field: &'static str,
    /// The unexpected value.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// One row of an ordered keyword table.
#[derive(Debug, Clone, Copy)]
pub struct Rule<T: 'static> {
    /// Value returned when this rule fires.
    pub outcome: T,
    /// Lower-case substrings; any one occurring fires the rule.
    pub triggers: &'static [&'static str],
}

/// A rule that fired, with the trigger that fired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleHit<T> {
    /// Outcome of the winning rule.
    pub outcome: T,
    /// First trigger of that rule found in the message.
    pub trigger: &'static str,
}

/// Case-fold a message for matching against lower-case triggers.
///
/// The lower/upper/lower round trip maps look-alikes such as dotless `ı`,
/// long `ſ` and capital `ẞ` onto their ASCII spellings, so `s`, `upper(s)`
/// and `lower(s)` fold identically.
pub fn fold_case(message: &str) -> String {
    message.to_lowercase().to_uppercase().to_lowercase()
}

/// Return the first rule in `table` with a trigger occurring in `haystack`.
///
/// `haystack` must already be folded with [`fold_case`]. Rules are tried in
/// table order and triggers in row order, so the result depends only on the
/// table layout.
pub fn first_match<T: Copy>(table: &[Rule<T>], haystack: &str) -> Option<RuleHit<T>> {
    table.iter().find_map(|rule| {
        rule.triggers
            .iter()
            .copied()
            .find(|trigger| haystack.contains(trigger))
            .map(|trigger| RuleHit {
                outcome: rule.outcome,
                trigger,
            })
    })
}
