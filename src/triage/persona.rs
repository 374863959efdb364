//! Victim persona lookup.

use std::fmt;

use serde::{Serialize, Serializer};

use super::{RiskLevel, ScamCategory, UnknownLabel};

/// A fictitious victim identity the decoy adopts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    /// Banking-style scams at high urgency.
    PanickedBankCustomer,
    /// Banking-style scams below high urgency.
    ConfusedUser,
    /// Lottery and prize bait.
    ExcitedLotteryWinner,
    /// Fake job offers.
    UnemployedJobSeeker,
    /// Romance scams.
    EmotionallyVulnerableIndividual,
    /// Everything else.
    EverydayUser,
}

impl Persona {
    /// Every persona in the table, fallback last.
    pub const ALL: [Persona; 6] = [
        Self::PanickedBankCustomer,
        Self::ConfusedUser,
        Self::ExcitedLotteryWinner,
        Self::UnemployedJobSeeker,
        Self::EmotionallyVulnerableIndividual,
        Self::EverydayUser,
    ];

    /// Parse a stored label.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLabel`] if the value is not a known persona.
    pub fn parse(s: &str) -> Result<Self, UnknownLabel> {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| UnknownLabel {
                field: "persona",
                value: s.to_owned(),
            })
    }

    /// Returns the label shown to the model and stored with each turn.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PanickedBankCustomer => "Panicked Bank Customer",
            Self::ConfusedUser => "Confused User",
            Self::ExcitedLotteryWinner => "Excited Lottery Winner",
            Self::UnemployedJobSeeker => "Unemployed Job Seeker",
            Self::EmotionallyVulnerableIndividual => "Emotionally Vulnerable Individual",
            Self::EverydayUser => "Everyday User",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Persona {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Row of [`PERSONA_TABLE`]. `None` in a column matches any value.
#[derive(Debug, Clone, Copy)]
pub struct PersonaRule {
    /// Categories this row applies to.
    pub categories: &'static [ScamCategory],
    /// Risk tier this row requires, if any.
    pub risk: Option<RiskLevel>,
    /// Persona selected when the row matches.
    pub persona: Persona,
}

const BANKING: &[ScamCategory] = &[
    ScamCategory::Otp,
    ScamCategory::PaymentFraud,
    ScamCategory::Phishing,
];

/// Decision table, first matching row wins; [`Persona::EverydayUser`] otherwise.
pub const PERSONA_TABLE: &[PersonaRule] = &[
    PersonaRule {
        categories: BANKING,
        risk: Some(RiskLevel::High),
        persona: Persona::PanickedBankCustomer,
    },
    PersonaRule {
        categories: BANKING,
        risk: None,
        persona: Persona::ConfusedUser,
    },
    PersonaRule {
        categories: &[ScamCategory::Lottery],
        risk: None,
        persona: Persona::ExcitedLotteryWinner,
    },
    PersonaRule {
        categories: &[ScamCategory::Job],
        risk: None,
        persona: Persona::UnemployedJobSeeker,
    },
    PersonaRule {
        categories: &[ScamCategory::Romance],
        risk: None,
        persona: Persona::EmotionallyVulnerableIndividual,
    },
];

/// Pick the persona for a category and risk tier.
pub fn select_persona(category: ScamCategory, risk: RiskLevel) -> Persona {
    PERSONA_TABLE
        .iter()
        .find(|row| row.categories.contains(&category) && row.risk.map_or(true, |r| r == risk))
        .map_or(Persona::EverydayUser, |row| row.persona)
}
