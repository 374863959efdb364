//! Scam category classifier.
//!
//! Priority order is part of the contract: trigger sets overlap ("processing
//! fee" is both a lottery and a loan tell, "blocked" shows up in phishing
//! texts), so the first rule in [`CATEGORY_RULES`] with any trigger present
//! wins. Do not reorder rows to "improve accuracy".

use super::{first_match, fold_case, Rule, RuleHit, ScamCategory};

/// Ordered category rules, highest priority first.
pub const CATEGORY_RULES: &[Rule<ScamCategory>] = &[
    Rule {
        outcome: ScamCategory::Phishing,
        triggers: &[
            "http://",
            "https://",
            "www.",
            "verify your account",
            "login to continue",
            "click the link",
            "secure link",
            "suspicious activity",
            "unusual activity",
            "confirm your identity",
            "reset password",
            "bank alert",
            "account security",
            ".xyz",
            ".ru",
            ".top",
            "link",
        ],
    },
    Rule {
        outcome: ScamCategory::Otp,
        triggers: &[
            "otp",
            "one time password",
            "verification code",
            "kyc",
            "kyc update",
            "kyc pending",
            "account blocked",
            "account suspended",
            "verify now",
            "last chance",
            "within 24 hours",
        ],
    },
    Rule {
        outcome: ScamCategory::PaymentFraud,
        triggers: &[
            "upi",
            "gpay",
            "google pay",
            "phonepe",
            "paytm",
            "send money",
            "request money",
            "scan qr",
            "qr code",
            "refund",
            "cashback",
            "amount credited by mistake",
            "reverse payment",
        ],
    },
    Rule {
        outcome: ScamCategory::Lottery,
        triggers: &[
            "lottery",
            "winner",
            "won",
            "jackpot",
            "prize",
            "lucky draw",
            "congratulations",
            "claim your prize",
            "processing fee",
            "selected as winner",
        ],
    },
    Rule {
        outcome: ScamCategory::Job,
        triggers: &[
            "job",
            "salary",
            "interview",
            "work from home",
            "part time",
            "data entry",
            "typing job",
            "registration fee",
            "joining fee",
            "urgent hiring",
            "no experience required",
        ],
    },
    Rule {
        outcome: ScamCategory::TechSupport,
        triggers: &[
            "technical support",
            "tech support",
            "virus",
            "malware",
            "hacked",
            "windows security alert",
            "microsoft support",
            "anydesk",
            "teamviewer",
            "do not shut down",
        ],
    },
    Rule {
        outcome: ScamCategory::Romance,
        triggers: &[
            "love",
            "relationship",
            "marriage",
            "trust me",
            "i care for you",
            "lonely",
            "emotional support",
            "video call",
            "send photo",
            "future together",
        ],
    },
    Rule {
        outcome: ScamCategory::Loan,
        triggers: &[
            "loan",
            "instant loan",
            "quick loan",
            "pre approved loan",
            "credit card",
            "credit limit increased",
            "low interest",
            "processing fee",
            "cibil score",
        ],
    },
    Rule {
        outcome: ScamCategory::Investment,
        triggers: &[
            "investment",
            "crypto",
            "bitcoin",
            "trading",
            "share market",
            "double money",
            "profit guaranteed",
            "high returns",
            "forex",
            "daily income",
        ],
    },
    Rule {
        outcome: ScamCategory::Impersonation,
        triggers: &[
            "police",
            "cbi",
            "income tax",
            "arrest",
            "arrest warrant",
            "court case",
            "legal action",
            "pan card",
            "aadhar",
            "customs department",
            "case registered",
        ],
    },
    Rule {
        outcome: ScamCategory::Courier,
        triggers: &[
            "parcel",
            "courier",
            "delivery",
            "fedex",
            "dhl",
            "blue dart",
            "customs hold",
            "address issue",
            "shipment blocked",
            "import duty",
        ],
    },
];

/// Outcome of [`explain`]: the category and, when a rule fired, its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Winning category (`Unknown` when nothing matched).
    pub category: ScamCategory,
    /// Trigger substring that decided the category.
    pub trigger: Option<&'static str>,
}

/// Classify a message into exactly one [`ScamCategory`].
pub fn classify(message: &str) -> ScamCategory {
    explain(message).category
}

/// Classify a message and report which trigger decided it.
pub fn explain(message: &str) -> Classification {
    let folded = fold_case(message);
    match first_match(CATEGORY_RULES, &folded) {
        Some(RuleHit { outcome, trigger }) => Classification {
            category: outcome,
            trigger: Some(trigger),
        },
        None => Classification {
            category: ScamCategory::Unknown,
            trigger: None,
        },
    }
}
