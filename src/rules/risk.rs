//! Medical risk triage: a fixed three-tier partition of `MedicalCondition`.

use serde::{Deserialize, Serialize};

use crate::scan::MedicalCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Display window shown next to a referral prompt.
    pub fn referral(&self) -> Referral {
        match self {
            Self::Critical => Referral::Immediate,
            Self::High | Self::Medium => Referral::Soon,
            Self::Low => Referral::Routine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Referral {
    Immediate,
    Soon,
    Routine,
}

impl Referral {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Soon => "soon",
            Self::Routine => "routine",
        }
    }
}

/// Result of triage. Static policy data, never computed from scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLevel {
    pub level: RiskTier,
    pub requires_dermatologist: bool,
    pub urgency: Urgency,
    pub message: &'static str,
}

const HIGH_MESSAGE: &str = "This condition requires immediate medical evaluation. Please consult a dermatologist as soon as possible.";
const MEDIUM_MESSAGE: &str = "This condition should be evaluated by a dermatologist to confirm diagnosis and discuss treatment options.";
const LOW_MESSAGE: &str = "This condition can typically be managed with proper skincare and over-the-counter treatments.";
const NORMAL_MESSAGE: &str = "No concerning conditions detected. Your skin appears healthy!";
const UNKNOWN_MESSAGE: &str =
    "We recommend consulting a dermatologist for proper evaluation and treatment.";

/// Tier membership, independent of urgency and messages.
pub fn tier_of(condition: &MedicalCondition) -> Option<RiskTier> {
    use MedicalCondition::*;
    match condition {
        SkinCancer | Melanoma | Bcc | Scc | ActinicKeratosis | Lupus | Vasculitis | Bullous
        | DrugEruption => Some(RiskTier::High),
        Psoriasis | Vitiligo | Lichen | Moles | Nevus | VascularTumors | SunDamage
        | BenignTumors => Some(RiskTier::Medium),
        Acne | Rosacea | Eczema | AtopicDermatitis | Tinea | Ringworm | Candidiasis | Warts
        | SeborrheicKeratosis | Infestations | Bites | FungalInfection | Hives | Normal => {
            Some(RiskTier::Low)
        }
        Unknown(_) => None,
    }
}

/// Classify a medical finding. Unrecognized conditions fall back to medium
/// risk with a dermatologist referral.
pub fn classify(condition: &MedicalCondition) -> RiskLevel {
    match tier_of(condition) {
        Some(RiskTier::High) => RiskLevel {
            level: RiskTier::High,
            requires_dermatologist: true,
            urgency: match condition {
                MedicalCondition::SkinCancer | MedicalCondition::Melanoma => Urgency::Critical,
                _ => Urgency::High,
            },
            message: HIGH_MESSAGE,
        },
        Some(RiskTier::Medium) => RiskLevel {
            level: RiskTier::Medium,
            requires_dermatologist: true,
            urgency: Urgency::Medium,
            message: MEDIUM_MESSAGE,
        },
        Some(RiskTier::Low) => RiskLevel {
            level: RiskTier::Low,
            requires_dermatologist: false,
            urgency: Urgency::Low,
            message: if *condition == MedicalCondition::Normal {
                NORMAL_MESSAGE
            } else {
                LOW_MESSAGE
            },
        },
        None => RiskLevel {
            level: RiskTier::Medium,
            requires_dermatologist: true,
            urgency: Urgency::Medium,
            message: UNKNOWN_MESSAGE,
        },
    }
}

// ── Self-care tips ──────────────────────────────────────────────────────

const SEE_DERMATOLOGIST_TIPS: &[&str] = &[
    "Schedule an appointment with a dermatologist as soon as possible",
    "Take clear photos of the affected area to track any changes",
    "Avoid self-medication until you have a professional diagnosis",
    "Protect the area from sun exposure",
];

const ACNE_TIPS: &[&str] = &[
    "Cleanse gently twice daily",
    "Use non-comedogenic products",
    "Avoid picking or squeezing",
    "Consider products with salicylic acid or benzoyl peroxide",
];

const ECZEMA_TIPS: &[&str] = &[
    "Moisturize frequently with fragrance-free lotions",
    "Avoid hot showers and harsh soaps",
    "Identify and avoid triggers",
    "Use over-the-counter hydrocortisone for flare-ups",
];

const FUNGAL_TIPS: &[&str] = &[
    "Keep the area clean and dry",
    "Apply over-the-counter antifungal cream",
    "Avoid sharing towels or clothing",
    "Wear breathable fabrics",
];

/// Static self-care bullets. Anything above low risk, and any low-risk
/// condition without a dedicated list, gets the see-a-dermatologist list.
pub fn tips(condition: &MedicalCondition) -> Vec<String> {
    let list = if classify(condition).level != RiskTier::Low {
        SEE_DERMATOLOGIST_TIPS
    } else {
        match condition {
            MedicalCondition::Acne => ACNE_TIPS,
            MedicalCondition::Eczema => ECZEMA_TIPS,
            MedicalCondition::FungalInfection => FUNGAL_TIPS,
            _ => SEE_DERMATOLOGIST_TIPS,
        }
    };
    list.iter().map(|s| s.to_string()).collect()
}
