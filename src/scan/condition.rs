//! Condition tags that drive ingredient selection.

use serde::{Deserialize, Serialize};

/// The condition an actives decision is computed for.
///
/// Cosmetic scans pick one of the first four by priority; medical findings
/// are mapped onto this set through a fixed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTag {
    InflammatoryAcne,
    Acne,
    Hyperpigmentation,
    DarkCircles,
    Rosacea,
    Eczema,
    FungalInfection,
    Warts,
    SensitiveSkin,
    Maintenance,
}

/// Which base rule of the suitability cascade applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionFamily {
    Acne,
    Pigmentation,
    DarkCircles,
    Maintenance,
}

impl ConditionTag {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InflammatoryAcne => "inflammatory_acne",
            Self::Acne => "acne",
            Self::Hyperpigmentation => "hyperpigmentation",
            Self::DarkCircles => "dark_circles",
            Self::Rosacea => "rosacea",
            Self::Eczema => "eczema",
            Self::FungalInfection => "fungal_infection",
            Self::Warts => "warts",
            Self::SensitiveSkin => "sensitive_skin",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn family(&self) -> ConditionFamily {
        match self {
            Self::InflammatoryAcne | Self::Acne => ConditionFamily::Acne,
            Self::Hyperpigmentation => ConditionFamily::Pigmentation,
            Self::DarkCircles => ConditionFamily::DarkCircles,
            _ => ConditionFamily::Maintenance,
        }
    }

    pub fn is_acne(&self) -> bool {
        self.family() == ConditionFamily::Acne
    }

    /// Lenient parse of a free-text tag ("acne_vulgaris", "dark circles", "PIH").
    pub fn from_text(text: &str) -> Self {
        let t = text.trim().to_lowercase().replace(['-', ' '], "_");
        if t.contains("acne") {
            if t.contains("inflammatory") {
                Self::InflammatoryAcne
            } else {
                Self::Acne
            }
        } else if t.contains("hyperpigmentation") || t.contains("pih") {
            Self::Hyperpigmentation
        } else if t.contains("dark_circle") {
            Self::DarkCircles
        } else if t.contains("rosacea") {
            Self::Rosacea
        } else if t.contains("eczema") || t.contains("dermatitis") {
            Self::Eczema
        } else if t.contains("fungal") {
            Self::FungalInfection
        } else if t.contains("wart") {
            Self::Warts
        } else if t.contains("sensitive") {
            Self::SensitiveSkin
        } else {
            Self::Maintenance
        }
    }
}

impl std::fmt::Display for ConditionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
