//! User health profile: skin attributes, allergies, diseases and hormonal flags.

use serde::{Deserialize, Serialize};

/// Skin type as declared during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    Oily,
    Dry,
    #[default]
    Combination,
    Sensitive,
}

impl SkinType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Oily => "oily",
            Self::Dry => "dry",
            Self::Combination => "combination",
            Self::Sensitive => "sensitive",
        }
    }
}

impl std::fmt::Display for SkinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fitzpatrick skin phototype, 1 (lightest) to 6 (darkest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Fitzpatrick(u8);

impl Fitzpatrick {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Types IV to VI. Triggers the melanin-safe ingredient overrides.
    pub fn is_dark(&self) -> bool {
        self.0 >= 4
    }
}

impl Default for Fitzpatrick {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Fitzpatrick {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("fitzpatrick scale must be 1..=6, got {value}"))
    }
}

impl From<Fitzpatrick> for u8 {
    fn from(value: Fitzpatrick) -> Self {
        value.0
    }
}

/// Hormonal factors that change ingredient safety.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HormonalFactors {
    pub is_pregnant: bool,
    pub is_menopausal: bool,
    pub has_hormonal_imbalance: bool,
    pub taking_hormonal_medication: bool,
    pub menstrual_cycle_affects: bool,
}

impl HormonalFactors {
    /// Pregnancy or hormonal medication: retinoids are contraindicated.
    pub fn forbids_retinoids(&self) -> bool {
        self.is_pregnant || self.taking_hormonal_medication
    }

    /// Human-readable list of the flags that are set.
    pub fn active_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.is_pregnant {
            labels.push("pregnancy");
        }
        if self.is_menopausal {
            labels.push("menopause");
        }
        if self.has_hormonal_imbalance {
            labels.push("hormonal imbalance");
        }
        if self.taking_hormonal_medication {
            labels.push("hormonal medication");
        }
        if self.menstrual_cycle_affects {
            labels.push("menstrual cycle effects");
        }
        labels
    }
}

/// A user's long-lived profile document.
///
/// Every field has a default so partial documents from older clients still
/// deserialize; the agents rely on `SkinType::Combination` and Fitzpatrick III
/// when nothing was declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    /// Stated age in years; 0 when unknown.
    pub age: u32,
    pub gender: Option<String>,
    pub skin_type: SkinType,
    pub fitzpatrick_scale: Fitzpatrick,
    pub concerns: Vec<String>,
    pub allergies: Vec<String>,
    pub diseases: Vec<String>,
    pub hormonal_factors: HormonalFactors,
}

impl UserProfile {
    /// Allergens lowercased and trimmed, empties removed.
    pub fn normalized_allergies(&self) -> Vec<String> {
        self.allergies
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    }

    pub fn has_disease(&self, name: &str) -> bool {
        self.diseases
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(name))
    }
}
