//! Medical scan observations.

use serde::{Deserialize, Serialize};

use super::condition::ConditionTag;
use super::labels::normalize_label;
use crate::rules::risk::{self, RiskTier};

/// Closed set of medical findings the classifier can report.
///
/// Anything outside the set is carried as `Unknown` so the risk classifier can
/// apply its conservative default instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MedicalCondition {
    // High risk
    SkinCancer,
    Melanoma,
    Bcc,
    Scc,
    ActinicKeratosis,
    Lupus,
    Vasculitis,
    Bullous,
    DrugEruption,
    // Medium risk
    Psoriasis,
    Vitiligo,
    Lichen,
    Moles,
    Nevus,
    VascularTumors,
    SunDamage,
    BenignTumors,
    // Low risk
    Acne,
    Rosacea,
    Eczema,
    AtopicDermatitis,
    Tinea,
    Ringworm,
    Candidiasis,
    Warts,
    SeborrheicKeratosis,
    Infestations,
    Bites,
    FungalInfection,
    Hives,
    Normal,
    Unknown(String),
}

impl MedicalCondition {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SkinCancer => "skin_cancer",
            Self::Melanoma => "melanoma",
            Self::Bcc => "bcc",
            Self::Scc => "scc",
            Self::ActinicKeratosis => "actinic_keratosis",
            Self::Lupus => "lupus",
            Self::Vasculitis => "vasculitis",
            Self::Bullous => "bullous",
            Self::DrugEruption => "drug_eruption",
            Self::Psoriasis => "psoriasis",
            Self::Vitiligo => "vitiligo",
            Self::Lichen => "lichen",
            Self::Moles => "moles",
            Self::Nevus => "nevus",
            Self::VascularTumors => "vascular_tumors",
            Self::SunDamage => "sun_damage",
            Self::BenignTumors => "benign_tumors",
            Self::Acne => "acne",
            Self::Rosacea => "rosacea",
            Self::Eczema => "eczema",
            Self::AtopicDermatitis => "atopic_dermatitis",
            Self::Tinea => "tinea",
            Self::Ringworm => "ringworm",
            Self::Candidiasis => "candidiasis",
            Self::Warts => "warts",
            Self::SeborrheicKeratosis => "seborrheic_keratosis",
            Self::Infestations => "infestations",
            Self::Bites => "bites",
            Self::FungalInfection => "fungal_infection",
            Self::Hives => "hives",
            Self::Normal => "normal",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    /// Exact match on the canonical snake_case name.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "skin_cancer" => Self::SkinCancer,
            "melanoma" => Self::Melanoma,
            "bcc" => Self::Bcc,
            "scc" => Self::Scc,
            "actinic_keratosis" => Self::ActinicKeratosis,
            "lupus" => Self::Lupus,
            "vasculitis" => Self::Vasculitis,
            "bullous" => Self::Bullous,
            "drug_eruption" => Self::DrugEruption,
            "psoriasis" => Self::Psoriasis,
            "vitiligo" => Self::Vitiligo,
            "lichen" => Self::Lichen,
            "moles" => Self::Moles,
            "nevus" => Self::Nevus,
            "vascular_tumors" => Self::VascularTumors,
            "sun_damage" => Self::SunDamage,
            "benign_tumors" => Self::BenignTumors,
            "acne" => Self::Acne,
            "rosacea" => Self::Rosacea,
            "eczema" => Self::Eczema,
            "atopic_dermatitis" => Self::AtopicDermatitis,
            "tinea" => Self::Tinea,
            "ringworm" => Self::Ringworm,
            "candidiasis" => Self::Candidiasis,
            "warts" => Self::Warts,
            "seborrheic_keratosis" => Self::SeborrheicKeratosis,
            "infestations" => Self::Infestations,
            "bites" => Self::Bites,
            "fungal_infection" => Self::FungalInfection,
            "hives" => Self::Hives,
            "normal" => Self::Normal,
            _ => Self::Unknown(name.to_string()),
        }
    }

    /// Cosmetic-equivalent tag used to compute actives after triage.
    pub fn skincare_equivalent(&self) -> ConditionTag {
        match self {
            Self::Acne => ConditionTag::Acne,
            Self::Rosacea => ConditionTag::Rosacea,
            Self::Eczema | Self::AtopicDermatitis => ConditionTag::Eczema,
            Self::Tinea | Self::Ringworm | Self::Candidiasis | Self::FungalInfection => {
                ConditionTag::FungalInfection
            }
            Self::Warts => ConditionTag::Warts,
            Self::SeborrheicKeratosis => ConditionTag::Hyperpigmentation,
            Self::Infestations | Self::Bites | Self::Hives => ConditionTag::SensitiveSkin,
            _ => ConditionTag::Maintenance,
        }
    }

    /// Name with underscores replaced for user-facing sentences.
    pub fn display_name(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<String> for MedicalCondition {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<MedicalCondition> for String {
    fn from(value: MedicalCondition) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MedicalCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the medical classifier after normalization.
///
/// `risk_flag` is what the UI shows next to the photo; it is informational
/// and never used for triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalScan {
    #[serde(alias = "conditionMatch")]
    pub condition_match: MedicalCondition,
    #[serde(alias = "riskFlag", default)]
    pub risk_flag: Option<RiskTier>,
    #[serde(alias = "visualMarkers", default)]
    pub visual_markers: Vec<String>,
}

impl MedicalScan {
    pub fn new(condition: MedicalCondition) -> Self {
        Self {
            condition_match: condition,
            risk_flag: None,
            visual_markers: Vec::new(),
        }
    }
}

/// A ranked alternative from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Raw response of the medical inference collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInference {
    #[serde(alias = "predicted_label")]
    pub predicted_label: String,
    #[serde(default)]
    pub score: f64,
    #[serde(alias = "top_k", default)]
    pub top_k: Vec<LabelScore>,
}

impl MedicalInference {
    /// Normalize the free-text label into a scan. The score is ignored for
    /// triage: a "normal" label is low risk at any confidence.
    pub fn to_scan(&self) -> MedicalScan {
        let condition = normalize_label(&self.predicted_label);
        let tier = risk::classify(&condition).level;
        MedicalScan {
            condition_match: condition,
            risk_flag: Some(tier),
            visual_markers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_serde() {
        let scan: MedicalScan = serde_json::from_value(serde_json::json!({
            "condition_match": "atopic_dermatitis",
            "risk_flag": "low",
            "visual_markers": ["redness"]
        }))
        .unwrap();
        assert_eq!(scan.condition_match, MedicalCondition::AtopicDermatitis);
        assert_eq!(scan.risk_flag, Some(RiskTier::Low));

        let json = serde_json::to_value(&scan).unwrap();
        assert_eq!(json["condition_match"], "atopic_dermatitis");
    }

    #[test]
    fn unrecognized_name_is_unknown() {
        let c = MedicalCondition::from_name("cellulitis");
        assert_eq!(c, MedicalCondition::Unknown("cellulitis".into()));
        assert_eq!(c.as_str(), "cellulitis");
    }

    #[test]
    fn skincare_mapping_table() {
        use MedicalCondition::*;
        assert_eq!(Acne.skincare_equivalent(), ConditionTag::Acne);
        assert_eq!(AtopicDermatitis.skincare_equivalent(), ConditionTag::Eczema);
        assert_eq!(Ringworm.skincare_equivalent(), ConditionTag::FungalInfection);
        assert_eq!(
            SeborrheicKeratosis.skincare_equivalent(),
            ConditionTag::Hyperpigmentation
        );
        assert_eq!(Hives.skincare_equivalent(), ConditionTag::SensitiveSkin);
        assert_eq!(Normal.skincare_equivalent(), ConditionTag::Maintenance);
        assert_eq!(Psoriasis.skincare_equivalent(), ConditionTag::Maintenance);
        assert_eq!(
            Unknown("x".into()).skincare_equivalent(),
            ConditionTag::Maintenance
        );
    }

    #[test]
    fn inference_normalizes_label() {
        let inference: MedicalInference = serde_json::from_value(serde_json::json!({
            "predictedLabel": "Melanoma Skin Cancer Nevi and Moles",
            "score": 0.41,
            "topK": [{"label": "Melanoma Skin Cancer Nevi and Moles", "score": 0.41}]
        }))
        .unwrap();
        let scan = inference.to_scan();
        assert_eq!(scan.condition_match, MedicalCondition::Melanoma);
        assert_eq!(scan.risk_flag, Some(RiskTier::High));
    }

    #[test]
    fn normal_label_is_low_risk_at_any_confidence() {
        let inference = MedicalInference {
            predicted_label: "normal".into(),
            score: 0.05,
            top_k: vec![],
        };
        let scan = inference.to_scan();
        assert_eq!(scan.condition_match, MedicalCondition::Normal);
        assert_eq!(scan.risk_flag, Some(RiskTier::Low));
    }
}
