//! Free-text classifier label → `MedicalCondition` normalization.
//!
//! The table is evaluated top to bottom and the first rule with a matching
//! keyword wins, so the most dangerous conditions are listed first and the
//! healthy bucket last. A keyword matches at the start of a word: "mole"
//! matches "moles" but not "molluscum", "normal" does not match "abnormal".

use super::medical::MedicalCondition;

/// One row of the normalization table.
pub struct LabelRule {
    pub keywords: &'static [&'static str],
    /// Canonical condition name, see `MedicalCondition::from_name`.
    pub condition: &'static str,
}

pub static LABEL_RULES: &[LabelRule] = &[
    // High risk
    LabelRule { keywords: &["melanoma"], condition: "melanoma" },
    LabelRule { keywords: &["basal cell", "bcc"], condition: "bcc" },
    LabelRule { keywords: &["squamous cell", "scc"], condition: "scc" },
    LabelRule {
        keywords: &["skin cancer", "carcinoma", "malignant", "cancer"],
        condition: "skin_cancer",
    },
    LabelRule { keywords: &["actinic", "solar keratos"], condition: "actinic_keratosis" },
    LabelRule { keywords: &["lupus", "connective tissue"], condition: "lupus" },
    LabelRule { keywords: &["vasculitis"], condition: "vasculitis" },
    LabelRule { keywords: &["bullous", "pemphig"], condition: "bullous" },
    LabelRule { keywords: &["drug eruption", "exanthem"], condition: "drug_eruption" },
    // Medium risk
    LabelRule { keywords: &["psoriasis"], condition: "psoriasis" },
    LabelRule { keywords: &["lichen"], condition: "lichen" },
    LabelRule { keywords: &["vitiligo", "pigmentation disorder", "disorders of pigmentation"], condition: "vitiligo" },
    LabelRule { keywords: &["vascular tumor", "hemangioma"], condition: "vascular_tumors" },
    LabelRule { keywords: &["sun damage", "photodamage", "sunburn"], condition: "sun_damage" },
    LabelRule { keywords: &["nevus", "nevi"], condition: "nevus" },
    LabelRule { keywords: &["mole"], condition: "moles" },
    LabelRule { keywords: &["benign tumor"], condition: "benign_tumors" },
    // Low risk
    LabelRule { keywords: &["seborrheic"], condition: "seborrheic_keratosis" },
    LabelRule { keywords: &["atopic"], condition: "atopic_dermatitis" },
    LabelRule { keywords: &["eczema", "dermatitis"], condition: "eczema" },
    LabelRule { keywords: &["rosacea"], condition: "rosacea" },
    LabelRule { keywords: &["acne", "pimple", "comedo"], condition: "acne" },
    LabelRule { keywords: &["tinea"], condition: "tinea" },
    LabelRule { keywords: &["ringworm"], condition: "ringworm" },
    LabelRule { keywords: &["candid", "yeast"], condition: "candidiasis" },
    LabelRule { keywords: &["fung", "mycosis"], condition: "fungal_infection" },
    LabelRule { keywords: &["wart", "verruca"], condition: "warts" },
    LabelRule { keywords: &["scabies", "lice", "infestation"], condition: "infestations" },
    LabelRule { keywords: &["bite", "sting"], condition: "bites" },
    LabelRule { keywords: &["hives", "urticaria"], condition: "hives" },
    // Healthy bucket, always last.
    LabelRule {
        keywords: &["normal", "healthy", "clear skin", "no disease", "unknown"],
        condition: "normal",
    },
];

/// Normalize a classifier label. Labels matching no rule are carried as
/// `MedicalCondition::Unknown`.
pub fn normalize_label(label: &str) -> MedicalCondition {
    let text = format!(
        " {} ",
        label.trim().to_lowercase().replace(['_', '-', '/', ','], " ")
    );

    for rule in LABEL_RULES {
        if rule
            .keywords
            .iter()
            .any(|kw| text.contains(&format!(" {kw}")))
        {
            return MedicalCondition::from_name(rule.condition);
        }
    }

    MedicalCondition::Unknown(label.trim().to_string())
}
