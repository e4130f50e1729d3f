//! Scan observations produced by the upstream inference services.

pub mod condition;
pub mod cosmetic;
pub mod labels;
pub mod medical;

pub use condition::{ConditionFamily, ConditionTag};
pub use cosmetic::{
    BoundingBox, ClassGrade, CosmeticCondition, CosmeticScan, Detection, ObservationSummary,
    SeverityTier,
};
pub use labels::normalize_label;
pub use medical::{LabelScore, MedicalCondition, MedicalInference, MedicalScan};
