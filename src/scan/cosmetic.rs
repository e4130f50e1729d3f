//! Cosmetic scan observations and the per-turn observation summary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::condition::ConditionTag;

/// Conditions reported by the cosmetic detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticCondition {
    AcneVulgaris,
    InflammatoryAcne,
    Whiteheads,
    Blackheads,
    Hyperpigmentation,
    Pih,
    DarkCircles,
    FineLines,
    #[serde(other)]
    Other,
}

impl CosmeticCondition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AcneVulgaris => "acne_vulgaris",
            Self::InflammatoryAcne => "inflammatory_acne",
            Self::Whiteheads => "whiteheads",
            Self::Blackheads => "blackheads",
            Self::Hyperpigmentation => "hyperpigmentation",
            Self::Pih => "pih",
            Self::DarkCircles => "dark_circles",
            Self::FineLines => "fine_lines",
            Self::Other => "other",
        }
    }

    pub fn is_acne(&self) -> bool {
        matches!(
            self,
            Self::AcneVulgaris | Self::InflammatoryAcne | Self::Whiteheads | Self::Blackheads
        )
    }

    pub fn is_pigmentation(&self) -> bool {
        matches!(self, Self::Hyperpigmentation | Self::Pih)
    }
}

/// Axis-aligned box, either normalized to [0,1] or in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            self.x1 + (self.x2 - self.x1) / 2.0,
            self.y1 + (self.y2 - self.y1) / 2.0,
        )
    }
}

/// Detector class, sent either as an index or a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassGrade {
    Index(i64),
    Name(String),
}

/// One raw detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    #[serde(alias = "classId")]
    pub class_grade: Option<ClassGrade>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(rename = "box", alias = "boundingBox", default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub label: Option<String>,
}

/// Output of the cosmetic inference collaborator for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmeticScan {
    #[serde(alias = "detectedConditions", default)]
    pub detected_conditions: Vec<CosmeticCondition>,
    #[serde(alias = "severityScore", default)]
    pub severity_score: f64,
    #[serde(default)]
    pub confidence: f64,
    /// Raw detections keyed by category ("acne", "dark_circles").
    #[serde(rename = "rawDetections", alias = "raw_detections", default)]
    pub raw_detections: HashMap<String, Vec<Detection>>,
    #[serde(rename = "totalDetections", alias = "total_detections", default)]
    pub total_detections: Option<u32>,
}

impl CosmeticScan {
    /// Severity clamped into [0,1].
    pub fn severity(&self) -> f64 {
        if self.severity_score.is_nan() {
            return 0.0;
        }
        self.severity_score.clamp(0.0, 1.0)
    }

    pub fn total(&self) -> u32 {
        self.total_detections.unwrap_or_else(|| {
            self.raw_detections
                .values()
                .map(|v| v.len() as u32)
                .sum()
        })
    }

    pub fn has(&self, condition: CosmeticCondition) -> bool {
        self.detected_conditions.contains(&condition)
    }

    /// Priority: inflammatory acne > acne > hyperpigmentation/PIH > dark circles > normal.
    pub fn primary_condition(&self) -> ConditionTag {
        if self.has(CosmeticCondition::InflammatoryAcne) {
            ConditionTag::InflammatoryAcne
        } else if self.has(CosmeticCondition::AcneVulgaris) {
            ConditionTag::Acne
        } else if self.detected_conditions.iter().any(|c| c.is_pigmentation()) {
            ConditionTag::Hyperpigmentation
        } else if self.has(CosmeticCondition::DarkCircles) {
            ConditionTag::DarkCircles
        } else {
            ConditionTag::Maintenance
        }
    }

    pub fn has_acne(&self) -> bool {
        self.detected_conditions.iter().any(|c| c.is_acne())
    }

    pub fn has_pigmentation(&self) -> bool {
        self.detected_conditions.iter().any(|c| c.is_pigmentation())
    }

    pub fn has_acne_or_pigmentation(&self) -> bool {
        self.has_acne() || self.has_pigmentation()
    }

    pub fn is_dark_circles_only(&self) -> bool {
        !self.detected_conditions.is_empty()
            && self
                .detected_conditions
                .iter()
                .all(|c| *c == CosmeticCondition::DarkCircles)
    }

    pub fn condition_labels(&self) -> Vec<&'static str> {
        self.detected_conditions.iter().map(|c| c.label()).collect()
    }
}

/// How aggressive the treatment should be, by detection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    /// Fewer than 4 detections.
    Spot,
    /// 4 to 9 detections.
    Serum,
    /// 10 or more detections.
    Protocol,
}

impl SeverityTier {
    pub fn from_count(total: u32) -> Self {
        match total {
            0..=3 => Self::Spot,
            4..=9 => Self::Serum,
            _ => Self::Protocol,
        }
    }
}

/// Digest of a cosmetic scan used for planning and zone-aware notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSummary {
    pub total: u32,
    pub severity_tier: SeverityTier,
    pub t_zone_count: u32,
    pub u_zone_count: u32,
    /// False when acne boxes are not normalized; zone counts are then zero.
    pub zoning: bool,
}

impl ObservationSummary {
    pub fn from_scan(scan: &CosmeticScan) -> Self {
        let total = scan.total();
        let centers: Vec<(f64, f64)> = scan
            .raw_detections
            .get("acne")
            .map(|dets| dets.iter().map(|d| d.bounding_box.center()).collect())
            .unwrap_or_default();

        // Pixel coordinates cannot be zoned without image dimensions.
        let zoning = centers
            .iter()
            .all(|&(cx, cy)| (0.0..=1.0).contains(&cx) && (0.0..=1.0).contains(&cy));

        let (mut t_zone_count, mut u_zone_count) = (0, 0);
        if zoning {
            for (cx, cy) in centers {
                let center_column = (0.33..=0.66).contains(&cx);
                if center_column && cy <= 0.66 {
                    t_zone_count += 1;
                } else {
                    u_zone_count += 1;
                }
            }
        }

        Self {
            total,
            severity_tier: SeverityTier::from_count(total),
            t_zone_count,
            u_zone_count,
            zoning,
        }
    }

    pub fn t_zone_dominant(&self) -> bool {
        self.t_zone_count > self.u_zone_count
    }
}
