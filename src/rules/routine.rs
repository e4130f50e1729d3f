//! Daily routine, environmental alerts and medical action items.

use serde::{Deserialize, Serialize};

use super::risk::{self, RiskTier};
use crate::profile::UserProfile;
use crate::scan::{CosmeticScan, MedicalCondition, MedicalScan};
use crate::weather::WeatherState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Product,
    Action,
    Warning,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Evening,
    Both,
}

/// One routine step or action item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl Recommendation {
    fn new(
        id: &str,
        kind: StepKind,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.into(),
            description: description.into(),
            priority,
            time_of_day: None,
            is_blocked: false,
            blocked_reason: None,
        }
    }

    fn at(mut self, time: TimeOfDay) -> Self {
        self.time_of_day = Some(time);
        self
    }

    fn blocked(mut self, reason: &str) -> Self {
        self.is_blocked = true;
        self.blocked_reason = Some(reason.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRoutine {
    pub morning: Vec<Recommendation>,
    pub evening: Vec<Recommendation>,
    pub alerts: Vec<Recommendation>,
}

impl DailyRoutine {
    pub fn steps(&self) -> impl Iterator<Item = &Recommendation> {
        self.morning.iter().chain(self.evening.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Uv,
    Humidity,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub action_required: String,
}

pub fn generate_environmental_alerts(weather: &WeatherState) -> Vec<EnvironmentalAlert> {
    let mut alerts = Vec::new();

    if weather.is_high_uv {
        alerts.push(EnvironmentalAlert {
            id: "alert-high-uv".into(),
            kind: AlertKind::Uv,
            severity: AlertSeverity::Warning,
            title: "High UV Alert".into(),
            message: format!(
                "UV Index is {}. Protect your skin from sun damage.",
                weather.uv_index
            ),
            action_required: "Apply SPF 50 sunscreen. Avoid retinol and exfoliants until evening."
                .into(),
        });
    }

    if weather.is_high_humidity {
        alerts.push(EnvironmentalAlert {
            id: "alert-high-humidity".into(),
            kind: AlertKind::Humidity,
            severity: AlertSeverity::Info,
            title: "High Humidity Advisory".into(),
            message: format!(
                "Humidity is at {}%. Switch to lightweight products.",
                weather.humidity
            ),
            action_required: "Use gel-based moisturizers to prevent clogged pores.".into(),
        });
    }

    if weather.is_dry_weather {
        alerts.push(EnvironmentalAlert {
            id: "alert-dry-weather".into(),
            kind: AlertKind::Humidity,
            severity: AlertSeverity::Warning,
            title: "Dry Weather Alert".into(),
            message: format!(
                "Humidity is low at {}%. Your skin barrier needs extra protection.",
                weather.humidity
            ),
            action_required: "Use heavier moisturizers and consider adding a hydrating serum."
                .into(),
        });
    }

    alerts
}

// ── Cosmetic routine ────────────────────────────────────────────────────

pub fn generate_cosmetic_routine(
    scan: &CosmeticScan,
    weather: &WeatherState,
    profile: &UserProfile,
) -> DailyRoutine {
    use Priority::*;
    use TimeOfDay::{Evening, Morning};

    let dark_skin = profile.fitzpatrick_scale.is_dark();
    let mut routine = DailyRoutine::default();

    // Morning
    routine.morning.push(
        Recommendation::new(
            "step-1-morning",
            StepKind::Product,
            "Gentle Cleanser",
            "Start with a hydrating cleanser to remove overnight buildup.",
            Medium,
        )
        .at(Morning),
    );

    if !weather.is_high_uv || weather.uv_index < 10.0 {
        routine.morning.push(
            Recommendation::new(
                "step-2-morning",
                StepKind::Product,
                "Vitamin C Serum",
                "Antioxidant protection and brightening.",
                Medium,
            )
            .at(Morning),
        );
    }

    let (title, description) = if weather.is_high_humidity {
        (
            "Lightweight Gel Moisturizer",
            "Humidity is high - using lightweight formula to prevent congestion.",
        )
    } else if weather.is_dry_weather {
        (
            "Rich Barrier Cream",
            "Extra hydration needed due to dry conditions.",
        )
    } else {
        (
            "Daily Moisturizer",
            "Balanced hydration for your skin type.",
        )
    };
    routine.morning.push(
        Recommendation::new("step-3-morning", StepKind::Product, title, description, Medium)
            .at(Morning),
    );

    let sunscreen = if weather.is_high_uv {
        Recommendation::new(
            "step-4-morning",
            StepKind::Alert,
            "SPF 50+ Required",
            format!(
                "UV Index is {}! Maximum protection required.",
                weather.uv_index
            ),
            Critical,
        )
    } else {
        Recommendation::new(
            "step-4-morning",
            StepKind::Product,
            "SPF 30+ Sunscreen",
            "Daily sun protection to prevent damage and dark spots.",
            High,
        )
    };
    routine.morning.push(sunscreen.at(Morning));

    // Evening
    routine.evening.push(
        Recommendation::new(
            "step-1-evening",
            StepKind::Product,
            "Double Cleanse",
            "Oil cleanser followed by gentle cleanser to remove sunscreen and impurities.",
            Medium,
        )
        .at(Evening),
    );

    if scan.has_acne() {
        if dark_skin {
            routine.evening.push(
                Recommendation::new(
                    "step-2-evening",
                    StepKind::Product,
                    "Azelaic Acid Treatment",
                    "Melanin-safe acne treatment that also helps fade dark spots.",
                    High,
                )
                .at(Evening),
            );
            routine.alerts.push(Recommendation::new(
                "alert-melanin-safe",
                StepKind::Warning,
                "Melanin-Safe Protocol Active",
                "Using Azelaic Acid instead of Benzoyl Peroxide to prevent hyperpigmentation.",
                Medium,
            ));
        } else {
            routine.evening.push(
                Recommendation::new(
                    "step-2-evening",
                    StepKind::Product,
                    "Acne Treatment",
                    "Targeted treatment for active breakouts.",
                    High,
                )
                .at(Evening),
            );
        }
    }

    if scan.has_pigmentation() {
        routine.evening.push(
            Recommendation::new(
                "step-3-evening",
                StepKind::Product,
                "Niacinamide Serum",
                "Helps fade dark spots and even skin tone safely.",
                High,
            )
            .at(Evening),
        );
    }

    let retinol_blocked = weather.is_high_uv || profile.hormonal_factors.forbids_retinoids();
    if retinol_blocked {
        let (description, reason) = if weather.is_high_uv {
            (
                "High UV exposure today. Retinol increases sun sensitivity - using alternative treatment.",
                "High UV Index detected",
            )
        } else {
            (
                "Retinoids are avoided during pregnancy or hormonal treatment.",
                "Hormonal factors",
            )
        };
        routine.evening.push(
            Recommendation::new(
                "step-retinol-blocked",
                StepKind::Warning,
                "Retinol Skipped Tonight",
                description,
                Medium,
            )
            .at(Evening)
            .blocked(reason),
        );
    } else {
        routine.evening.push(
            Recommendation::new(
                "step-4-evening",
                StepKind::Product,
                "Retinol Serum",
                "Anti-aging and skin renewal treatment.",
                Medium,
            )
            .at(Evening),
        );
    }

    let (title, description) = if weather.is_dry_weather {
        (
            "Overnight Repair Mask",
            "Intensive overnight hydration for dry conditions.",
        )
    } else {
        (
            "Night Moisturizer",
            "Seal in treatments and hydrate overnight.",
        )
    };
    routine.evening.push(
        Recommendation::new("step-5-evening", StepKind::Product, title, description, Medium)
            .at(Evening),
    );

    routine
}

// ── Medical action items ────────────────────────────────────────────────

/// Action items for a medical finding. Tiering comes from the risk
/// classifier, not from the scan's display flag.
pub fn generate_medical_recommendations(
    scan: &MedicalScan,
    weather: &WeatherState,
) -> Vec<Recommendation> {
    use Priority::*;

    let condition = &scan.condition_match;
    if *condition == MedicalCondition::Normal {
        return vec![Recommendation::new(
            "medical-normal",
            StepKind::Action,
            "Maintain Healthy Skin",
            "Your skin appears healthy! Continue with your regular skincare routine and maintain good sun protection habits.",
            Low,
        )];
    }

    let tier = risk::classify(condition).level;
    if tier == RiskTier::High {
        return vec![Recommendation::new(
            "medical-high-risk",
            StepKind::Alert,
            "Immediate Attention Required",
            "This scan shows indicators that require professional evaluation. Please consult a dermatologist as soon as possible.",
            Critical,
        )];
    }

    let mut items = Vec::new();
    match condition {
        MedicalCondition::AtopicDermatitis | MedicalCondition::Eczema => {
            items.push(Recommendation::new(
                "medical-eczema-1",
                StepKind::Action,
                "Moisturize Frequently",
                "Apply fragrance-free moisturizer multiple times daily, especially after washing.",
                High,
            ));
            items.push(Recommendation::new(
                "medical-eczema-2",
                StepKind::Action,
                "Avoid Hot Showers",
                "Use lukewarm water to prevent further irritation and moisture loss.",
                Medium,
            ));
            if weather.is_dry_weather {
                items.push(Recommendation::new(
                    "medical-eczema-dry",
                    StepKind::Warning,
                    "Dry Weather Warning",
                    "Low humidity can worsen eczema. Consider using a humidifier indoors.",
                    High,
                ));
            }
        }
        MedicalCondition::Psoriasis => {
            items.push(Recommendation::new(
                "medical-psoriasis-1",
                StepKind::Action,
                "Keep Skin Moisturized",
                "Apply thick, fragrance-free moisturizers to affected areas.",
                High,
            ));
            items.push(Recommendation::new(
                "medical-psoriasis-2",
                StepKind::Action,
                "Monitor Triggers",
                "Track stress levels, diet, and weather changes that may cause flares.",
                Medium,
            ));
        }
        MedicalCondition::FungalInfection
        | MedicalCondition::Tinea
        | MedicalCondition::Ringworm
        | MedicalCondition::Candidiasis => {
            items.push(Recommendation::new(
                "medical-fungal-1",
                StepKind::Action,
                "Keep Area Dry",
                "Fungal infections thrive in moisture. Keep the affected area clean and dry.",
                High,
            ));
            items.push(Recommendation::new(
                "medical-fungal-2",
                StepKind::Product,
                "Antifungal Treatment",
                "Consider over-the-counter antifungal cream. If no improvement in 2 weeks, see a doctor.",
                High,
            ));
        }
        MedicalCondition::Hives => {
            items.push(Recommendation::new(
                "medical-hives-1",
                StepKind::Action,
                "Identify Triggers",
                "Note any new foods, medications, or environmental factors.",
                High,
            ));
            items.push(Recommendation::new(
                "medical-hives-2",
                StepKind::Action,
                "Cool Compress",
                "Apply cool, damp cloth to reduce itching and swelling.",
                Medium,
            ));
        }
        _ => {}
    }

    if tier == RiskTier::Medium {
        items.push(Recommendation::new(
            "medical-followup",
            StepKind::Action,
            "Schedule Appointment",
            "Consider scheduling a non-urgent dermatologist appointment if symptoms persist.",
            Medium,
        ));
    }

    items
}
