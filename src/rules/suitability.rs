//! Ingredient suitability: which actives to recommend or block for a
//! condition, a skin profile and the current weather.
//!
//! The cascade runs in a fixed order (condition base rules, skin-tone
//! override, weather overlays) and each step may override the previous one.
//! Health overrides from the user profile are layered on afterwards by
//! [`apply_health_overrides`].

use serde::{Deserialize, Serialize};

use crate::profile::{Fitzpatrick, SkinType, UserProfile};
use crate::scan::{ConditionFamily, ConditionTag};
use crate::weather::WeatherState;

pub const BENZOYL_PEROXIDE: &str = "benzoyl peroxide";
pub const AZELAIC_ACID: &str = "azelaic acid";
pub const MANDELIC_ACID: &str = "mandelic acid";
pub const RETINOL: &str = "retinol";
pub const RETINOID: &str = "retinoid";

pub const DARK_SKIN_NOTE: &str = "Avoid BP on dark skin to reduce PIH risk; prefer azelaic/mandelic.";
pub const HIGH_UV_NOTE: &str = "High UV: avoid retinoids; ensure daily sunscreen.";
pub const HUMIDITY_NOTE: &str = "High humidity: prefer lightweight gel textures.";
pub const DRY_NOTE: &str = "Dry weather: emphasize barrier support.";
pub const SENSITIVE_DRY_NOTE: &str = "Sensitive + dry: keep acids mild and localized.";
pub const THYROID_NOTE: &str = "Thyroid condition: preferring gentle, hydrating products";
pub const HORMONAL_NOTE: &str = "Hormonal factors: using gentler formulations";

/// The skin attributes the cascade depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkinProfile {
    pub skin_type: SkinType,
    pub fitzpatrick: Fitzpatrick,
}

impl From<&UserProfile> for SkinProfile {
    fn from(profile: &UserProfile) -> Self {
        Self {
            skin_type: profile.skin_type,
            fitzpatrick: profile.fitzpatrick_scale,
        }
    }
}

/// Recommended and blocked ingredients plus the reasoning behind them.
///
/// Both lists are lowercased and deduplicated. A name may appear in both;
/// the catalog matcher penalizes blocked matches harder than it rewards
/// recommended ones, so blocked always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivesDecision {
    pub recommended: Vec<String>,
    pub blocked: Vec<String>,
    pub notes: Vec<String>,
}

impl ActivesDecision {
    fn recommend(&mut self, actives: &[&str]) {
        self.recommended.extend(actives.iter().map(|a| a.to_string()));
    }

    fn block(&mut self, actives: &[&str]) {
        self.blocked.extend(actives.iter().map(|a| a.to_string()));
    }

    fn note(&mut self, note: &str) {
        self.notes.push(note.to_string());
    }

    fn normalize(&mut self) {
        self.recommended = unique_lower(&self.recommended);
        self.blocked = unique_lower(&self.blocked);
    }

    pub fn is_blocked(&self, active: &str) -> bool {
        let active = active.to_lowercase();
        self.blocked.iter().any(|b| *b == active)
    }

    pub fn is_recommended(&self, active: &str) -> bool {
        let active = active.to_lowercase();
        self.recommended.iter().any(|r| *r == active)
    }
}

/// Lowercase, trim, and dedupe keeping first occurrence order.
fn unique_lower(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let v = item.trim().to_lowercase();
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Run the suitability cascade.
pub fn compute_actives(
    condition: ConditionTag,
    skin: SkinProfile,
    weather: &WeatherState,
) -> ActivesDecision {
    let mut d = ActivesDecision::default();
    let oily_or_combo = matches!(skin.skin_type, SkinType::Oily | SkinType::Combination);
    let dry_or_sensitive = matches!(skin.skin_type, SkinType::Dry | SkinType::Sensitive);
    let sensitive = skin.skin_type == SkinType::Sensitive;
    let dark_skin = skin.fitzpatrick.is_dark();

    match condition.family() {
        ConditionFamily::Acne => {
            d.recommend(&["niacinamide"]);
            if oily_or_combo || weather.is_high_humidity {
                d.recommend(&["salicylic acid"]);
            }
            if dry_or_sensitive || weather.is_dry_weather {
                d.recommend(&[AZELAIC_ACID]);
            }

            // Melanin-rich skin: benzoyl peroxide risks bleaching and PIH.
            if dark_skin {
                d.block(&[BENZOYL_PEROXIDE]);
                d.recommend(&[AZELAIC_ACID, MANDELIC_ACID]);
                d.note(DARK_SKIN_NOTE);
            } else if !sensitive {
                d.recommend(&[BENZOYL_PEROXIDE]);
            }
        }
        ConditionFamily::Pigmentation => {
            d.recommend(&[AZELAIC_ACID, "niacinamide", "vitamin c"]);
            if dark_skin {
                d.block(&["hydroquinone"]);
            }
        }
        ConditionFamily::DarkCircles => {
            d.recommend(&["niacinamide", "vitamin c", "caffeine"]);
        }
        ConditionFamily::Maintenance => {
            d.recommend(&["niacinamide", "hyaluronic acid", "ceramides"]);
        }
    }

    if weather.is_high_uv {
        d.block(&[RETINOL, RETINOID]);
        d.note(HIGH_UV_NOTE);
        d.recommend(&["zinc oxide", "titanium dioxide"]);
    }
    if weather.is_high_humidity {
        d.note(HUMIDITY_NOTE);
    }
    if weather.is_dry_weather {
        d.recommend(&["ceramides", "shea butter", "squalane", "urea"]);
        d.note(DRY_NOTE);
        if sensitive {
            d.note(SENSITIVE_DRY_NOTE);
        }
    }

    d.normalize();
    d
}

/// Fold the user's allergies, diseases and hormonal flags into a decision.
///
/// Declared allergens are blocked outright, thyroid conditions bias toward
/// hydrating actives, and pregnancy or hormonal medication strips retinoids.
pub fn apply_health_overrides(decision: &mut ActivesDecision, profile: &UserProfile) {
    let allergens = profile.normalized_allergies();
    if !allergens.is_empty() {
        decision
            .notes
            .push(format!("Blocked allergens: {}", allergens.join(", ")));
        decision.blocked.extend(allergens);
    }

    if profile.has_disease("thyroid") {
        decision.notes.push(THYROID_NOTE.to_string());
        decision
            .recommended
            .extend(["hyaluronic acid".to_string(), "ceramides".to_string()]);
    }

    if profile.hormonal_factors.forbids_retinoids() {
        decision.notes.push(HORMONAL_NOTE.to_string());
        decision.recommended.retain(|r| !r.to_lowercase().contains(RETINOL));
        decision
            .blocked
            .extend([RETINOL.to_string(), RETINOID.to_string()]);
    }

    decision.normalize();
}
