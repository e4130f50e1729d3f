//! Deterministic domain policy: risk triage, ingredient suitability and
//! routine construction.

pub mod risk;
pub mod routine;
pub mod suitability;

pub use risk::{Referral, RiskLevel, RiskTier, Urgency};
pub use suitability::{ActivesDecision, SkinProfile, apply_health_overrides, compute_actives};
