//! Turn outputs returned by both agent loops.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::rules::routine::{DailyRoutine, EnvironmentalAlert, Recommendation};
use crate::rules::{ActivesDecision, Referral, RiskTier, Urgency};
use crate::scan::{MedicalCondition, ObservationSummary};
use crate::weather::WeatherState;

/// Either a question for the user or a final answer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentTurnOutput<F> {
    Question(QuestionTurn),
    Final(F),
}

impl<F> AgentTurnOutput<F> {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }

    pub fn thought_process(&self) -> &[String]
    where
        F: HasThoughts,
    {
        match self {
            Self::Question(q) => &q.thought_process,
            Self::Final(f) => f.thoughts(),
        }
    }

    /// The user-facing text of either variant.
    pub fn message(&self) -> &str
    where
        F: HasThoughts,
    {
        match self {
            Self::Question(q) => &q.message,
            Self::Final(f) => f.message(),
        }
    }
}

pub type CosmeticTurn = AgentTurnOutput<CosmeticFinal>;
pub type MedicalTurn = AgentTurnOutput<MedicalFinal>;

/// Gives uniform access to the reasoning trail of a final output.
pub trait HasThoughts {
    fn thoughts(&self) -> &[String];
    fn message(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTurn {
    pub message: String,
    pub options: Vec<String>,
    pub thought_process: Vec<String>,
}

/// Product reference returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_id: String,
    pub product_name: String,
}

impl From<&Product> for ProductRef {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.product_id.clone(),
            product_name: p.product_name.clone(),
        }
    }
}

/// One step of the structured decision trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub step: &'static str,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticFinal {
    pub message: String,
    pub routine: DailyRoutine,
    /// Routine-level alerts, mirrored from `routine.alerts`.
    pub alerts: Vec<Recommendation>,
    pub environmental_alerts: Vec<EnvironmentalAlert>,
    pub products: Vec<ProductRef>,
    pub actives: ActivesDecision,
    pub notes: Vec<String>,
    pub trace: Vec<TraceStep>,
    pub skin_score: i32,
    pub observation: ObservationSummary,
    pub weather: WeatherState,
    pub thought_process: Vec<String>,
}

impl HasThoughts for CosmeticFinal {
    fn thoughts(&self) -> &[String] {
        &self.thought_process
    }

    fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalFinal {
    pub message: String,
    pub condition: MedicalCondition,
    pub risk_level: RiskTier,
    pub requires_dermatologist: bool,
    pub urgency: Urgency,
    pub referral: Referral,
    pub tips: Vec<String>,
    pub products: Vec<ProductRef>,
    pub recommendations: Vec<Recommendation>,
    pub thought_process: Vec<String>,
}

impl HasThoughts for MedicalFinal {
    fn thoughts(&self) -> &[String] {
        &self.thought_process
    }

    fn message(&self) -> &str {
        &self.message
    }
}
