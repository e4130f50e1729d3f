//! Phraser port: turns a finished decision into the user-facing message.

use async_trait::async_trait;
use serde::Serialize;

use super::session::{HistoryEntry, RoutineComplexity};
use crate::error::LlmError;
use crate::rules::{Referral, RiskTier};

/// Inputs for phrasing a cosmetic routine.
#[derive(Debug, Clone, Serialize)]
pub struct CosmeticPhrase {
    pub detected_conditions: Vec<String>,
    pub primary_concern: String,
    pub skin_score: i32,
    pub complexity: RoutineComplexity,
    pub top_products: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub thought_process: Vec<String>,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
}

/// Inputs for phrasing a medical assessment.
#[derive(Debug, Clone, Serialize)]
pub struct MedicalPhrase {
    pub condition: String,
    pub risk_level: RiskTier,
    pub requires_dermatologist: bool,
    pub referral: Referral,
    pub history: Vec<HistoryEntry>,
    pub thought_process: Vec<String>,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum PhraseContext {
    Cosmetic(CosmeticPhrase),
    Medical(MedicalPhrase),
}

/// Produces the final user-facing message.
#[async_trait]
pub trait PhraserPort: Send + Sync {
    async fn phrase(&self, context: &PhraseContext) -> Result<String, LlmError>;
}

/// Deterministic phrasing. Also the fallback when the model phraser fails.
pub struct TemplatePhraser;

impl TemplatePhraser {
    pub fn render(context: &PhraseContext) -> String {
        match context {
            PhraseContext::Cosmetic(c) => {
                if c.detected_conditions.is_empty() {
                    "I've created a personalized routine for you based on your scan results."
                        .to_string()
                } else {
                    let conditions: Vec<String> = c
                        .detected_conditions
                        .iter()
                        .map(|d| d.replace('_', " "))
                        .collect();
                    format!(
                        "Based on your scan showing {}, I've created a personalized routine for you.",
                        conditions.join(", ")
                    )
                }
            }
            PhraseContext::Medical(m) => {
                let condition = m.condition.replace('_', " ");
                if m.requires_dermatologist {
                    format!(
                        "Based on your scan showing {condition}, I recommend consulting a dermatologist."
                    )
                } else {
                    format!("Based on your scan showing {condition}, here are some recommendations.")
                }
            }
        }
    }
}

#[async_trait]
impl PhraserPort for TemplatePhraser {
    async fn phrase(&self, context: &PhraseContext) -> Result<String, LlmError> {
        Ok(Self::render(context))
    }
}
