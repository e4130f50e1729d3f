//! Medical agent loop. High-risk findings short-circuit to a referral before
//! any planning happens.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::output::{AgentTurnOutput, MedicalFinal, MedicalTurn, ProductRef, QuestionTurn};
use super::phraser::{MedicalPhrase, PhraseContext};
use super::planner::{AgentKind, Decision, PlannerInput};
use super::session::{HistoryEntry, SessionState};
use super::{AgentDeps, CANDIDATE_LIMIT, SUITABLE_LIMIT};
use crate::catalog::{FindOptions, filter_suitable, remove_allergens};
use crate::profile::UserProfile;
use crate::rules::risk::{self, RiskLevel, RiskTier};
use crate::rules::routine::generate_medical_recommendations;
use crate::rules::{SkinProfile, apply_health_overrides, compute_actives};
use crate::scan::MedicalScan;
use crate::weather::{Location, WeatherState};

const HIGH_RISK_THOUGHT: &str = "Detected high-risk condition. Immediate referral required.";

/// One medical turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalTurnInput {
    pub user_id: String,
    pub scan: MedicalScan,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub weather: Option<WeatherState>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

pub struct MedicalAgent {
    deps: AgentDeps,
}

impl MedicalAgent {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, input: MedicalTurnInput) -> MedicalTurn {
        let condition = &input.scan.condition_match;
        let risk = risk::classify(condition);
        info!(
            user_id = %input.user_id,
            condition = %condition,
            risk = risk.level.as_str(),
            "Medical turn started"
        );

        if risk.level == RiskTier::High {
            info!(user_id = %input.user_id, condition = %condition, "High-risk finding, referring immediately");
            return AgentTurnOutput::Final(high_risk_output(&input, &risk));
        }

        let session = SessionState::from_history(&input.history);
        let mut weather = input.weather;
        let mut thoughts = vec!["Analyzing scan results and history...".to_string()];

        let planner_input = PlannerInput {
            kind: AgentKind::Medical,
            scan_summary: json!(format!("{} (Risk: {})", condition, risk.level.as_str())),
            history: input.history.clone(),
            known_info: json!({
                "weather": weather
                    .map(|w| format!("Humidity: {}%, UV: {}", w.humidity, w.uv_index))
                    .unwrap_or_else(|| "Unknown".to_string()),
                "user": input
                    .user_profile
                    .as_ref()
                    .map(|p| format!("{}, Fitzpatrick {}", p.skin_type, p.fitzpatrick_scale.value()))
                    .unwrap_or_else(|| "Unknown".to_string()),
            }),
        };

        if session.just_received_answer {
            thoughts.push("Received your answer. Reasoning about your response...".to_string());
        }
        let plan = self.deps.planner.plan(&planner_input, &session).await;
        if session.just_received_answer {
            thoughts.push(format!("Reasoning: {}", plan.reason));
        } else {
            thoughts.push(format!("Decision: {}", plan.reason));
        }
        if let Some(guard) = plan.overridden {
            thoughts.push(guard.thought(AgentKind::Medical).to_string());
        }

        match plan.decision {
            Decision::Ask { question, options } => {
                info!(user_id = %input.user_id, question = %question, "Asking user");
                return AgentTurnOutput::Question(QuestionTurn {
                    message: question,
                    options,
                    thought_process: thoughts,
                });
            }
            Decision::CheckWeather => {
                if let Some(location) = input.location {
                    match self.deps.fetch_weather(location).await {
                        Ok(fresh) => weather = Some(fresh),
                        Err(e) => warn!(error = %e, "Weather lookup failed, keeping current snapshot"),
                    }
                }
                thoughts.push("Checked environmental factors.".to_string());
            }
            Decision::SearchKnowledge { query } => {
                let query = if query.trim().is_empty() {
                    condition.display_name()
                } else {
                    query
                };
                thoughts.push(format!("Searching medical knowledge for: {query}"));
            }
            Decision::Finalize => {}
        }

        let weather = weather.unwrap_or_default();
        AgentTurnOutput::Final(
            self.finalize(&input, &session, &risk, weather, thoughts)
                .await,
        )
    }

    async fn finalize(
        &self,
        input: &MedicalTurnInput,
        session: &SessionState,
        risk: &RiskLevel,
        weather: WeatherState,
        thoughts: Vec<String>,
    ) -> MedicalFinal {
        let condition = &input.scan.condition_match;
        let profile = input.user_profile.clone().unwrap_or_default();

        let mut decision = compute_actives(
            condition.skincare_equivalent(),
            SkinProfile::from(&profile),
            &weather,
        );
        apply_health_overrides(&mut decision, &profile);

        let candidates = match self
            .deps
            .catalog
            .find_candidates(&decision.recommended, FindOptions::limit(CANDIDATE_LIMIT))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(user_id = %input.user_id, error = %e, "Catalog lookup failed, continuing without products");
                Vec::new()
            }
        };
        let safe = remove_allergens(candidates, &profile.normalized_allergies());
        let products: Vec<ProductRef> = filter_suitable(&safe, &decision, SUITABLE_LIMIT)
            .iter()
            .map(|s| ProductRef::from(&s.product))
            .collect();

        let context = PhraseContext::Medical(MedicalPhrase {
            condition: condition.as_str().to_string(),
            risk_level: risk.level,
            requires_dermatologist: risk.requires_dermatologist,
            referral: risk.urgency.referral(),
            history: input.history.clone(),
            thought_process: thoughts.clone(),
            last_question: session.last_question.clone(),
            last_answer: session.last_answer.clone(),
        });
        let message = self.deps.phrase(&context).await;

        info!(
            user_id = %input.user_id,
            condition = %condition,
            products = products.len(),
            "Medical turn finalized"
        );

        MedicalFinal {
            message,
            condition: condition.clone(),
            risk_level: risk.level,
            requires_dermatologist: risk.requires_dermatologist,
            urgency: risk.urgency,
            referral: risk.urgency.referral(),
            tips: risk::tips(condition),
            products,
            recommendations: generate_medical_recommendations(&input.scan, &weather),
            thought_process: thoughts,
        }
    }
}

fn high_risk_output(input: &MedicalTurnInput, risk: &RiskLevel) -> MedicalFinal {
    let condition = &input.scan.condition_match;
    let weather = input.weather.unwrap_or_default();
    MedicalFinal {
        message: risk.message.to_string(),
        condition: condition.clone(),
        risk_level: risk.level,
        requires_dermatologist: true,
        urgency: risk.urgency,
        referral: risk.urgency.referral(),
        tips: risk::tips(condition),
        products: Vec::new(),
        recommendations: generate_medical_recommendations(&input.scan, &weather),
        thought_process: vec![HIGH_RISK_THOUGHT.to_string()],
    }
}
