//! Cosmetic agent loop: at most two preference questions, then a routine.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::output::{AgentTurnOutput, CosmeticFinal, CosmeticTurn, ProductRef, QuestionTurn, TraceStep};
use super::phraser::{CosmeticPhrase, PhraseContext};
use super::planner::{AgentKind, Decision, PlannerInput};
use super::session::{ConcernPreference, HistoryEntry, Preferences, SessionState};
use super::{AgentDeps, CANDIDATE_LIMIT, SUITABLE_LIMIT};
use crate::catalog::{FindOptions, filter_suitable, remove_allergens};
use crate::profile::{SkinType, UserProfile};
use crate::rules::routine::{generate_cosmetic_routine, generate_environmental_alerts};
use crate::rules::{ActivesDecision, SkinProfile, apply_health_overrides, compute_actives};
use crate::scan::{CosmeticScan, ObservationSummary};
use crate::weather::{Location, WeatherState};

/// Predicted age must exceed the stated age by this many years.
const AGING_DELTA_YEARS: i64 = 3;

/// Product cap once anti-aging stand-ins are injected.
const MAX_PRODUCTS_WITH_AGING: usize = 5;

const ANTI_AGING_STAND_INS: [&str; 4] = [
    "Retinol Night Serum",
    "Peptide Moisturizer",
    "Vitamin C Brightening Serum",
    "SPF 50 Sunscreen",
];

const AGING_NOTE: &str =
    "Signs of aging detected: prioritizing retinol/peptides and daily sunscreen.";

const T_ZONE_NOTE: &str = "T-zone congestion detected: recommend localized salicylic acid application only on T-zone.";

/// One cosmetic turn. The client resends the full history every time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticTurnInput {
    pub user_id: String,
    pub scan: CosmeticScan,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub weather: Option<WeatherState>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub predicted_age: Option<f64>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

pub struct CosmeticAgent {
    deps: AgentDeps,
}

impl CosmeticAgent {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    /// Run one turn. Always returns an output; collaborator failures are
    /// logged and replaced by deterministic fallbacks.
    pub async fn run(&self, input: CosmeticTurnInput) -> CosmeticTurn {
        info!(
            user_id = %input.user_id,
            history_len = input.history.len(),
            conditions = ?input.scan.condition_labels(),
            "Cosmetic turn started"
        );

        let session = SessionState::from_history(&input.history);
        let profile = input.user_profile.clone().unwrap_or_default();
        let skin = SkinProfile::from(&profile);
        let observation = ObservationSummary::from_scan(&input.scan);

        let mut thoughts = vec!["Analyzing scan results and your preferences...".to_string()];
        thoughts.extend(health_thoughts(&profile));

        let mut weather = match (input.weather, input.location) {
            (Some(weather), _) => weather,
            (None, Some(location)) => match self.deps.fetch_weather(location).await {
                Ok(weather) => {
                    thoughts.push("Checked environmental factors (UV, humidity).".to_string());
                    weather
                }
                Err(e) => {
                    warn!(user_id = %input.user_id, error = %e, "Weather lookup failed, using neutral weather");
                    WeatherState::neutral()
                }
            },
            (None, None) => WeatherState::neutral(),
        };

        let mut baseline = compute_actives(input.scan.primary_condition(), skin, &weather);
        apply_health_overrides(&mut baseline, &profile);

        let planner_input = PlannerInput {
            kind: AgentKind::Cosmetic,
            scan_summary: scan_summary(&input.scan, &observation),
            history: input.history.clone(),
            known_info: known_info(&profile, &weather, &baseline),
        };

        if session.just_received_answer {
            thoughts.push("Received your answer. Reasoning about your preferences...".to_string());
        }
        let plan = self.deps.planner.plan(&planner_input, &session).await;
        if session.just_received_answer {
            thoughts.push(format!("Reasoning: {}", plan.reason));
        } else {
            thoughts.push(format!("Decision: {}", plan.reason));
        }
        if let Some(guard) = plan.overridden {
            thoughts.push(guard.thought(AgentKind::Cosmetic).to_string());
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
                weather = self
                    .check_weather(input.location, weather, &mut thoughts)
                    .await;
            }
            Decision::SearchKnowledge { .. } | Decision::Finalize => {}
        }

        AgentTurnOutput::Final(
            self.finalize(&input, &session, &profile, weather, observation, thoughts)
                .await,
        )
    }

    async fn check_weather(
        &self,
        location: Option<Location>,
        current: WeatherState,
        thoughts: &mut Vec<String>,
    ) -> WeatherState {
        let Some(location) = location else {
            thoughts.push(format!(
                "Environmental factors: {}",
                weather_notes(&current).join(", ")
            ));
            return current;
        };

        match self.deps.fetch_weather(location).await {
            Ok(fresh) => {
                thoughts.push(format!(
                    "Checked environmental factors: {}",
                    weather_notes(&fresh).join(", ")
                ));
                fresh
            }
            Err(e) => {
                warn!(error = %e, "Weather re-check failed, keeping current snapshot");
                thoughts.push("Checked environmental factors (using default values).".to_string());
                current
            }
        }
    }

    async fn finalize(
        &self,
        input: &CosmeticTurnInput,
        session: &SessionState,
        profile: &UserProfile,
        weather: WeatherState,
        observation: ObservationSummary,
        mut thoughts: Vec<String>,
    ) -> CosmeticFinal {
        let scan = &input.scan;
        let prefs = Preferences::from_history(&input.history);
        let concern = ConcernPreference::resolve(prefs.concern, scan.primary_condition());
        let skin = SkinProfile::from(profile);
        let mut trace = Vec::new();

        // Recomputed from scratch so answers and fresh weather both apply.
        let mut decision = compute_actives(concern, skin, &weather);
        apply_health_overrides(&mut decision, profile);
        if observation.t_zone_dominant()
            && matches!(skin.skin_type, SkinType::Dry | SkinType::Sensitive)
        {
            decision.notes.push(T_ZONE_NOTE.to_string());
        }
        trace.push(TraceStep {
            step: "propose_actives",
            detail: json!({
                "concern": concern.label(),
                "recommended": decision.recommended,
                "blocked": decision.blocked,
            }),
        });

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
        trace.push(TraceStep {
            step: "find_products",
            detail: json!({ "count": candidates.len() }),
        });

        let allergens = profile.normalized_allergies();
        if !allergens.is_empty() {
            thoughts.push(format!(
                "Filtered out products containing allergens: {}",
                allergens.join(", ")
            ));
        }
        let safe = remove_allergens(candidates, &allergens);

        let limit = prefs.complexity.product_limit();
        let suitable = filter_suitable(&safe, &decision, SUITABLE_LIMIT.max(limit));
        trace.push(TraceStep {
            step: "evaluate_suitability",
            detail: json!({
                "chosen": suitable
                    .iter()
                    .take(3)
                    .map(|s| s.product.product_name.as_str())
                    .collect::<Vec<_>>(),
            }),
        });

        if let Some(note) = prefs.complexity.note() {
            decision.notes.push(note.to_string());
        }
        let mut products: Vec<ProductRef> = suitable
            .iter()
            .take(limit)
            .map(|s| ProductRef::from(&s.product))
            .collect();

        if let Some(predicted_age) = input.predicted_age
            && profile.age > 0
        {
            let delta = (predicted_age - f64::from(profile.age)).round() as i64;
            let is_aging = delta >= AGING_DELTA_YEARS;
            trace.push(TraceStep {
                step: "aging_check",
                detail: json!({
                    "predictedAge": predicted_age,
                    "userAge": profile.age,
                    "delta": delta,
                    "isAging": is_aging,
                }),
            });
            if is_aging {
                inject_anti_aging(&mut products, &decision);
                decision.notes.push(AGING_NOTE.to_string());
            }
        }

        let routine = generate_cosmetic_routine(scan, &weather, profile);
        let skin_score = skin_health_score(scan, &weather);

        let context = PhraseContext::Cosmetic(CosmeticPhrase {
            detected_conditions: scan
                .condition_labels()
                .into_iter()
                .map(str::to_string)
                .collect(),
            primary_concern: concern.label().to_string(),
            skin_score,
            complexity: prefs.complexity,
            top_products: products.iter().map(|p| p.product_name.clone()).collect(),
            history: input.history.clone(),
            thought_process: thoughts.clone(),
            last_question: session.last_question.clone(),
            last_answer: session.last_answer.clone(),
        });
        let message = self.deps.phrase(&context).await;

        info!(
            user_id = %input.user_id,
            products = products.len(),
            skin_score,
            "Cosmetic turn finalized"
        );

        CosmeticFinal {
            message,
            alerts: routine.alerts.clone(),
            environmental_alerts: generate_environmental_alerts(&weather),
            routine,
            products,
            notes: decision.notes.clone(),
            actives: decision,
            trace,
            skin_score,
            observation,
            weather,
            thought_process: thoughts,
        }
    }
}

/// Skin health score in [0,100]. Strictly decreasing in severity until the
/// clamp is reached.
pub fn skin_health_score(scan: &CosmeticScan, weather: &WeatherState) -> i32 {
    let mut score = 85 - (40.0 * scan.severity()).round() as i32;

    if scan.has_acne_or_pigmentation() {
        score -= 10;
    } else if scan.is_dark_circles_only() {
        score -= 5;
    }

    if weather.is_high_uv {
        score -= 8;
    }
    if weather.is_high_humidity {
        score -= 5;
    }
    if weather.is_dry_weather {
        score -= 4;
    }

    score.clamp(0, 100)
}

fn health_thoughts(profile: &UserProfile) -> Vec<String> {
    let mut thoughts = Vec::new();

    let allergies = profile.normalized_allergies();
    if !allergies.is_empty() {
        thoughts.push(format!(
            "Noting allergies: {} - avoiding these in recommendations",
            allergies.join(", ")
        ));
    }
    if !profile.diseases.is_empty() {
        thoughts.push(format!(
            "Considering medical conditions: {} - adjusting recommendations accordingly",
            profile.diseases.join(", ")
        ));
    }
    if profile.has_disease("thyroid") {
        thoughts.push(
            "Thyroid condition detected - considering potential skin sensitivity and dryness"
                .to_string(),
        );
    }
    let hormonal = profile.hormonal_factors.active_labels();
    if !hormonal.is_empty() {
        thoughts.push(format!(
            "Considering hormonal factors: {} - may affect skin sensitivity and product recommendations",
            hormonal.join(", ")
        ));
    }

    thoughts
}

fn weather_notes(weather: &WeatherState) -> Vec<String> {
    let mut notes = Vec::new();
    if weather.is_high_uv {
        notes.push(format!(
            "High UV ({}) - avoiding retinol, emphasizing sunscreen",
            weather.uv_index
        ));
    }
    if weather.is_dry_weather {
        notes.push(format!(
            "Dry weather ({}% humidity) - emphasizing hydration",
            weather.humidity
        ));
    }
    if weather.is_high_humidity {
        notes.push(format!(
            "High humidity ({}%) - using lighter products",
            weather.humidity
        ));
    }
    if notes.is_empty() {
        notes.push(format!(
            "Normal conditions (UV: {}, Humidity: {}%)",
            weather.uv_index, weather.humidity
        ));
    }
    notes
}

fn weather_label(weather: &WeatherState) -> &'static str {
    if weather.is_high_uv {
        "high UV"
    } else if weather.is_dry_weather {
        "dry"
    } else if weather.is_high_humidity {
        "humid"
    } else {
        "normal"
    }
}

fn scan_summary(scan: &CosmeticScan, observation: &ObservationSummary) -> serde_json::Value {
    json!({
        "detectedConditions": scan.condition_labels(),
        "totalDetections": observation.total,
        "severity": scan.severity(),
        "severityTier": observation.severity_tier,
        "tZoneCount": observation.t_zone_count,
        "uZoneCount": observation.u_zone_count,
    })
}

fn known_info(
    profile: &UserProfile,
    weather: &WeatherState,
    baseline: &ActivesDecision,
) -> serde_json::Value {
    json!({
        "skinType": profile.skin_type.label(),
        "fitzpatrick": profile.fitzpatrick_scale.value(),
        "weather": weather_label(weather),
        "uvIndex": weather.uv_index,
        "isHighUV": weather.is_high_uv,
        "isDryWeather": weather.is_dry_weather,
        "isHighHumidity": weather.is_high_humidity,
        "recommendedActives": baseline.recommended,
        "blockedActives": baseline.blocked,
        "hasRetinol": baseline.is_recommended("retinol"),
        "hasSalicylicAcid": baseline.is_recommended("salicylic acid"),
        "hasBenzoylPeroxide": baseline.is_recommended("benzoyl peroxide"),
        "isDarkSkin": profile.fitzpatrick_scale.is_dark(),
        "isSensitive": profile.skin_type == SkinType::Sensitive,
        "allergies": profile.normalized_allergies(),
        "hormonalFactors": profile.hormonal_factors.active_labels(),
    })
}

/// Append anti-aging stand-ins that are neither already listed nor built
/// on a blocked active.
fn inject_anti_aging(products: &mut Vec<ProductRef>, decision: &ActivesDecision) {
    let existing: HashSet<String> = products
        .iter()
        .map(|p| p.product_name.to_lowercase())
        .collect();

    let injected: Vec<ProductRef> = ANTI_AGING_STAND_INS
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            let lower = name.to_lowercase();
            !existing.contains(&lower) && !decision.blocked.iter().any(|b| lower.contains(b.as_str()))
        })
        .map(|(idx, name)| ProductRef {
            product_id: format!("anti-aging-{idx}"),
            product_name: name.to_string(),
        })
        .collect();

    if !injected.is_empty() {
        products.extend(injected);
        products.truncate(MAX_PRODUCTS_WITH_AGING);
    }
}
