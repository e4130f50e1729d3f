//! End-to-end agent scenarios against in-memory collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use dermaid::agents::planner::{PlanProposal, PlannerInput};
use dermaid::agents::{
    AgentDeps, AgentTurnOutput, CosmeticAgent, CosmeticTurnInput, HistoryEntry, MedicalAgent,
    MedicalTurnInput, OfflinePlanner, PlannerPort, TemplatePhraser,
};
use dermaid::catalog::{CatalogMatcher, InMemoryCatalog, Product};
use dermaid::config::AgentConfig;
use dermaid::error::{LlmError, WeatherError};
use dermaid::profile::{Fitzpatrick, UserProfile};
use dermaid::rules::Urgency;
use dermaid::scan::{CosmeticCondition, CosmeticScan, MedicalCondition, MedicalScan};
use dermaid::scan::cosmetic::SeverityTier;
use dermaid::weather::{Location, WeatherProvider, WeatherState};

// ── Test doubles ────────────────────────────────────────────────────────

struct StaticWeather(WeatherState);

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self, _location: Location) -> Result<WeatherState, WeatherError> {
        Ok(self.0)
    }
}

/// Proposes the scripted questions in order, then finalizes. Counts calls.
struct ScriptedPlanner {
    questions: Vec<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedPlanner {
    fn new(questions: Vec<&'static str>) -> Self {
        Self {
            questions,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlannerPort for ScriptedPlanner {
    async fn propose(&self, input: &PlannerInput) -> Result<PlanProposal, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let asked = input
            .history
            .iter()
            .filter(|e| e.role == dermaid::agents::Speaker::Agent)
            .count();
        Ok(match self.questions.get(asked) {
            Some(question) => PlanProposal::ask(
                *question,
                vec!["Acne".into(), "Dark circles".into(), "Both".into()],
                "Need to know what matters most to you.",
            ),
            None => PlanProposal::finalize("Enough information to build the routine."),
        })
    }
}

fn acne_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(vec![
        Product::new("p1", "Clarifying Gel", &["water", "salicylic acid", "niacinamide"]),
        Product::new("p2", "Blemish Serum", &["niacinamide", "zinc pca"]),
        Product::new("p3", "Daily Spot Fluid", &["salicylic acid", "hyaluronic acid"]),
        Product::new("p4", "Barrier Cream", &["niacinamide", "ceramides"]),
        Product::new("p5", "Azelaic Night Gel", &["azelaic acid", "niacinamide"]),
        Product::new("p6", "Fragrant Toner", &["niacinamide", "fragrance"]),
    ])
}

fn deps(planner: Arc<dyn PlannerPort>, weather: WeatherState) -> AgentDeps {
    AgentDeps::new(
        planner,
        Arc::new(TemplatePhraser),
        Arc::new(StaticWeather(weather)),
        CatalogMatcher::new(Arc::new(acne_catalog())),
        AgentConfig::default(),
    )
}

fn cosmetic_input(scan: CosmeticScan, history: Vec<HistoryEntry>) -> CosmeticTurnInput {
    CosmeticTurnInput {
        user_id: "scenario-user".into(),
        scan,
        location: None,
        weather: None,
        user_profile: None,
        predicted_age: None,
        history,
    }
}

fn scan(conditions: Vec<CosmeticCondition>, severity: f64, total: u32) -> CosmeticScan {
    CosmeticScan {
        detected_conditions: conditions,
        severity_score: severity,
        confidence: 0.9,
        raw_detections: Default::default(),
        total_detections: Some(total),
    }
}

// ── Scenarios ───────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_dark_skin_inflammatory_acne_under_high_uv() {
    let high_uv = WeatherState::from_readings(9.0, 50.0, 28.0);
    let agent = CosmeticAgent::new(deps(Arc::new(OfflinePlanner), high_uv));

    let mut input = cosmetic_input(scan(vec![CosmeticCondition::InflammatoryAcne], 0.6, 12), vec![]);
    input.weather = Some(high_uv);
    input.user_profile = Some(UserProfile {
        id: "scenario-user".into(),
        fitzpatrick_scale: Fitzpatrick::new(5).unwrap(),
        ..Default::default()
    });

    let output = agent.run(input).await;
    let result = match output {
        AgentTurnOutput::Final(turn) => turn,
        other => panic!("Expected final output, got {:?}", other),
    };

    assert!(result.actives.is_blocked("benzoyl peroxide"));
    assert!(result.actives.is_blocked("retinol"));
    assert!(result.actives.is_recommended("azelaic acid"));
    assert!(result.actives.is_recommended("mandelic acid"));
    assert_eq!(result.observation.severity_tier, SeverityTier::Protocol);
    assert!(result.skin_score <= 45, "score was {}", result.skin_score);
    assert!(
        result
            .alerts
            .iter()
            .any(|a| a.title == "Melanin-Safe Protocol Active")
    );
}

#[tokio::test]
async fn scenario_clear_skin() {
    let agent = CosmeticAgent::new(deps(Arc::new(OfflinePlanner), WeatherState::neutral()));

    let output = agent.run(cosmetic_input(scan(vec![], 0.1, 0), vec![])).await;
    let result = match output {
        AgentTurnOutput::Final(turn) => turn,
        other => panic!("Expected final output, got {:?}", other),
    };

    assert!(result.skin_score >= 80, "score was {}", result.skin_score);
    assert!(result.routine.steps().all(|s| s.id != "step-2-evening"));
    assert!(result.routine.steps().all(|s| !s.is_blocked));
}

#[tokio::test]
async fn scenario_melanoma_refers_without_planning() {
    let planner = Arc::new(ScriptedPlanner::new(vec!["How long has it been there?"]));
    let agent = MedicalAgent::new(deps(planner.clone(), WeatherState::neutral()));

    let output = agent
        .run(MedicalTurnInput {
            user_id: "scenario-user".into(),
            scan: MedicalScan::new(MedicalCondition::from_name("melanoma")),
            location: None,
            weather: None,
            user_profile: None,
            history: vec![],
        })
        .await;

    let result = match output {
        AgentTurnOutput::Final(turn) => turn,
        other => panic!("Expected final output, got {:?}", other),
    };
    assert_eq!(result.urgency, Urgency::Critical);
    assert!(result.requires_dermatologist);
    assert_eq!(planner.calls(), 0);
}

#[tokio::test]
async fn scenario_two_turn_quick_acne_routine() {
    let question = "What's your primary concern right now?";
    let planner = Arc::new(ScriptedPlanner::new(vec![question]));
    let agent = CosmeticAgent::new(deps(planner.clone(), WeatherState::neutral()));
    let acne = || scan(vec![CosmeticCondition::AcneVulgaris], 0.4, 5);

    let first = agent.run(cosmetic_input(acne(), vec![])).await;
    let asked = match first {
        AgentTurnOutput::Question(turn) => turn,
        other => panic!("Expected question, got {:?}", other),
    };
    assert_eq!(asked.message, question);
    assert_eq!(asked.options, vec!["Acne", "Dark circles", "Both"]);

    let history = vec![
        HistoryEntry::agent(asked.message),
        HistoryEntry::user("Acne, and something quick please"),
    ];
    let second = agent.run(cosmetic_input(acne(), history)).await;
    let result = match second {
        AgentTurnOutput::Final(turn) => turn,
        other => panic!("Expected final output, got {:?}", other),
    };

    assert_eq!(result.products.len(), 3);
    assert!(result.notes.iter().any(|n| n.contains("Simple routine")));
    assert_eq!(planner.calls(), 2);
}

#[tokio::test]
async fn question_budget_forces_finalize_on_third_turn() {
    let planner = Arc::new(ScriptedPlanner::new(vec![
        "What's your primary concern right now?",
        "How much time do you spend on skincare?",
        "Do you wear sunscreen daily?",
    ]));
    let agent = CosmeticAgent::new(deps(planner, WeatherState::neutral()));
    let acne = || scan(vec![CosmeticCondition::AcneVulgaris], 0.3, 2);

    let mut history = Vec::new();
    for answer in ["Acne", "About 10 minutes"] {
        let output = agent.run(cosmetic_input(acne(), history.clone())).await;
        let asked = match output {
            AgentTurnOutput::Question(turn) => turn,
            other => panic!("Expected question, got {:?}", other),
        };
        history.push(HistoryEntry::agent(asked.message));
        history.push(HistoryEntry::user(answer));
    }

    let third = agent.run(cosmetic_input(acne(), history)).await;
    assert!(third.is_final());
}
