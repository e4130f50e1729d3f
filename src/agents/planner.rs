//! Planner port and the guards that keep its proposals in bounds.
//!
//! The planner only proposes. Budget, repeat and timeout rules are applied
//! here, so a misbehaving model can never keep a conversation open forever.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::session::{HistoryEntry, SessionState};
use crate::error::LlmError;

/// Which loop is asking for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Cosmetic,
    Medical,
}

impl AgentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cosmetic => "cosmetic",
            Self::Medical => "medical",
        }
    }

    pub fn allows(&self, action: PlanAction) -> bool {
        match self {
            Self::Cosmetic => !matches!(action, PlanAction::SearchKnowledge),
            Self::Medical => !matches!(action, PlanAction::SearchProducts),
        }
    }

    pub fn default_question(&self) -> &'static str {
        match self {
            Self::Cosmetic => "Could you tell me more about your skincare preferences?",
            Self::Medical => "Could you tell me more about your symptoms?",
        }
    }

    /// Reason used when the planner fails or returns nothing usable.
    pub fn fallback_reason(&self) -> &'static str {
        match self {
            Self::Cosmetic => {
                "Analyzing your scan results and preferences to create the best routine for you."
            }
            Self::Medical => "Reviewing your scan results to prepare recommendations.",
        }
    }

    fn budget_thought(&self) -> &'static str {
        match self {
            Self::Cosmetic => "Gathered enough information. Finalizing routine...",
            Self::Medical => "Gathered enough information. Finalizing diagnosis...",
        }
    }
}

/// Actions a planner may propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    AskUser,
    CheckWeather,
    SearchProducts,
    SearchKnowledge,
    Finalize,
}

impl PlanAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AskUser => "ask_user",
            Self::CheckWeather => "check_weather",
            Self::SearchProducts => "search_products",
            Self::SearchKnowledge => "search_knowledge",
            Self::Finalize => "finalize",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "ask_user" => Some(Self::AskUser),
            "check_weather" => Some(Self::CheckWeather),
            "search_products" => Some(Self::SearchProducts),
            "search_knowledge" => Some(Self::SearchKnowledge),
            "finalize" => Some(Self::Finalize),
            _ => None,
        }
    }
}

/// A planner's raw proposal for the next step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanProposal {
    pub action: PlanAction,
    pub reason: String,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub query: Option<String>,
}

impl PlanProposal {
    pub fn finalize(reason: impl Into<String>) -> Self {
        Self {
            action: PlanAction::Finalize,
            reason: reason.into(),
            question: None,
            options: None,
            query: None,
        }
    }

    pub fn ask(question: impl Into<String>, options: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            action: PlanAction::AskUser,
            reason: reason.into(),
            question: Some(question.into()),
            options: Some(options),
            query: None,
        }
    }
}

/// Everything a planner sees.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerInput {
    pub kind: AgentKind,
    pub scan_summary: serde_json::Value,
    pub history: Vec<HistoryEntry>,
    pub known_info: serde_json::Value,
}

/// Proposes the next step of an agent loop.
#[async_trait]
pub trait PlannerPort: Send + Sync {
    async fn propose(&self, input: &PlannerInput) -> Result<PlanProposal, LlmError>;
}

/// Used when no language model is configured: always finalize.
pub struct OfflinePlanner;

#[async_trait]
impl PlannerPort for OfflinePlanner {
    async fn propose(&self, _input: &PlannerInput) -> Result<PlanProposal, LlmError> {
        Ok(PlanProposal::finalize(
            "No language model configured, skipping reasoning.",
        ))
    }
}

/// What the loop does next, after the guards.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Ask {
        question: String,
        options: Vec<String>,
    },
    CheckWeather,
    SearchKnowledge {
        query: String,
    },
    Finalize,
}

/// Why a proposal was replaced by a finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOverride {
    RepeatedQuestion,
    BudgetExhausted,
}

impl GuardOverride {
    pub fn thought(&self, kind: AgentKind) -> &'static str {
        match self {
            Self::RepeatedQuestion => {
                "Already asked this question. Finalizing based on your previous answer..."
            }
            Self::BudgetExhausted => kind.budget_thought(),
        }
    }
}

/// A guarded plan: the decision plus the planner's stated reason.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedPlan {
    pub decision: Decision,
    pub reason: String,
    pub overridden: Option<GuardOverride>,
}

/// Apply the question budget and repeat rules to a proposal.
pub fn apply_guards(
    kind: AgentKind,
    proposal: PlanProposal,
    session: &SessionState,
    budget: usize,
) -> GuardedPlan {
    let reason = if proposal.reason.trim().is_empty() {
        kind.fallback_reason().to_string()
    } else {
        proposal.reason
    };
    let finalize = |overridden| GuardedPlan {
        decision: Decision::Finalize,
        reason: reason.clone(),
        overridden,
    };

    let decision = match proposal.action {
        PlanAction::AskUser => {
            let question = proposal
                .question
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| kind.default_question().to_string());

            if session.repeats_last_question(&question) {
                return finalize(Some(GuardOverride::RepeatedQuestion));
            }
            if session.questions_asked >= budget {
                return finalize(Some(GuardOverride::BudgetExhausted));
            }

            let options = proposal
                .options
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]);
            Decision::Ask { question, options }
        }
        PlanAction::CheckWeather => Decision::CheckWeather,
        PlanAction::SearchKnowledge if kind == AgentKind::Medical => Decision::SearchKnowledge {
            query: proposal.query.unwrap_or_default(),
        },
        // Product search happens during finalization anyway.
        PlanAction::SearchProducts | PlanAction::SearchKnowledge | PlanAction::Finalize => {
            Decision::Finalize
        }
    };

    GuardedPlan {
        decision,
        reason,
        overridden: None,
    }
}

/// A planner wrapped with a deadline and the conversation guards.
#[derive(Clone)]
pub struct GuardedPlanner {
    inner: Arc<dyn PlannerPort>,
    timeout: Duration,
    budget: usize,
}

impl GuardedPlanner {
    pub fn new(inner: Arc<dyn PlannerPort>, timeout: Duration, budget: usize) -> Self {
        Self {
            inner,
            timeout,
            budget,
        }
    }

    /// Ask the planner and apply the guards. Never fails: errors and
    /// timeouts become a finalize with the fallback reason.
    pub async fn plan(&self, input: &PlannerInput, session: &SessionState) -> GuardedPlan {
        let proposal = match tokio::time::timeout(self.timeout, self.inner.propose(input)).await {
            Ok(Ok(proposal)) => proposal,
            Ok(Err(e)) => {
                warn!(kind = input.kind.label(), error = %e, "Planner failed, finalizing");
                PlanProposal::finalize(input.kind.fallback_reason())
            }
            Err(_) => {
                warn!(
                    kind = input.kind.label(),
                    timeout = ?self.timeout,
                    "Planner timed out, finalizing"
                );
                PlanProposal::finalize(input.kind.fallback_reason())
            }
        };

        debug!(
            kind = input.kind.label(),
            action = proposal.action.label(),
            "Planner proposal"
        );
        apply_guards(input.kind, proposal, session, self.budget)
    }
}
