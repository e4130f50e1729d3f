//! Conversational agent loops.
//!
//! Each turn is a bounded plan-act loop: the planner proposes, the guards in
//! [`planner`] decide, deterministic rules compute the answer, and the phraser
//! writes the message. Every collaborator failure degrades to a
//! deterministic path so a turn always produces an output.

pub mod cosmetic;
pub mod medical;
pub mod output;
pub mod phraser;
pub mod planner;
pub mod session;

pub use cosmetic::{CosmeticAgent, CosmeticTurnInput, skin_health_score};
pub use medical::{MedicalAgent, MedicalTurnInput};
pub use output::{
    AgentTurnOutput, CosmeticFinal, CosmeticTurn, MedicalFinal, MedicalTurn, ProductRef,
    QuestionTurn, TraceStep,
};
pub use phraser::{PhraseContext, PhraserPort, TemplatePhraser};
pub use planner::{GuardedPlanner, OfflinePlanner, PlannerPort};
pub use session::{HistoryEntry, SessionState, Speaker};

use std::sync::Arc;

use tracing::warn;

use crate::catalog::CatalogMatcher;
use crate::config::AgentConfig;
use crate::error::WeatherError;
use crate::weather::{Location, WeatherProvider, WeatherState};

/// Candidate products pulled from the catalog before suitability filtering.
const CANDIDATE_LIMIT: usize = 20;

/// Products kept after suitability filtering unless the user asked for more.
const SUITABLE_LIMIT: usize = 5;

/// Collaborators shared by both loops.
#[derive(Clone)]
pub struct AgentDeps {
    pub planner: GuardedPlanner,
    pub phraser: Arc<dyn PhraserPort>,
    pub weather: Arc<dyn WeatherProvider>,
    pub catalog: CatalogMatcher,
    pub config: AgentConfig,
}

impl AgentDeps {
    pub fn new(
        planner: Arc<dyn PlannerPort>,
        phraser: Arc<dyn PhraserPort>,
        weather: Arc<dyn WeatherProvider>,
        catalog: CatalogMatcher,
        config: AgentConfig,
    ) -> Self {
        Self {
            planner: GuardedPlanner::new(planner, config.planner_timeout, config.question_budget),
            phraser,
            weather,
            catalog,
            config,
        }
    }

    /// Weather lookup bounded by the configured timeout.
    async fn fetch_weather(&self, location: Location) -> Result<WeatherState, WeatherError> {
        let timeout = self.config.weather_timeout;
        tokio::time::timeout(timeout, self.weather.current(location))
            .await
            .map_err(|_| WeatherError::Timeout(timeout))?
    }

    /// Phrase the final message, falling back to the template on any failure.
    async fn phrase(&self, context: &PhraseContext) -> String {
        let timeout = self.config.phraser_timeout;
        match tokio::time::timeout(timeout, self.phraser.phrase(context)).await {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                warn!(error = %e, "Phraser failed, using template");
                TemplatePhraser::render(context)
            }
            Err(_) => {
                warn!(timeout = ?timeout, "Phraser timed out, using template");
                TemplatePhraser::render(context)
            }
        }
    }
}
