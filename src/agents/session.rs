//! Conversation history and what it tells us about the current turn.

use serde::{Deserialize, Serialize};

use crate::scan::ConditionTag;

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    User,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::User => "user",
        }
    }
}

/// One message of a conversation. Clients resend the whole history each turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Speaker,
    pub content: String,
}

impl HistoryEntry {
    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Agent,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }
}

/// Facts derived from the history before planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Number of agent entries so far.
    pub questions_asked: usize,
    /// The last two entries are an agent question followed by a user reply.
    pub just_received_answer: bool,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
    pub is_first_turn: bool,
}

impl SessionState {
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let questions_asked = history.iter().filter(|e| e.role == Speaker::Agent).count();
        let (last_question, last_answer) = match history {
            [.., question, answer]
                if question.role == Speaker::Agent && answer.role == Speaker::User =>
            {
                (Some(question.content.clone()), Some(answer.content.clone()))
            }
            _ => (None, None),
        };

        Self {
            questions_asked,
            just_received_answer: last_answer.is_some(),
            last_question,
            last_answer,
            is_first_turn: history.is_empty(),
        }
    }

    /// A proposed question repeats the previous one when it contains the
    /// previous question's first word. Crude, but it stops the loop.
    pub fn repeats_last_question(&self, proposed: &str) -> bool {
        let Some(previous) = self.last_question.as_deref() else {
            return false;
        };
        let Some(first_word) = previous.split_whitespace().next() else {
            return false;
        };
        proposed
            .to_lowercase()
            .contains(&first_word.to_lowercase())
    }
}

/// What the user said they want to focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcernPreference {
    Acne,
    DarkCircles,
    Both,
}

impl ConcernPreference {
    /// Condition the routine is built for. "Both" keeps the scan's primary.
    pub fn resolve(preference: Option<Self>, primary: ConditionTag) -> ConditionTag {
        match preference {
            Some(Self::Acne) => ConditionTag::Acne,
            Some(Self::DarkCircles) => ConditionTag::DarkCircles,
            Some(Self::Both) | None => primary,
        }
    }
}

/// How much routine the user is willing to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineComplexity {
    Simple,
    #[default]
    Moderate,
    Comprehensive,
}

impl RoutineComplexity {
    pub fn product_limit(&self) -> usize {
        match self {
            Self::Simple => 3,
            Self::Moderate => 5,
            Self::Comprehensive => 7,
        }
    }

    pub fn time_available(&self) -> &'static str {
        match self {
            Self::Simple => "short",
            Self::Moderate => "medium",
            Self::Comprehensive => "long",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Note added to the final output, if any.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::Simple => Some("Simple routine: focusing on essential products only."),
            Self::Moderate => None,
            Self::Comprehensive => {
                Some("Comprehensive routine: including multiple targeted treatments.")
            }
        }
    }
}

/// Preferences extracted from the user's answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub concern: Option<ConcernPreference>,
    pub complexity: RoutineComplexity,
}

impl Preferences {
    /// Scan every user answer; later answers win.
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let mut prefs = Self::default();
        for entry in history.iter().filter(|e| e.role == Speaker::User) {
            let answer = entry.content.to_lowercase();

            // A named dark-circle concern outranks "both".
            if answer.contains("acne") && !answer.contains("dark") {
                prefs.concern = Some(ConcernPreference::Acne);
            } else if answer.contains("dark circle") {
                prefs.concern = Some(ConcernPreference::DarkCircles);
            } else if answer.contains("both") {
                prefs.concern = Some(ConcernPreference::Both);
            }

            if answer.contains("simple") || answer.contains("5-10 minutes") || answer.contains("quick")
            {
                prefs.complexity = RoutineComplexity::Simple;
            } else if answer.contains("comprehensive")
                || answer.contains("30+ minutes")
                || answer.contains("extensive")
            {
                prefs.complexity = RoutineComplexity::Comprehensive;
            } else if answer.contains("15-20 minutes") || answer.contains("moderate") {
                prefs.complexity = RoutineComplexity::Moderate;
            }
        }
        prefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_is_first_turn() {
        let state = SessionState::from_history(&[]);
        assert!(state.is_first_turn);
        assert!(!state.just_received_answer);
        assert_eq!(state.questions_asked, 0);
    }

    #[test]
    fn answer_detected_only_after_agent_question() {
        let history = vec![
            HistoryEntry::agent("What's your primary concern right now?"),
            HistoryEntry::user("Acne"),
        ];
        let state = SessionState::from_history(&history);
        assert!(state.just_received_answer);
        assert_eq!(state.questions_asked, 1);
        assert_eq!(state.last_answer.as_deref(), Some("Acne"));

        let state = SessionState::from_history(&[HistoryEntry::user("hello")]);
        assert!(!state.just_received_answer);
        assert!(state.last_question.is_none());
    }

    #[test]
    fn repeat_check_uses_first_word() {
        let history = vec![
            HistoryEntry::agent("What's your primary concern right now?"),
            HistoryEntry::user("Acne"),
        ];
        let state = SessionState::from_history(&history);
        assert!(state.repeats_last_question("what's bothering you most?"));
        assert!(!state.repeats_last_question("How much time do you have?"));
        assert!(!SessionState::default().repeats_last_question("anything"));
    }

    #[test]
    fn preferences_from_answers() {
        let history = vec![
            HistoryEntry::agent("Concern?"),
            HistoryEntry::user("Acne, quick please"),
        ];
        let prefs = Preferences::from_history(&history);
        assert_eq!(prefs.concern, Some(ConcernPreference::Acne));
        assert_eq!(prefs.complexity, RoutineComplexity::Simple);
        assert_eq!(prefs.complexity.product_limit(), 3);

        let prefs = Preferences::from_history(&[HistoryEntry::user("Dark circles, 30+ minutes")]);
        assert_eq!(prefs.concern, Some(ConcernPreference::DarkCircles));
        assert_eq!(prefs.complexity, RoutineComplexity::Comprehensive);
        assert_eq!(prefs.complexity.time_available(), "long");
    }

    #[test]
    fn concern_precedence() {
        let concern = |answer: &str| Preferences::from_history(&[HistoryEntry::user(answer)]).concern;
        assert_eq!(concern("Both"), Some(ConcernPreference::Both));
        assert_eq!(concern("Both acne and dark circles"), Some(ConcernPreference::DarkCircles));
        assert_eq!(concern("Acne, both cheeks"), Some(ConcernPreference::Acne));
        assert_eq!(concern("Acne and a dark spot"), None);
    }

    #[test]
    fn unanswered_preferences_default() {
        let prefs = Preferences::from_history(&[]);
        assert_eq!(prefs.concern, None);
        assert_eq!(prefs.complexity, RoutineComplexity::Moderate);
        assert_eq!(prefs.complexity.product_limit(), 5);
    }

    #[test]
    fn both_keeps_primary() {
        assert_eq!(
            ConcernPreference::resolve(Some(ConcernPreference::Both), ConditionTag::Hyperpigmentation),
            ConditionTag::Hyperpigmentation
        );
        assert_eq!(
            ConcernPreference::resolve(Some(ConcernPreference::DarkCircles), ConditionTag::Acne),
            ConditionTag::DarkCircles
        );
    }
}
