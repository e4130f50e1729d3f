//! Model-backed phraser. Writes the short final message shown to the user.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agents::phraser::{CosmeticPhrase, MedicalPhrase, PhraseContext, PhraserPort};
use crate::agents::session::HistoryEntry;
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

const PHRASER_MAX_TOKENS: u32 = 256;

/// Warmer than the planner; the text is read by people.
const PHRASER_TEMPERATURE: f32 = 0.7;

pub struct LlmPhraser {
    llm: Arc<dyn LlmProvider>,
}

impl LlmPhraser {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PhraserPort for LlmPhraser {
    async fn phrase(&self, context: &PhraseContext) -> Result<String, LlmError> {
        let (system, user) = match context {
            PhraseContext::Cosmetic(c) => (
                build_cosmetic_system_prompt(),
                build_cosmetic_user_prompt(c),
            ),
            PhraseContext::Medical(m) => {
                (build_medical_system_prompt(), build_medical_user_prompt(m))
            }
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_temperature(PHRASER_TEMPERATURE)
        .with_max_tokens(PHRASER_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let message = clean_message(&response.content);
        if message.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "empty phraser response".into(),
            });
        }

        debug!(chars = message.len(), "Phrased final message");
        Ok(message)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_cosmetic_system_prompt() -> String {
    "You are DermAid, a friendly skincare assistant. Write the message that accompanies \
     a personalized routine.\n\n\
     Rules:\n\
     - 2 to 4 sentences, plain text, no markdown\n\
     - Refer to what the scan found and what the user told you\n\
     - Mention the most important product or step by name\n\
     - Never claim to diagnose a medical condition"
        .to_string()
}

fn build_medical_system_prompt() -> String {
    "You are DermAid's medical screening assistant. Write a calm, clear message about a \
     screening result.\n\n\
     Rules:\n\
     - 2 to 4 sentences, plain text, no markdown\n\
     - If a dermatologist is required, say so first and state how soon\n\
     - Never present the finding as a diagnosis"
        .to_string()
}

fn push_history(prompt: &mut String, history: &[HistoryEntry]) {
    if history.is_empty() {
        prompt.push_str("No conversation history.\n");
        return;
    }
    prompt.push_str("Conversation:\n");
    for entry in history {
        prompt.push_str(&format!("{}: {}\n", entry.role.label(), entry.content));
    }
}

fn push_answer(prompt: &mut String, question: Option<&str>, answer: Option<&str>) {
    if let (Some(q), Some(a)) = (question, answer) {
        prompt.push_str(&format!("User's answer to \"{q}\": {a}\n"));
    }
}

fn build_cosmetic_user_prompt(c: &CosmeticPhrase) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!(
        "Detected conditions: {}\n",
        if c.detected_conditions.is_empty() {
            "none".to_string()
        } else {
            c.detected_conditions.join(", ")
        }
    ));
    prompt.push_str(&format!("Primary concern: {}\n", c.primary_concern));
    prompt.push_str(&format!("Skin health score: {}/100\n", c.skin_score));
    prompt.push_str(&format!(
        "Routine preference: {} routine ({} time available)\n",
        c.complexity.label(),
        c.complexity.time_available()
    ));
    push_answer(
        &mut prompt,
        c.last_question.as_deref(),
        c.last_answer.as_deref(),
    );
    prompt.push('\n');

    push_history(&mut prompt, &c.history);

    if !c.thought_process.is_empty() {
        prompt.push_str("\nMy reasoning steps:\n");
        for thought in &c.thought_process {
            prompt.push_str(&format!("- {thought}\n"));
        }
    }

    if !c.top_products.is_empty() {
        prompt.push_str(&format!(
            "\nRecommended products: {}\n",
            c.top_products.join(", ")
        ));
    }

    prompt
}

fn build_medical_user_prompt(m: &MedicalPhrase) -> String {
    let mut prompt = String::with_capacity(768);

    prompt.push_str(&format!("Condition detected: {}\n", m.condition));
    prompt.push_str(&format!("Risk level: {}\n", m.risk_level.as_str()));
    prompt.push_str(&format!(
        "Requires dermatologist: {}\n",
        if m.requires_dermatologist { "yes" } else { "no" }
    ));
    prompt.push_str(&format!("Urgency: {}\n", m.referral.as_str()));
    push_answer(
        &mut prompt,
        m.last_question.as_deref(),
        m.last_answer.as_deref(),
    );
    prompt.push('\n');

    push_history(&mut prompt, &m.history);

    if !m.thought_process.is_empty() {
        prompt.push_str("\nMy reasoning steps:\n");
        for thought in &m.thought_process {
            prompt.push_str(&format!("- {thought}\n"));
        }
    }

    prompt
}

// ── Response cleanup ────────────────────────────────────────────────

/// Strip code fences and surrounding bold markers.
pub(crate) fn clean_message(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag line, if any.
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("**") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("**") {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::session::RoutineComplexity;
    use crate::llm::provider::{CompletionResponse, FinishReason};
    use crate::rules::{Referral, RiskTier};

    #[test]
    fn clean_message_strips_wrapping() {
        assert_eq!(clean_message("```text\nHello there.\n```"), "Hello there.");
        assert_eq!(clean_message("**Use sunscreen daily.**"), "Use sunscreen daily.");
        assert_eq!(clean_message("  plain  "), "plain");
        assert_eq!(clean_message("```\n```"), "");
    }

    #[test]
    fn cosmetic_prompt_includes_answer_and_score() {
        let prompt = build_cosmetic_user_prompt(&CosmeticPhrase {
            detected_conditions: vec!["acne_vulgaris".into()],
            primary_concern: "acne".into(),
            skin_score: 68,
            complexity: RoutineComplexity::Simple,
            top_products: vec!["Clear Gel".into()],
            history: vec![
                HistoryEntry::agent("What's your primary concern right now?"),
                HistoryEntry::user("Acne"),
            ],
            thought_process: vec!["Decision: finalize".into()],
            last_question: Some("What's your primary concern right now?".into()),
            last_answer: Some("Acne".into()),
        });
        assert!(prompt.contains("Skin health score: 68/100"));
        assert!(prompt.contains("Routine preference: simple routine (short time available)"));
        assert!(prompt.contains("User's answer to \"What's your primary concern right now?\": Acne"));
        assert!(prompt.contains("Recommended products: Clear Gel"));
    }

    #[test]
    fn medical_prompt_states_risk() {
        let prompt = build_medical_user_prompt(&MedicalPhrase {
            condition: "psoriasis".into(),
            risk_level: RiskTier::Medium,
            requires_dermatologist: true,
            referral: Referral::Soon,
            history: vec![],
            thought_process: vec![],
            last_question: None,
            last_answer: None,
        });
        assert!(prompt.contains("Risk level: medium"));
        assert!(prompt.contains("Requires dermatologist: yes"));
        assert!(prompt.contains("No conversation history."));
    }

    struct EmptyLlm;

    #[async_trait]
    impl LlmProvider for EmptyLlm {
        fn model_name(&self) -> &str {
            "mock-empty"
        }

        fn cost_per_token(&self) -> (rust_decimal::Decimal, rust_decimal::Decimal) {
            (rust_decimal::Decimal::ZERO, rust_decimal::Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: "```\n```".into(),
                input_tokens: 10,
                output_tokens: 2,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    #[tokio::test]
    async fn empty_message_is_an_error() {
        let phraser = LlmPhraser::new(Arc::new(EmptyLlm));
        let context = PhraseContext::Medical(MedicalPhrase {
            condition: "eczema".into(),
            risk_level: RiskTier::Low,
            requires_dermatologist: false,
            referral: Referral::Routine,
            history: vec![],
            thought_process: vec![],
            last_question: None,
            last_answer: None,
        });
        assert!(phraser.phrase(&context).await.is_err());
    }
}
