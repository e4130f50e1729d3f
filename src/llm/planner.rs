//! Model-backed planner. Produces a JSON action proposal for either loop.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::agents::planner::{AgentKind, PlanAction, PlanProposal, PlannerInput, PlannerPort};
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Max tokens for a cosmetic planning call.
const COSMETIC_MAX_TOKENS: u32 = 512;

/// Medical plans are shorter; the action set is smaller.
const MEDICAL_MAX_TOKENS: u32 = 256;

const COSMETIC_TEMPERATURE: f32 = 0.3;

const MEDICAL_TEMPERATURE: f32 = 0.2;

/// Reasons recovered from broken JSON are cut to this many characters.
const RECOVERED_REASON_CHARS: usize = 150;

static ACTION_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""action"\s*:\s*"([^"]+)""#).expect("static regex"));

static REASON_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""reason"\s*:\s*"([^"]*)"#).expect("static regex"));

/// Planner backed by an `LlmProvider`.
pub struct LlmPlanner {
    llm: Arc<dyn LlmProvider>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PlannerPort for LlmPlanner {
    async fn propose(&self, input: &PlannerInput) -> Result<PlanProposal, LlmError> {
        let (system, max_tokens, temperature) = match input.kind {
            AgentKind::Cosmetic => (
                build_cosmetic_system_prompt(),
                COSMETIC_MAX_TOKENS,
                COSMETIC_TEMPERATURE,
            ),
            AgentKind::Medical => (
                build_medical_system_prompt(),
                MEDICAL_MAX_TOKENS,
                MEDICAL_TEMPERATURE,
            ),
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(build_planner_user_prompt(input)),
        ])
        .with_temperature(temperature)
        .with_max_tokens(max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(
            kind = input.kind.label(),
            output_tokens = response.output_tokens,
            "Planner response received"
        );

        parse_plan(&response.content, input.kind).map_err(|reason| {
            warn!(
                raw_response = %response.content,
                error = %reason,
                "Failed to parse planner response"
            );
            LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason,
            }
        })
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_cosmetic_system_prompt() -> String {
    "You are DermAid's skincare planning assistant. You decide the next step of a short \
     conversation that ends in a personalized skincare routine.\n\n\
     Tools:\n\
     - \"check_weather\": look at UV and humidity before recommending actives.\n\
     - \"ask_user\": ask ONE multiple-choice question. Provide question and options.\n\
     - \"search_products\": look up catalog products for the recommended actives.\n\
     - \"finalize\": enough is known, build the routine.\n\n\
     Respond with ONLY a JSON object:\n\
     {\"action\": \"...\", \"reason\": \"...\", \"question\": \"...\", \"options\": [\"...\"]}\n\n\
     Rules:\n\
     - Ask at most two questions in total; never repeat a question already in the conversation\n\
     - Good questions: \"What's your primary concern right now?\" with options [\"Acne\", \"Dark Circles\", \"Both\"], \
     or \"How much time can you dedicate to your skincare routine daily?\" with options [\"5-10 minutes\", \"15-20 minutes\", \"30+ minutes\"]\n\
     - Respect allergies, medical conditions and hormonal factors listed in the known information\n\
     - Keep the reason to one short sentence written to the user\n\
     - When the user has answered your questions, choose finalize"
        .to_string()
}

fn build_medical_system_prompt() -> String {
    "You are DermAid's medical triage assistant. A skin-condition model produced a finding; \
     decide the next step before giving guidance.\n\n\
     Tools:\n\
     - \"search_knowledge\": look up guidance about the condition. Provide query.\n\
     - \"check_weather\": look at UV and humidity.\n\
     - \"ask_user\": ask ONE short question about symptoms. Provide question and options.\n\
     - \"finalize\": give the assessment.\n\n\
     Respond with ONLY a JSON object:\n\
     {\"action\": \"...\", \"reason\": \"...\", \"question\": \"...\", \"options\": [\"...\"], \"query\": \"...\"}\n\n\
     Rules:\n\
     - Never diagnose; the finding is a screening result\n\
     - Ask at most two questions (for example duration, itching or spreading)\n\
     - Keep the reason to one short sentence\n\
     - Prefer finalize once the user has answered"
        .to_string()
}

fn build_planner_user_prompt(input: &PlannerInput) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str(&format!("Scan summary: {}\n", input.scan_summary));
    prompt.push_str(&format!("Known information: {}\n", input.known_info));

    if input.history.is_empty() {
        prompt.push_str("\nNo conversation yet.\n");
    } else {
        prompt.push_str("\nConversation:\n");
        for entry in &input.history {
            let content: String = entry.content.chars().take(500).collect();
            prompt.push_str(&format!("{}: {}\n", entry.role.label(), content));
        }
    }

    prompt.push_str("\nWhat is the next step?");
    prompt
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlanResponse {
    action: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    query: Option<String>,
}

/// Parse a planner response. Broken JSON is salvaged when the action field
/// can still be read; unknown or disallowed actions become finalize.
fn parse_plan(raw: &str, kind: AgentKind) -> Result<PlanProposal, String> {
    let Some(json_str) = extract_json_object(raw) else {
        return recover_plan(raw, kind)
            .ok_or_else(|| "no complete JSON object in planner output".to_string());
    };

    let response = match serde_json::from_str::<PlanResponse>(json_str) {
        Ok(r) => r,
        Err(e) => {
            return recover_plan(raw, kind).ok_or_else(|| format!("JSON parse error: {e}"));
        }
    };

    let reason = if response.reason.trim().is_empty() {
        kind.fallback_reason().to_string()
    } else {
        response.reason
    };

    match PlanAction::parse(&response.action).filter(|a| kind.allows(*a)) {
        Some(action) => Ok(PlanProposal {
            action,
            reason,
            question: response.question,
            options: response.options,
            query: response.query,
        }),
        None => Ok(PlanProposal::finalize(reason)),
    }
}

fn recover_plan(raw: &str, kind: AgentKind) -> Option<PlanProposal> {
    let action = ACTION_FIELD
        .captures(raw)
        .and_then(|c| PlanAction::parse(&c[1]))
        .filter(|a| kind.allows(*a))?;

    let reason = REASON_FIELD
        .captures(raw)
        .map(|c| c[1].to_string())
        .filter(|r| !r.trim().is_empty())
        .map(|r| {
            if r.chars().count() > RECOVERED_REASON_CHARS {
                let cut: String = r.chars().take(RECOVERED_REASON_CHARS).collect();
                format!("{cut}...")
            } else {
                r
            }
        })
        .unwrap_or_else(|| kind.fallback_reason().to_string());

    Some(PlanProposal {
        action,
        reason,
        question: None,
        options: None,
        query: None,
    })
}

/// Slice out the first balanced `{...}` in model output, ignoring braces
/// inside string literals. Markdown fences and surrounding prose fall away.
/// Returns `None` when no object opens or the first one never closes.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::session::HistoryEntry;
    use crate::llm::provider::{CompletionResponse, FinishReason};
    use std::sync::Mutex;

    // ── Prompt construction tests ───────────────────────────────────

    #[test]
    fn system_prompts_list_allowed_actions() {
        let cosmetic = build_cosmetic_system_prompt();
        for action in ["check_weather", "ask_user", "search_products", "finalize"] {
            assert!(cosmetic.contains(action), "missing {action}");
        }
        assert!(!cosmetic.contains("search_knowledge"));

        let medical = build_medical_system_prompt();
        assert!(medical.contains("search_knowledge"));
        assert!(!medical.contains("search_products"));
    }

    #[test]
    fn user_prompt_includes_history() {
        let input = PlannerInput {
            kind: AgentKind::Cosmetic,
            scan_summary: serde_json::json!({"detectedConditions": ["acne_vulgaris"]}),
            history: vec![
                HistoryEntry::agent("What's your primary concern right now?"),
                HistoryEntry::user("Acne"),
            ],
            known_info: serde_json::json!({"skinType": "oily"}),
        };
        let prompt = build_planner_user_prompt(&input);
        assert!(prompt.contains("acne_vulgaris"));
        assert!(prompt.contains("agent: What's your primary concern right now?"));
        assert!(prompt.contains("user: Acne"));
        assert!(prompt.contains("\"skinType\":\"oily\""));
    }

    // ── Parsing tests ───────────────────────────────────────────────

    #[test]
    fn parse_ask_user() {
        let raw = r#"{"action": "ask_user", "reason": "Need your main concern", "question": "What's your primary concern right now?", "options": ["Acne", "Dark Circles", "Both"]}"#;
        let plan = parse_plan(raw, AgentKind::Cosmetic).unwrap();
        assert_eq!(plan.action, PlanAction::AskUser);
        assert_eq!(plan.options.unwrap().len(), 3);
    }

    #[test]
    fn parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"action\": \"check_weather\", \"reason\": \"UV matters\"}\n```";
        let plan = parse_plan(raw, AgentKind::Cosmetic).unwrap();
        assert_eq!(plan.action, PlanAction::CheckWeather);
        assert_eq!(plan.reason, "UV matters");
    }

    #[test]
    fn disallowed_action_becomes_finalize() {
        let raw = r#"{"action": "search_knowledge", "reason": "look up acne", "query": "acne"}"#;
        let plan = parse_plan(raw, AgentKind::Cosmetic).unwrap();
        assert_eq!(plan.action, PlanAction::Finalize);
        assert_eq!(plan.reason, "look up acne");

        let raw = r#"{"action": "dance", "reason": ""}"#;
        let plan = parse_plan(raw, AgentKind::Medical).unwrap();
        assert_eq!(plan.action, PlanAction::Finalize);
        assert_eq!(plan.reason, AgentKind::Medical.fallback_reason());
    }

    #[test]
    fn broken_json_recovers_action_and_truncates_reason() {
        let long_reason = "x".repeat(200);
        let raw = format!(r#"{{"action": "finalize", "reason": "{long_reason}", "options": [}}"#);
        let plan = parse_plan(&raw, AgentKind::Cosmetic).unwrap();
        assert_eq!(plan.action, PlanAction::Finalize);
        assert_eq!(plan.reason.chars().count(), RECOVERED_REASON_CHARS + 3);
        assert!(plan.reason.ends_with("..."));
    }

    #[test]
    fn broken_json_without_valid_action_is_error() {
        assert!(parse_plan("{\"action\": \"explode\", ", AgentKind::Cosmetic).is_err());
        assert!(parse_plan("I think we should finalize.", AgentKind::Cosmetic).is_err());
    }

    #[test]
    fn truncated_object_is_recovered() {
        let raw = "```json\n{\"action\": \"finalize\", \"reason\": \"Enough detail\", \"options\": {";
        let plan = parse_plan(raw, AgentKind::Cosmetic).unwrap();
        assert_eq!(plan.action, PlanAction::Finalize);
        assert_eq!(plan.reason, "Enough detail");
    }

    #[test]
    fn extract_json_variants() {
        assert_eq!(extract_json_object("  {\"a\":1} "), Some("{\"a\":1}"));
        assert_eq!(
            extract_json_object("```json\n{\"a\":{\"b\":2}}\n```"),
            Some("{\"a\":{\"b\":2}}")
        );
        assert_eq!(
            extract_json_object("text {\"a\":1} more {\"b\":2}"),
            Some("{\"a\":1}")
        );
        assert_eq!(
            extract_json_object(r#"{"q": "use } and \" here"} tail"#),
            Some(r#"{"q": "use } and \" here"}"#)
        );
    }

    #[test]
    fn extract_json_rejects_unbalanced_input() {
        assert_eq!(extract_json_object("nothing"), None);
        assert_eq!(extract_json_object("{\"action\": \"ask\", \"options\": {"), None);
        assert_eq!(extract_json_object(r#"{"reason": "open } string"#), None);
    }

    // ── Provider round trip ─────────────────────────────────────────

    struct MockPlannerLlm {
        response: String,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for MockPlannerLlm {
        fn model_name(&self) -> &str {
            "mock-planner"
        }

        fn cost_per_token(&self) -> (rust_decimal::Decimal, rust_decimal::Decimal) {
            (rust_decimal::Decimal::ZERO, rust_decimal::Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            *self.last_request.lock().unwrap() = Some(request);
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 100,
                output_tokens: 40,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    #[tokio::test]
    async fn medical_plan_uses_tight_limits() {
        let llm = Arc::new(MockPlannerLlm {
            response: r#"{"action": "search_knowledge", "reason": "check triggers", "query": "eczema triggers"}"#.into(),
            last_request: Mutex::new(None),
        });
        let planner = LlmPlanner::new(llm.clone());
        let input = PlannerInput {
            kind: AgentKind::Medical,
            scan_summary: serde_json::json!("eczema (Risk: low)"),
            history: vec![],
            known_info: serde_json::json!({}),
        };

        let plan = planner.propose(&input).await.unwrap();
        assert_eq!(plan.action, PlanAction::SearchKnowledge);
        assert_eq!(plan.query.as_deref(), Some("eczema triggers"));

        let request = llm.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.max_tokens, Some(MEDICAL_MAX_TOKENS));
        assert_eq!(request.temperature, Some(MEDICAL_TEMPERATURE));
    }

    #[tokio::test]
    async fn unparseable_response_is_invalid_response_error() {
        let llm = Arc::new(MockPlannerLlm {
            response: "Sorry, I can't help with that.".into(),
            last_request: Mutex::new(None),
        });
        let planner = LlmPlanner::new(llm);
        let input = PlannerInput {
            kind: AgentKind::Cosmetic,
            scan_summary: serde_json::json!({}),
            history: vec![],
            known_info: serde_json::json!({}),
        };
        match planner.propose(&input).await {
            Err(LlmError::InvalidResponse { provider, .. }) => assert_eq!(provider, "mock-planner"),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }
}
