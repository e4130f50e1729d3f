//! `AgentStore` trait: the persistence seam for message logs and profiles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::planner::AgentKind;
use crate::agents::session::Speaker;
use crate::error::DatabaseError;
use crate::profile::UserProfile;

/// Default page size for [`AgentStore::recent_messages`].
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// One persisted agent or user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageRecord {
    pub id: Uuid,
    pub agent: String,
    pub role: Speaker,
    pub content: String,
    /// Full turn output for agent messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Tie-breaker for messages written in the same millisecond.
    pub seq: i64,
}

impl AgentMessageRecord {
    pub fn new(
        agent: AgentKind,
        role: Speaker,
        content: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent: agent.label().to_string(),
            role,
            content: content.into(),
            payload,
            created_at,
            seq: next_sequence(created_at),
        }
    }
}

/// Millisecond timestamp scaled by 1000 plus a random low part.
pub fn next_sequence(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis() * 1000 + rand::thread_rng().gen_range(0..1000)
}

/// Persistence for agent conversations and user profiles.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Append a message to a user's log.
    async fn append_message(
        &self,
        user_id: &str,
        record: &AgentMessageRecord,
    ) -> Result<(), DatabaseError>;

    /// Most recent messages first, ordered by timestamp then sequence.
    async fn recent_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentMessageRecord>, DatabaseError>;

    /// Insert or replace a profile document, keyed by `profile.id`.
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;
}
