//! libSQL backend for [`AgentStore`]. Supports local file and in-memory
//! databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::session::Speaker;
use crate::error::DatabaseError;
use crate::profile::UserProfile;
use crate::store::migrations;
use crate::store::traits::{AgentMessageRecord, AgentStore};

/// libSQL-backed store.
///
/// Holds a single connection reused for all operations; the database handle
/// is kept alive alongside it so in-memory databases survive.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;
        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests and ephemeral runs).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Fixed-width UTC timestamps so lexical order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn role_to_str(role: Speaker) -> &'static str {
    role.label()
}

fn str_to_role(s: &str) -> Speaker {
    match s {
        "user" => Speaker::User,
        _ => Speaker::Agent,
    }
}

fn row_to_record(row: &libsql::Row) -> Result<AgentMessageRecord, libsql::Error> {
    let id_str: String = row.get(0)?;
    let agent: String = row.get(1)?;
    let role_str: String = row.get(2)?;
    let content: String = row.get(3)?;
    let payload_str: Option<String> = row.get::<String>(4).ok();
    let created_str: String = row.get(5)?;
    let seq: i64 = row.get(6)?;

    Ok(AgentMessageRecord {
        id: id_str.parse().unwrap_or_else(|_| Uuid::nil()),
        agent,
        role: str_to_role(&role_str),
        content,
        payload: payload_str.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: parse_datetime(&created_str),
        seq,
    })
}

#[async_trait]
impl AgentStore for LibSqlStore {
    async fn append_message(
        &self,
        user_id: &str,
        record: &AgentMessageRecord,
    ) -> Result<(), DatabaseError> {
        let payload = record
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO agent_messages (id, user_id, agent, role, content, payload, created_at, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    user_id,
                    record.agent.as_str(),
                    role_to_str(record.role),
                    record.content.as_str(),
                    payload,
                    format_datetime(&record.created_at),
                    record.seq,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_message: {e}")))?;

        debug!(user_id = user_id, id = %record.id, agent = %record.agent, "Agent message stored");
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentMessageRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, agent, role, content, payload, created_at, seq
                 FROM agent_messages WHERE user_id = ?1
                 ORDER BY created_at DESC, seq DESC LIMIT ?2",
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_messages: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_record(&row) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping agent message row: {e}"),
            }
        }
        Ok(records)
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        if profile.id.trim().is_empty() {
            return Err(DatabaseError::Query(
                "save_profile: profile id is empty".to_string(),
            ));
        }
        let document = serde_json::to_string(profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let now = format_datetime(&Utc::now());

        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, document, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET document = excluded.document,
                     updated_at = excluded.updated_at",
                params![profile.id.as_str(), document, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_profile: {e}")))?;

        debug!(user_id = %profile.id, "Profile saved");
        Ok(())
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT document FROM profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let document: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("load_profile row parse: {e}")))?;
                let profile = serde_json::from_str(&document)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load_profile: {e}"))),
        }
    }
}
