//! SQLite-backed conversation store.
//!
//! Schema lives in `migrations/001_schema.sql` and is applied inline via
//! `include_str!` on open. Triggers in the schema reject UPDATE and DELETE on
//! `turns`, so the table is append-only at the engine level too.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{format_timestamp, parse_timestamp, ConversationStore, Exchange, StoreError, Turn};
use crate::triage::{Persona, RiskLevel, ScamCategory};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_schema.sql");

/// Raw `turns` row as returned by `sqlx::query_as`.
type TurnRow = (String, String, String, String, String, String, String, String);

/// Conversation store on a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migration fails.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Full)
            .pragma("trusted_schema", "OFF");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open turn database at {}", path.display()))?;

        let store = Self::from_pool(pool).await?;
        info!(path = %path.display(), "conversation store opened");
        Ok(store)
    }

    /// Open a private in-memory database (single connection).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);
        // In-memory databases are per-connection, so limit to 1 connection
        // to ensure migrations and queries share the same database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("in-memory pool should connect")?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema migration fails.
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("failed to apply turn schema migration")?;
        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_turn(row: TurnRow) -> Result<Turn, StoreError> {
    let (id, conversation_id, timestamp, scammer_message, agent_reply, category, risk, persona) =
        row;
    Ok(Turn {
        id,
        conversation_id,
        timestamp: parse_timestamp(&timestamp)?,
        scammer_message,
        agent_reply,
        scam_category: ScamCategory::parse(&category)?,
        risk_level: RiskLevel::parse(&risk)?,
        persona: Persona::parse(&persona)?,
    })
}

/// SQLite reads `LIMIT -1` as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn fetch_history(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Exchange>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT scammer_message, agent_reply FROM ( \
                 SELECT scammer_message, agent_reply, timestamp, rowid AS seq \
                 FROM turns \
                 WHERE conversation_id = ?1 \
                 ORDER BY timestamp DESC, seq DESC \
                 LIMIT ?2 \
             ) ORDER BY timestamp ASC, seq ASC",
        )
        .bind(conversation_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(scammer_message, agent_reply)| Exchange {
                scammer_message,
                agent_reply,
            })
            .collect())
    }

    async fn append(&self, turn: &Turn) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO turns (id, conversation_id, timestamp, scammer_message, \
             agent_reply, scam_category, risk_level, persona) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&turn.id)
        .bind(&turn.conversation_id)
        .bind(format_timestamp(&turn.timestamp))
        .bind(&turn.scammer_message)
        .bind(&turn.agent_reply)
        .bind(turn.scam_category.as_str())
        .bind(turn.risk_level.as_str())
        .bind(turn.persona.label())
        .execute(&self.pool)
        .await?;

        debug!(
            conversation_id = %turn.conversation_id,
            turn_id = %turn.id,
            "turn persisted"
        );
        Ok(())
    }

    async fn turns(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, conversation_id, timestamp, scammer_message, agent_reply, \
                    scam_category, risk_level, persona \
             FROM turns \
             WHERE conversation_id = ?1 \
             ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_turn).collect()
    }

    async fn recent(&self, limit: Option<usize>) -> Result<Vec<Turn>, StoreError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, conversation_id, timestamp, scammer_message, agent_reply, \
                    scam_category, risk_level, persona \
             FROM turns \
             ORDER BY timestamp DESC, rowid DESC \
             LIMIT ?1",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_turn).collect()
    }
}
