use anyhow::Context;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::models::SlotStore;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredConversation {
    pub conversation_id: String,
    pub agent_type: String,
    pub slots: SlotStore,
    pub created_at: String,
    pub updated_at: String,
}

// ── Conversations ──

/// Stored slot map for a conversation, empty if none has been saved yet.
pub fn get_slots(conn: &Connection, conversation_id: &str) -> anyhow::Result<SlotStore> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT slots FROM conversations WHERE conversation_id = ?1",
            [conversation_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load conversation slots")?;

    match raw {
        Some(json) => serde_json::from_str(&json)
            .with_context(|| format!("corrupt slot store for conversation {conversation_id}")),
        None => Ok(SlotStore::new()),
    }
}

/// Replaces the whole stored map. Last writer wins.
pub fn save_slots(
    conn: &Connection,
    conversation_id: &str,
    agent_type: &str,
    slots: &SlotStore,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(slots).context("failed to serialize slots")?;
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO conversations (conversation_id, agent_type, slots, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(conversation_id) DO UPDATE SET
           agent_type = excluded.agent_type,
           slots = excluded.slots,
           updated_at = excluded.updated_at",
        params![conversation_id, agent_type, json, now],
    )
    .context("failed to save conversation slots")?;
    Ok(())
}

pub fn get_conversation(
    conn: &Connection,
    conversation_id: &str,
) -> rusqlite::Result<Option<StoredConversation>> {
    conn.query_row(
        "SELECT conversation_id, agent_type, slots, created_at, updated_at
         FROM conversations WHERE conversation_id = ?1",
        [conversation_id],
        |row| {
            let slots_json: String = row.get(2)?;
            let slots = serde_json::from_str(&slots_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })?;
            Ok(StoredConversation {
                conversation_id: row.get(0)?,
                agent_type: row.get(1)?,
                slots,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()
}
