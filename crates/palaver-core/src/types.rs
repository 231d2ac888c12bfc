// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Palaver workspace.
//!
//! Dialogs and messages are server-owned entities: the client only ever
//! observes them, it never allocates ids locally. All wire shapes here mirror
//! the REST API's JSON exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The access/refresh token pair, persisted as one JSON blob.
///
/// Owned exclusively by the session credential store; mutated only by login,
/// refresh, and logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Operator-visible lifecycle status of a dialog.
///
/// Transitions are server-decided; the client never computes them, with one
/// exception (the post-send optimism in the reconciler).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DialogStatus {
    Auto,
    WaitOperator,
    WaitUser,
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageSender {
    User,
    Bot,
    Operator,
}

/// A single message within a dialog.
///
/// Messages are immutable once created: there is no update or delete path,
/// which is what makes the id-keyed merge rule safe to replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub dialog_id: i64,
    pub sender: MessageSender,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Scalar fields of a dialog, common to the summary and detail projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: i64,
    pub bot_id: i64,
    #[serde(default)]
    pub channel_type: String,
    #[serde(default)]
    pub external_chat_id: String,
    #[serde(default)]
    pub external_user_id: Option<String>,
    pub status: DialogStatus,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub is_locked: bool,
    /// Server-side lock lease expiry; carried for round-tripping, never
    /// interpreted by the client.
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_admin_id: Option<i64>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_user_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub waiting_time_seconds: i64,
    #[serde(default)]
    pub unread_messages_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight dialog projection carrying at most the most recent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogSummary {
    #[serde(flatten)]
    pub dialog: Dialog,
    #[serde(default)]
    pub last_message: Option<Message>,
}

/// Full dialog projection including the complete ordered message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogDetail {
    #[serde(flatten)]
    pub dialog: Dialog,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl DialogDetail {
    /// The most recent message by creation time, ties broken by id.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.iter().max_by_key(|m| (m.created_at, m.id))
    }
}

/// Paginated REST collection envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_next: bool,
}

/// The authenticated operator, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DialogStatus::WaitOperator).unwrap(),
            r#""wait_operator""#
        );
        let parsed: DialogStatus = serde_json::from_str(r#""wait_user""#).unwrap();
        assert_eq!(parsed, DialogStatus::WaitUser);
    }

    #[test]
    fn sender_display_roundtrip() {
        use std::str::FromStr;
        for sender in [MessageSender::User, MessageSender::Bot, MessageSender::Operator] {
            let rendered = sender.to_string();
            assert_eq!(MessageSender::from_str(&rendered).unwrap(), sender);
        }
    }

    #[test]
    fn summary_flattens_dialog_fields() {
        let json = r#"{
            "id": 42, "bot_id": 7, "channel_type": "telegram",
            "external_chat_id": "chat-1", "status": "auto",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "last_message": null
        }"#;
        let summary: DialogSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.dialog.id, 42);
        assert_eq!(summary.dialog.bot_id, 7);
        assert!(summary.last_message.is_none());
        assert_eq!(summary.dialog.unread_messages_count, 0);
    }

    #[test]
    fn detail_last_message_prefers_latest_created_at() {
        let json = r#"{
            "id": 42, "bot_id": 7, "status": "wait_operator",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:10Z",
            "messages": [
                {"id": 2, "dialog_id": 42, "sender": "user", "text": "b",
                 "created_at": "2026-01-01T00:00:10Z"},
                {"id": 1, "dialog_id": 42, "sender": "bot", "text": "a",
                 "created_at": "2026-01-01T00:00:05Z"}
            ]
        }"#;
        let detail: DialogDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.last_message().unwrap().id, 2);
    }

    #[test]
    fn page_envelope_roundtrip() {
        let json = r#"{"items": [], "page": 2, "per_page": 20, "total": 45, "has_next": true}"#;
        let page: Page<DialogSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, 2);
        assert!(page.has_next);
        assert!(page.items.is_empty());
    }
}
