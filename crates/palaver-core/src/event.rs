// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The push event envelope.
//!
//! The server pushes JSON text frames of shape `{"event": <name>, "data": <entity>}`.
//! Decoding doubles as the structural validation step: an unrecognized event name
//! or a payload missing its identity fields fails deserialization, and the caller
//! drops the frame. The push channel is not the system of record, so robustness
//! wins over strictness here.

use serde::{Deserialize, Serialize};

use crate::types::{Dialog, DialogSummary, Message};

/// A dialog snapshot carried by a push event.
///
/// Events may arrive summary-shaped (scalars + optional `last_message`) or
/// detail-shaped (scalars + `messages`). Both describe the same entity; the
/// reconciler projects whichever arrives onto both of its views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogSnapshot {
    #[serde(flatten)]
    pub dialog: Dialog,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
}

impl DialogSnapshot {
    /// The summary projection of this snapshot.
    ///
    /// When the snapshot is detail-shaped, `last_message` is derived from the
    /// message list so the projection never loses the most recent message.
    pub fn summary(&self) -> DialogSummary {
        let last_message = self.last_message.clone().or_else(|| {
            self.messages
                .as_ref()
                .and_then(|msgs| msgs.iter().max_by_key(|m| (m.created_at, m.id)).cloned())
        });
        DialogSummary {
            dialog: self.dialog.clone(),
            last_message,
        }
    }
}

/// A decoded push event.
///
/// `dialog_locked` and `dialog_unlocked` are lock-state projections of the same
/// entity as `dialog_updated`; the reconciler routes all three through one merge
/// path, which is what makes lock transitions idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    DialogCreated(DialogSnapshot),
    DialogUpdated(DialogSnapshot),
    DialogLocked(DialogSnapshot),
    DialogUnlocked(DialogSnapshot),
    MessageCreated(Message),
}

impl PushEvent {
    /// Decode a raw text frame into a typed event.
    ///
    /// Returns an error for unrecognized event names and structurally invalid
    /// payloads alike; callers log and drop those frames.
    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The dialog id this event concerns.
    pub fn dialog_id(&self) -> i64 {
        match self {
            PushEvent::DialogCreated(s)
            | PushEvent::DialogUpdated(s)
            | PushEvent::DialogLocked(s)
            | PushEvent::DialogUnlocked(s) => s.dialog.id,
            PushEvent::MessageCreated(m) => m.dialog_id,
        }
    }
}
