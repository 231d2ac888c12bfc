// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog state reconciler.
//!
//! Three logical tables: per-bot summary lists, id-keyed detail records, and
//! the messages nested in each detail. The message-merge rule (union by id,
//! incoming wins, sort by creation time then id) is the single point that
//! guarantees no duplicates and correct ordering no matter how often an event
//! is replayed or how REST and push results interleave.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use palaver_core::event::DialogSnapshot;
use palaver_core::{DialogDetail, DialogStatus, DialogSummary, Message, PushEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordering policy for a bot's summary list when a `dialog_updated` event
/// lands on an entry that already exists.
///
/// `dialog_created` always moves the dialog to the front regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Recency ordering: an update repositions the dialog to the front,
    /// matching the server's `updated_at desc` list order.
    #[default]
    MoveToFront,
    /// Patch fields in place without repositioning.
    InPlace,
}

/// Merge incoming messages into an existing list: union keyed by message id
/// (incoming wins on conflict), then sort ascending by creation time, ties
/// broken by id.
pub fn merge_messages(existing: &mut Vec<Message>, incoming: impl IntoIterator<Item = Message>) {
    for message in incoming {
        if let Some(slot) = existing.iter_mut().find(|m| m.id == message.id) {
            *slot = message;
        } else {
            existing.push(message);
        }
    }
    existing.sort_by_key(|m| (m.created_at, m.id));
}

fn max_timestamp(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// The shared mutable dialog state.
///
/// Construct one per console lifetime and inject it; there is no process-wide
/// singleton, so tests instantiate isolated stores.
#[derive(Debug, Default)]
pub struct DialogStore {
    order: ListOrder,
    summaries: HashMap<i64, Vec<DialogSummary>>,
    details: HashMap<i64, DialogDetail>,
}

impl DialogStore {
    pub fn new(order: ListOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// The summary list for a bot, in display order. Empty if never loaded.
    pub fn bot_summaries(&self, bot_id: i64) -> &[DialogSummary] {
        self.summaries.get(&bot_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The detail record for a dialog, if loaded.
    pub fn detail(&self, dialog_id: i64) -> Option<&DialogDetail> {
        self.details.get(&dialog_id)
    }

    /// The summary entry for a dialog, searched across all bot lists.
    pub fn summary(&self, dialog_id: i64) -> Option<&DialogSummary> {
        self.summaries
            .values()
            .flat_map(|list| list.iter())
            .find(|s| s.dialog.id == dialog_id)
    }

    /// Replace the stored summary list for a bot with a REST page result.
    ///
    /// Detail records are untouched: the REST list is authoritative for the
    /// list itself, not for any dialog's message history.
    pub fn load_summaries(&mut self, bot_id: i64, items: Vec<DialogSummary>) {
        self.summaries.insert(bot_id, items);
    }

    /// Replace the detail record for a dialog with an authoritative REST load
    /// and reconcile the corresponding summary entry.
    pub fn load_detail(&mut self, mut detail: DialogDetail) {
        detail.messages.sort_by_key(|m| (m.created_at, m.id));
        let prior = self
            .details
            .get(&detail.dialog.id)
            .and_then(|d| d.dialog.last_message_at);
        detail.dialog.last_message_at = max_timestamp(prior, detail.dialog.last_message_at);

        if let Some(entry) = self.summary_mut(detail.dialog.id) {
            entry.last_message = detail.last_message().cloned();
            entry.dialog = detail.dialog.clone();
        }
        self.details.insert(detail.dialog.id, detail);
    }

    /// Route a decoded push event to the right merge operation.
    pub fn apply_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::DialogCreated(snapshot) => self.apply_snapshot(snapshot, true),
            // Lock and unlock are lock-state projections of the same entity;
            // they share the dialog_updated merge path so replays stay idempotent.
            PushEvent::DialogUpdated(snapshot)
            | PushEvent::DialogLocked(snapshot)
            | PushEvent::DialogUnlocked(snapshot) => self.apply_snapshot(snapshot, false),
            PushEvent::MessageCreated(message) => self.apply_message(message),
        }
    }

    /// Apply a server-confirmed operator send.
    ///
    /// Same merge as a push `message_created`, plus one local optimism: a
    /// dialog sitting in `wait_user` advances to `wait_operator` as a UI hint,
    /// superseded by the next authoritative update.
    pub fn apply_sent_message(&mut self, message: Message) {
        let dialog_id = message.dialog_id;
        if let Some(detail) = self.details.get_mut(&dialog_id)
            && detail.dialog.status == DialogStatus::WaitUser
        {
            detail.dialog.status = DialogStatus::WaitOperator;
        }
        if let Some(entry) = self.summary_mut(dialog_id)
            && entry.dialog.status == DialogStatus::WaitUser
        {
            entry.dialog.status = DialogStatus::WaitOperator;
        }
        self.apply_message(message);
    }

    /// Apply the detail returned by a lock, unlock, or close call.
    ///
    /// Routed through the same merge path as a `dialog_updated` event rather
    /// than an authoritative replace, so a racing push replay of the same
    /// transition stays idempotent.
    pub fn apply_updated_detail(&mut self, detail: DialogDetail) {
        let snapshot = DialogSnapshot {
            dialog: detail.dialog,
            last_message: None,
            messages: Some(detail.messages),
        };
        self.apply_snapshot(snapshot, false);
    }

    /// Merge a dialog snapshot (summary- or detail-shaped) into both views.
    fn apply_snapshot(&mut self, snapshot: DialogSnapshot, created: bool) {
        let mut summary = snapshot.summary();

        if let Some(detail) = self.details.get_mut(&snapshot.dialog.id) {
            let prior = detail.dialog.last_message_at;
            // An event may carry a partial message view; union, never overwrite.
            if let Some(messages) = snapshot.messages {
                merge_messages(&mut detail.messages, messages);
            }
            if let Some(last) = snapshot.last_message {
                merge_messages(&mut detail.messages, [last]);
            }
            detail.dialog = snapshot.dialog;
            detail.dialog.last_message_at = max_timestamp(prior, detail.dialog.last_message_at);
            // With a detail loaded, the merged message list is the source of
            // truth for the preview; a stale snapshot projection must not
            // regress it.
            summary.last_message = detail.last_message().cloned();
            summary.dialog.last_message_at = detail.dialog.last_message_at;
        }

        self.upsert_summary(summary, created);
    }

    /// Upsert a summary into its bot's list, honoring the ordering policy.
    fn upsert_summary(&mut self, mut summary: DialogSummary, created: bool) {
        let list = self.summaries.entry(summary.dialog.bot_id).or_default();
        let move_to_front = created || self.order == ListOrder::MoveToFront;

        if let Some(pos) = list.iter().position(|s| s.dialog.id == summary.dialog.id) {
            let existing = &list[pos];
            summary.dialog.last_message_at =
                max_timestamp(existing.dialog.last_message_at, summary.dialog.last_message_at);
            // A lock projection may arrive without a message preview; keep the
            // one we already have rather than blanking it.
            if summary.last_message.is_none() {
                summary.last_message = existing.last_message.clone();
            }
            if move_to_front {
                list.remove(pos);
                list.insert(0, summary);
            } else {
                list[pos] = summary;
            }
        } else {
            list.insert(0, summary);
        }
    }

    /// Merge a single observed message.
    ///
    /// With a loaded detail record the message joins the list via the merge
    /// rule; the summary preview is then re-derived from the list. With only a
    /// summary entry, the preview fields are patched in place if the message
    /// is at least as recent. With neither, the message is dropped; a later
    /// detail load is authoritative and re-synthesizes it.
    fn apply_message(&mut self, message: Message) {
        let dialog_id = message.dialog_id;

        if let Some(detail) = self.details.get_mut(&dialog_id) {
            merge_messages(&mut detail.messages, [message.clone()]);
            detail.dialog.last_message_at =
                max_timestamp(detail.dialog.last_message_at, Some(message.created_at));
            let derived_last = detail.last_message().cloned();
            let derived_at = detail.dialog.last_message_at;
            if let Some(entry) = self.summary_mut(dialog_id) {
                entry.last_message = derived_last;
                entry.dialog.last_message_at = derived_at;
            }
            return;
        }

        if let Some(entry) = self.summary_mut(dialog_id) {
            let is_newer = match (&entry.last_message, entry.dialog.last_message_at) {
                (Some(last), _) => (message.created_at, message.id) >= (last.created_at, last.id),
                (None, Some(at)) => message.created_at >= at,
                (None, None) => true,
            };
            if is_newer {
                entry.dialog.last_message_at =
                    max_timestamp(entry.dialog.last_message_at, Some(message.created_at));
                entry.last_message = Some(message);
            }
            return;
        }

        debug!(dialog_id, "message for unloaded dialog dropped");
    }

    fn summary_mut(&mut self, dialog_id: i64) -> Option<&mut DialogSummary> {
        self.summaries
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|s| s.dialog.id == dialog_id)
    }
}
