// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog list, detail, message, and handoff command implementations.

use chrono::{DateTime, Utc};
use palaver_api::{ApiClient, DialogFilters, OutgoingMessage};
use palaver_core::{DialogDetail, DialogSummary, Message, PalaverError};

/// Operator handoff actions on a dialog.
#[derive(Debug, Clone, Copy)]
pub enum DialogAction {
    Lock,
    Unlock,
    Close,
}

/// Run the `palaver dialogs` command.
///
/// A `--query` filter switches from the list endpoint to full-text search;
/// both return the same page shape.
pub async fn run_list(
    client: &ApiClient,
    bot_id: i64,
    filters: &DialogFilters,
    page: u32,
    per_page: u32,
    json: bool,
) -> Result<(), PalaverError> {
    let result = if filters.query.is_some() {
        client.search_dialogs(bot_id, filters, page, per_page).await?
    } else {
        client.list_dialogs(bot_id, filters, page, per_page).await?
    };

    if json {
        println!("{}", to_pretty_json(&result)?);
        return Ok(());
    }

    if result.items.is_empty() {
        println!("No dialogs.");
        return Ok(());
    }

    for summary in &result.items {
        println!("{}", format_summary_line(summary));
    }
    println!(
        "page {}/{} ({} total{})",
        result.page,
        result.total.div_ceil(u64::from(result.per_page.max(1))),
        result.total,
        if result.has_next { ", more available" } else { "" },
    );
    Ok(())
}

/// Run the `palaver show` command.
pub async fn run_show(
    client: &ApiClient,
    bot_id: i64,
    dialog_id: i64,
    json: bool,
) -> Result<(), PalaverError> {
    let detail = client.get_dialog(bot_id, dialog_id).await?;

    if json {
        println!("{}", to_pretty_json(&detail)?);
        return Ok(());
    }

    print_detail_header(&detail);
    for message in &detail.messages {
        println!("{}", format_message_line(message));
    }
    Ok(())
}

/// Run the `palaver send` command.
pub async fn run_send(
    client: &ApiClient,
    bot_id: i64,
    dialog_id: i64,
    text: &str,
) -> Result<(), PalaverError> {
    let message = client
        .send_message(bot_id, dialog_id, &OutgoingMessage::text(text))
        .await?;
    println!("Sent message {} to dialog {dialog_id}.", message.id);
    Ok(())
}

/// Run `palaver lock`, `unlock`, or `close`.
pub async fn run_action(
    client: &ApiClient,
    bot_id: i64,
    dialog_id: i64,
    action: DialogAction,
) -> Result<(), PalaverError> {
    let detail = match action {
        DialogAction::Lock => client.lock_dialog(bot_id, dialog_id).await?,
        DialogAction::Unlock => client.unlock_dialog(bot_id, dialog_id).await?,
        DialogAction::Close => client.close_dialog(bot_id, dialog_id).await?,
    };
    print_detail_header(&detail);
    Ok(())
}

fn print_detail_header(detail: &DialogDetail) {
    let dialog = &detail.dialog;
    println!(
        "dialog {} [{}] status={} locked={} closed={} unread={}",
        dialog.id,
        dialog.channel_type,
        dialog.status,
        dialog.is_locked,
        dialog.closed,
        dialog.unread_messages_count,
    );
}

pub(crate) fn format_summary_line(summary: &DialogSummary) -> String {
    let dialog = &summary.dialog;
    let preview = summary
        .last_message
        .as_ref()
        .and_then(|m| m.text.as_deref())
        .unwrap_or("-");
    format!(
        "{:>8}  {:<12} {:<14} {}  {}",
        dialog.id,
        dialog.channel_type,
        dialog.status.to_string(),
        format_timestamp(dialog.last_message_at),
        truncate(preview, 60),
    )
}

fn format_message_line(message: &Message) -> String {
    let body = message
        .text
        .as_deref()
        .unwrap_or("[attachment]");
    format!(
        "{}  {:<8} {}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        message.sender.to_string(),
        body,
    )
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, PalaverError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PalaverError::Internal(format!("failed to serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 60), "short");
        let long = "а".repeat(80); // cyrillic, multi-byte
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('\u{2026}'));
    }
}
