// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `palaver watch` command implementation.
//!
//! Follows the live event stream for one bot: loads the first page of
//! dialogs, then applies every push event to the in-memory store and prints
//! the resulting dialog line. Ctrl-C closes the stream and exits.

use std::time::Duration;

use palaver_api::{ApiClient, DialogFilters};
use palaver_config::PalaverConfig;
use palaver_core::{PalaverError, PushEvent};
use palaver_push::{ConnectionState, PushManager};
use palaver_store::DialogStore;
use tracing::{info, warn};

use crate::dialogs;

/// Run the `palaver watch` command.
pub async fn run_watch(
    client: &ApiClient,
    config: &PalaverConfig,
    bot_id: i64,
    json: bool,
) -> Result<(), PalaverError> {
    let Some(pair) = client.session().read() else {
        return Err(PalaverError::Config(
            "no stored credentials; run `palaver login <email>` first".to_string(),
        ));
    };

    let mut store = DialogStore::new(config.console.list_order);
    let page = client
        .list_dialogs(bot_id, &DialogFilters::default(), 1, config.console.page_size)
        .await?;
    let loaded = page.items.len();
    store.load_summaries(bot_id, page.items);
    info!(bot_id, loaded, "initial dialog list loaded");

    let manager = PushManager::new(push_config(config));
    let mut subscription = manager.subscribe();
    manager.connect(&pair.access_token).await;

    println!("Watching bot {bot_id} ({loaded} dialogs loaded). Ctrl-C to stop.");

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                handle_event(&mut store, event, json);
            }
            _ = tokio::signal::ctrl_c() => break,
            // Periodic poll so a permanently failed connection ends the loop
            // even when no events arrive.
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }

        if manager.state().await == ConnectionState::Disconnected {
            warn!("push connection gave up; exiting watch");
            break;
        }
    }

    manager.disconnect().await;
    println!("Stopped.");
    Ok(())
}

fn handle_event(store: &mut DialogStore, event: PushEvent, json: bool) {
    if json {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(error = %err, "failed to render event"),
        }
        store.apply_event(event);
        return;
    }

    let dialog_id = event.dialog_id();
    store.apply_event(event);
    if let Some(summary) = store.summary(dialog_id) {
        println!("{}", dialogs::format_summary_line(summary));
    }
}

fn push_config(config: &PalaverConfig) -> palaver_push::PushConfig {
    palaver_push::PushConfig {
        url: config.push.url.clone(),
        connect_timeout: Duration::from_secs(config.push.connect_timeout_secs),
        reconnect_initial: Duration::from_secs(config.push.reconnect_initial_secs),
        reconnect_max: Duration::from_secs(config.push.reconnect_max_secs),
        max_attempts: config.push.max_attempts,
    }
}
