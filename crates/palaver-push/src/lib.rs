// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push connection manager for the operator console.
//!
//! Maintains a single websocket to the platform's event stream, decodes
//! frames into [`palaver_core::PushEvent`]s, fans them out to subscribers,
//! and reconnects with capped exponential backoff while a token is set.

pub mod connection;

pub use connection::{ConnectionState, EventSubscription, PushConfig, PushManager};
