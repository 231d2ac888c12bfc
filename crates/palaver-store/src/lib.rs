// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory dialog store and its merge algorithm.
//!
//! Every observation of a dialog (a paginated REST page, an authoritative
//! detail load, a push event, a confirmed operator send) is folded into state
//! through the operations on [`DialogStore`]. The merge rules are commutative
//! and idempotent, so REST responses and push events may interleave in any
//! order and converge to the same state.
//!
//! All mutation is synchronous and funnels through the named operations here;
//! no other component writes to the store directly.

pub mod store;

pub use store::{merge_messages, DialogStore, ListOrder};
