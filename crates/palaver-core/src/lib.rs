// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Palaver operator console.
//!
//! This crate provides the error type, the domain entities (dialogs and
//! messages), and the push event envelope shared by every other crate in the
//! workspace. It has no I/O of its own.

pub mod error;
pub mod event;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PalaverError;
pub use event::{DialogSnapshot, PushEvent};
pub use types::{
    CredentialPair, Dialog, DialogDetail, DialogStatus, DialogSummary, Message, MessageSender,
    Page, UserProfile,
};
