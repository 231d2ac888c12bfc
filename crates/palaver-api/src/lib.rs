// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated REST gateway and typed endpoints for the operator console.
//!
//! [`ApiClient`] owns bearer injection and the one-shot refresh-and-retry
//! protocol; the dialog endpoint methods in [`dialogs`] build on it. REST
//! failures other than a recoverable 401 are surfaced verbatim as
//! [`palaver_core::PalaverError::Api`].

pub mod client;
pub mod dialogs;

pub use client::{ApiClient, ApiResponse};
pub use dialogs::{DialogFilters, OutgoingMessage};
