// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kontext.
//!
//! Mock collaborators for fast, deterministic tests without network access
//! or a database.
//!
//! - [`MockTransport`] - scripted completion transport that records requests
//! - [`MemoryStateStore`] / [`MemoryCredentialStore`] - in-memory stores
//!   with injectable failures
//! - [`fixtures`] - message builders

pub mod fixtures;
pub mod memory_stores;
pub mod mock_transport;

pub use memory_stores::{MemoryCredentialStore, MemoryStateStore};
pub use mock_transport::{MockTransport, RecordedRequest, ScriptedReply};
