// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage contract for the serialized application snapshot.

use async_trait::async_trait;

use crate::error::KontextError;
use crate::traits::adapter::PluginAdapter;

/// Holds a single JSON snapshot of the application state.
///
/// Failures are reported as [`KontextError::Storage`] so callers can tell
/// user-actionable causes from transient ones.
#[async_trait]
pub trait StateStore: PluginAdapter {
    /// Returns the last saved snapshot, or `None` on first start.
    async fn load_snapshot(&self) -> Result<Option<String>, KontextError>;

    /// Replaces the stored snapshot.
    async fn save_snapshot(&self, snapshot: &str) -> Result<(), KontextError>;
}
