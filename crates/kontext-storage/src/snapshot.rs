// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the snapshot store.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use kontext_core::{AdapterType, HealthStatus, KontextError, PluginAdapter, StateStore};

use crate::database::{Database, map_tr_err};

/// Row key under which the application snapshot is stored.
pub const SNAPSHOT_KEY: &str = "kontext-state";

/// Keeps the application snapshot in the `app_state` table.
pub struct SqliteStateStore {
    db: Database,
}

impl SqliteStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteStateStore {
    fn name(&self) -> &str {
        "sqlite-state-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::StateStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KontextError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KontextError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load_snapshot(&self) -> Result<Option<String>, KontextError> {
        self.db
            .connection()
            .call(|conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM app_state WHERE key = ?1",
                    params![SNAPSHOT_KEY],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn save_snapshot(&self, snapshot: &str) -> Result<(), KontextError> {
        let value = snapshot.to_string();
        let bytes = value.len();
        let updated_at = Utc::now().to_rfc3339();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                     updated_at = excluded.updated_at",
                    params![SNAPSHOT_KEY, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(bytes, "snapshot written");
        Ok(())
    }
}
