// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations and checkpointing.
//!
//! All statements run on tokio-rusqlite's single background thread. Every
//! component that needs the database shares one [`Database`] handle.

use std::path::{Path, PathBuf};

use kontext_core::KontextError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Converts a tokio-rusqlite failure into a classified storage error.
pub fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> KontextError
where
    E: std::error::Error + Send + Sync + 'static,
{
    KontextError::storage(e.to_string(), Some(Box::new(e)))
}

/// An open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, KontextError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                KontextError::storage(
                    format!("cannot create {}: {e}", parent.display()),
                    Some(Box::new(e)),
                )
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| KontextError::storage(e.to_string(), Some(Box::new(e))))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(run_migrations).await.map_err(map_tr_err)?;

        debug!(path = %path.display(), "database opened");
        Ok(Self { conn, path })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoints the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), KontextError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
