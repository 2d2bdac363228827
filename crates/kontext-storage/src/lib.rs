// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Kontext.
//!
//! Provides a WAL-mode database with embedded migrations, shared by the
//! snapshot store and the credential vault, and the [`SqliteStateStore`]
//! that keeps the application snapshot.

pub mod database;
pub mod migrations;
pub mod snapshot;

pub use database::{Database, map_tr_err};
pub use snapshot::{SNAPSHOT_KEY, SqliteStateStore};
