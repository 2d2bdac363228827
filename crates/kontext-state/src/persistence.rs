// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot loading and the debounced background writer.
//!
//! The writer follows the store's watch channel. A burst of changes produces
//! a single save of the latest state once the channel has been quiet for the
//! debounce interval. Quota and permission failures are forwarded to the
//! caller; anything else is logged and retried with the next change.

use std::sync::Arc;
use std::time::Duration;

use kontext_core::{KontextError, StateStore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::settings::Settings;
use crate::store::AppState;

/// Reads the last snapshot from `store`.
///
/// A missing, unreadable or corrupt snapshot yields a fresh state seeded with
/// `settings`. Loading never fails.
pub async fn load_app_state(store: &dyn StateStore, settings: Settings) -> AppState {
    let fresh = || AppState {
        settings: settings.clone(),
        ..AppState::default()
    };

    let raw = match store.load_snapshot().await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no snapshot found, starting fresh");
            return fresh();
        }
        Err(e) => {
            warn!(error = %e, "failed to read snapshot, starting fresh");
            return fresh();
        }
    };

    match serde_json::from_str::<AppState>(&raw) {
        Ok(mut state) => {
            if let Some(id) = &state.active_conversation_id
                && !state.conversations.contains_key(id)
            {
                state.active_conversation_id = None;
            }
            info!(
                conversations = state.conversations.len(),
                "snapshot loaded"
            );
            state
        }
        Err(e) => {
            warn!(error = %e, "snapshot is corrupt, starting fresh");
            fresh()
        }
    }
}

/// Handle to the background writer task.
pub struct PersistenceWriter {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PersistenceWriter {
    /// Spawns the writer. The returned receiver yields user-actionable save failures.
    pub fn spawn(
        store: Arc<dyn StateStore>,
        changes: watch::Receiver<AppState>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<KontextError>) {
        let cancel = CancellationToken::new();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(
            store,
            changes,
            debounce,
            cancel.clone(),
            errors_tx,
        ));
        (Self { cancel, handle }, errors_rx)
    }

    /// Writes any pending change immediately and stops the writer.
    pub async fn flush(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "persistence writer task failed");
        }
    }
}

async fn run_writer(
    store: Arc<dyn StateStore>,
    mut changes: watch::Receiver<AppState>,
    debounce: Duration,
    cancel: CancellationToken,
    errors: mpsc::UnboundedSender<KontextError>,
) {
    loop {
        // Wait for the first change of a burst.
        let stop = tokio::select! {
            () = cancel.cancelled() => true,
            changed = changes.changed() => changed.is_err(),
        };
        if stop {
            break;
        }

        // Quiet period: every further change restarts it.
        let mut stop = false;
        loop {
            tokio::select! {
                () = cancel.cancelled() => { stop = true; break; }
                () = tokio::time::sleep(debounce) => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        stop = true;
                        break;
                    }
                }
            }
        }

        save_latest(store.as_ref(), &mut changes, &errors).await;
        if stop {
            return;
        }
    }

    if changes.has_changed().unwrap_or(false) {
        save_latest(store.as_ref(), &mut changes, &errors).await;
    }
}

async fn save_latest(
    store: &dyn StateStore,
    changes: &mut watch::Receiver<AppState>,
    errors: &mpsc::UnboundedSender<KontextError>,
) {
    let snapshot = {
        let state = changes.borrow_and_update();
        serde_json::to_string(&*state)
    };
    let snapshot = match snapshot {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot");
            return;
        }
    };

    match store.save_snapshot(&snapshot).await {
        Ok(()) => debug!(bytes = snapshot.len(), "snapshot saved"),
        Err(e) if e.is_user_visible() => {
            warn!(error = %e, "snapshot save failed");
            let _ = errors.send(e);
        }
        Err(e) => warn!(error = %e, "transient snapshot save failure, will retry on next change"),
    }
}
