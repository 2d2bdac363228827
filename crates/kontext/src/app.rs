// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup and shutdown of the runtime collaborators.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use kontext_config::KontextConfig;
use kontext_core::{CompletionTransport, CredentialStore, KontextError, PluginAdapter, StateStore};
use kontext_provider::HttpTransport;
use kontext_state::{
    ChatSession, ConversationStore, PersistenceWriter, Settings, load_app_state,
};
use kontext_storage::{Database, SqliteStateStore};
use kontext_vault::{VaultCredentialStore, open_vault};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct App {
    pub session: ChatSession,
    writer: PersistenceWriter,
    save_errors: mpsc::UnboundedReceiver<KontextError>,
    state_store: Arc<dyn StateStore>,
}

impl App {
    /// Opens the database, unlocks the vault and restores the last snapshot.
    pub async fn open(config: &KontextConfig) -> Result<Self, KontextError> {
        let db = Database::open(&config.storage.database_path).await?;
        let vault = open_vault(&db, &config.vault).await?;

        let credentials: Arc<dyn CredentialStore> = Arc::new(VaultCredentialStore::new(vault));
        let state_store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(db));
        let transport: Arc<dyn CompletionTransport> =
            Arc::new(HttpTransport::new(&config.providers)?);

        let state = load_app_state(state_store.as_ref(), Settings::from_config(config)).await;
        let store = Arc::new(ConversationStore::new(state));
        let (writer, save_errors) = PersistenceWriter::spawn(
            Arc::clone(&state_store),
            store.subscribe(),
            Duration::from_millis(config.storage.save_debounce_ms),
        );

        let session = ChatSession::new(store, transport, credentials);
        session.load_credentials().await?;
        debug!("application ready");

        Ok(Self {
            session,
            writer,
            save_errors,
            state_store,
        })
    }

    pub fn store(&self) -> &ConversationStore {
        self.session.store()
    }

    /// Writes pending state and releases the database.
    pub async fn close(self) {
        let Self {
            writer,
            mut save_errors,
            state_store,
            ..
        } = self;

        writer.flush().await;
        while let Ok(e) = save_errors.try_recv() {
            eprintln!("{}: could not save state: {e}", "warning".yellow());
        }
        if let Err(e) = state_store.shutdown().await {
            warn!(error = %e, "state store shutdown failed");
        }
    }
}
