// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state for Kontext.
//!
//! - [`store`]: the conversation state manager and its atomic operations
//! - [`settings`] / [`ui`]: runtime settings with explicit merge, UI preferences
//! - [`persistence`]: snapshot loading and the debounced writer
//! - [`session`]: send, auto-summarize and manual summary flows
//! - [`export`]: single-conversation JSON export

pub mod export;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod store;
pub mod ui;

pub use export::{ConversationExport, export_conversation};
pub use persistence::{PersistenceWriter, load_app_state};
pub use session::{AutoSummary, ChatSession, SendOutcome, SummaryReport};
pub use settings::{ApiKeys, Settings, SettingsPatch};
pub use store::{AppState, ConversationStore, derive_title};
pub use ui::{SidebarState, UiPreferences, UiPreferencesPatch};
