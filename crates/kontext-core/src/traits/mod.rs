// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits for the Kontext core.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod credentials;
pub mod state_store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use credentials::{CredentialStore, Credentials};
pub use state_store::StateStore;
pub use transport::CompletionTransport;
