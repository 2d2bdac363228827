// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion transport for Kontext.
//!
//! [`HttpTransport`] implements [`kontext_core::CompletionTransport`] over
//! the OpenAI, Anthropic and Google chat APIs. Payload shaping lives in
//! [`format`]; error bodies pass through [`redact`] before they reach logs.

pub mod client;
pub mod format;
pub mod redact;

pub use client::HttpTransport;
pub use redact::redact;
