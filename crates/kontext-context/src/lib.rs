// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context-window engine for Kontext.
//!
//! - [`tokens`]: length-based token estimation
//! - [`usage`]: usage ratio, health state, and the auto-summarization trigger
//! - [`summarizer`]: folds old history into a synthetic summary message
//! - [`prompts`]: style templates and transcript rendering

pub mod prompts;
pub mod summarizer;
pub mod tokens;
pub mod usage;

pub use summarizer::{
    SUMMARY_HEADER, SummaryOutcome, SummaryTarget, auto_summarize, draft_summary,
    generate_summary, split_history,
};
pub use tokens::{estimate, estimate_for_messages, message_cost};
pub use usage::{ContextUsage, UsageState, should_auto_summarize, usage, usage_for_key};
