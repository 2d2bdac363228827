// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text formatting for terminal output. Colors are applied by callers.

use colored::{ColoredString, Colorize};
use kontext_context::{ContextUsage, UsageState};
use kontext_core::{Message, Role};

/// `1234567` -> `1,234,567`.
pub fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn usage_line(usage: &ContextUsage) -> String {
    format!(
        "{} / {} tokens ({:.1}%, {})",
        thousands(usage.total_tokens),
        thousands(usage.context_window),
        usage.usage_percent,
        usage.state
    )
}

pub fn paint_usage(usage: &ContextUsage) -> ColoredString {
    let line = usage_line(usage);
    match usage.state {
        UsageState::Healthy => line.green(),
        UsageState::Warning => line.yellow(),
        UsageState::Critical => line.bright_red(),
        UsageState::Danger => line.red().bold(),
    }
}

/// Shortens `text` to `max` characters, ending with `…` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn role_label(message: &Message) -> &'static str {
    if message.is_auto_summary() {
        return "summary";
    }
    match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

pub fn paint_role(message: &Message) -> ColoredString {
    let label = role_label(message);
    match message.role {
        Role::User => label.cyan().bold(),
        Role::Assistant => label.green().bold(),
        Role::System => label.magenta().bold(),
    }
}
