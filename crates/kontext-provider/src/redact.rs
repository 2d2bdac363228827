// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for provider error messages.

use std::sync::LazyLock;

use regex::Regex;

const REDACTED: &str = "[REDACTED]";

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Anthropic keys before the generic sk- form.
        r"sk-ant-[A-Za-z0-9_\-]{8,}",
        r"sk-[A-Za-z0-9_\-]{8,}",
        r"AIza[A-Za-z0-9_\-]{8,}",
        r"Bearer\s+[A-Za-z0-9._\-]{8,}",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Replaces anything that looks like a provider credential with `[REDACTED]`.
pub fn redact(input: &str) -> String {
    PATTERNS
        .iter()
        .fold(input.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, REDACTED).into_owned()
        })
}
