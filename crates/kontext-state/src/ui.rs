// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted UI preferences.

use serde::{Deserialize, Serialize};

pub const MIN_SIDEBAR_WIDTH: u32 = 240;
pub const MAX_SIDEBAR_WIDTH: u32 = 400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarState {
    #[default]
    Full,
    Collapsed,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiPreferences {
    pub sidebar_state: SidebarState,
    pub sidebar_width: u32,
    pub focus_mode: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            sidebar_state: SidebarState::Full,
            sidebar_width: 300,
            focus_mode: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiPreferencesPatch {
    pub sidebar_state: Option<SidebarState>,
    pub sidebar_width: Option<u32>,
    pub focus_mode: Option<bool>,
}

impl UiPreferences {
    pub fn apply(&mut self, patch: &UiPreferencesPatch) {
        if let Some(state) = patch.sidebar_state {
            self.sidebar_state = state;
        }
        if let Some(width) = patch.sidebar_width {
            self.set_sidebar_width(width);
        }
        if let Some(focus) = patch.focus_mode {
            self.focus_mode = focus;
        }
    }

    /// Cycles full and collapsed. A hidden sidebar comes back as full.
    pub fn toggle_sidebar(&mut self) {
        self.sidebar_state = match self.sidebar_state {
            SidebarState::Full => SidebarState::Collapsed,
            SidebarState::Collapsed | SidebarState::Hidden => SidebarState::Full,
        };
    }

    pub fn set_sidebar_width(&mut self, width: u32) {
        self.sidebar_width = width.clamp(MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH);
    }

    pub fn toggle_focus_mode(&mut self) {
        self.focus_mode = !self.focus_mode;
    }
}
