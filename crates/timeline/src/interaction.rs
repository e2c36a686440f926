use serde::{Deserialize, Serialize};
use std::fmt;

/// Sidebar tool tabs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ToolTab {
    Text,
    Uploads,
    Voiceover,
    ImageGeneration,
    ChatBubbles,
    Reddit,
    Templates,
}

impl fmt::Display for ToolTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Uploads => "uploads",
            Self::Voiceover => "voiceover",
            Self::ImageGeneration => "imageGeneration",
            Self::ChatBubbles => "chatBubbles",
            Self::Reddit => "reddit",
            Self::Templates => "templates",
        };
        f.write_str(name)
    }
}

/// Editor interaction mode.
///
/// ```text
/// Idle -> Selecting (layer clicked) -> Editing (double-click / enter) -> Idle
/// Idle -> ToolPanelOpen (tab clicked) -> Idle
/// ```
///
/// A selection and an open tool panel never coexist: opening a tab drops the
/// selection and selecting a layer closes the panel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EditorMode {
    #[default]
    Idle,
    Selecting {
        layer_id: String,
    },
    Editing {
        layer_id: String,
    },
    ToolPanelOpen {
        tab: ToolTab,
    },
}

impl EditorMode {
    pub fn selected_layer_id(&self) -> Option<&str> {
        match self {
            Self::Selecting { layer_id } | Self::Editing { layer_id } => Some(layer_id.as_str()),
            _ => None,
        }
    }

    pub fn editing_layer_id(&self) -> Option<&str> {
        match self {
            Self::Editing { layer_id } => Some(layer_id.as_str()),
            _ => None,
        }
    }

    pub fn active_tab(&self) -> Option<ToolTab> {
        match self {
            Self::ToolPanelOpen { tab } => Some(*tab),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Layer clicked. Valid from every mode; closes any tool panel.
    pub fn select(&mut self, layer_id: impl Into<String>) {
        *self = Self::Selecting {
            layer_id: layer_id.into(),
        };
    }

    /// Double-click / Enter on the selection. Returns `false` when nothing is selected.
    pub fn start_editing(&mut self) -> bool {
        match self {
            Self::Selecting { layer_id } => {
                *self = Self::Editing {
                    layer_id: std::mem::take(layer_id),
                };
                true
            }
            Self::Editing { .. } => true,
            _ => false,
        }
    }

    /// Sidebar tab clicked. Drops the selection.
    pub fn open_tool_panel(&mut self, tab: ToolTab) {
        *self = Self::ToolPanelOpen { tab };
    }

    /// Clicking the open tab again closes it; another tab switches panels.
    pub fn toggle_tool_panel(&mut self, tab: ToolTab) {
        if self.active_tab() == Some(tab) {
            *self = Self::Idle;
        } else {
            self.open_tool_panel(tab);
        }
    }

    /// Escape, click on empty canvas, or panel close.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    /// Falls back to `Idle` when the mode refers to a layer that is gone.
    pub fn forget_layer(&mut self, layer_id: &str) {
        if self.selected_layer_id() == Some(layer_id) {
            *self = Self::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_edit_idle_cycle() {
        let mut mode = EditorMode::default();
        assert!(!mode.start_editing());

        mode.select("a");
        assert_eq!(mode.selected_layer_id(), Some("a"));
        assert_eq!(mode.editing_layer_id(), None);

        assert!(mode.start_editing());
        assert_eq!(mode.editing_layer_id(), Some("a"));
        assert_eq!(mode.selected_layer_id(), Some("a"));

        mode.reset();
        assert!(mode.is_idle());
    }

    #[test]
    fn tool_panel_and_selection_are_exclusive() {
        let mut mode = EditorMode::default();
        mode.select("a");
        mode.open_tool_panel(ToolTab::Voiceover);
        assert_eq!(mode.selected_layer_id(), None);
        assert_eq!(mode.active_tab(), Some(ToolTab::Voiceover));

        mode.select("b");
        assert_eq!(mode.active_tab(), None);
        assert_eq!(mode.selected_layer_id(), Some("b"));
    }

    #[test]
    fn toggling_open_tab_closes_it() {
        let mut mode = EditorMode::default();
        mode.toggle_tool_panel(ToolTab::Text);
        mode.toggle_tool_panel(ToolTab::Uploads);
        assert_eq!(mode.active_tab(), Some(ToolTab::Uploads));
        mode.toggle_tool_panel(ToolTab::Uploads);
        assert!(mode.is_idle());
    }

    #[test]
    fn forgetting_selected_layer_returns_to_idle() {
        let mut mode = EditorMode::Editing {
            layer_id: "x".to_string(),
        };
        mode.forget_layer("y");
        assert_eq!(mode.editing_layer_id(), Some("x"));
        mode.forget_layer("x");
        assert!(mode.is_idle());
    }
}
