use std::time::Duration;

/// Thresholds above which deleting a block asks for confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportanceRules {
    /// Tag-stripped characters in a text block.
    pub text_chars: usize,
    /// Characters in a banner, callout or title.
    pub banner_chars: usize,
}

impl Default for ImportanceRules {
    fn default() -> Self {
        Self {
            text_chars: 100,
            banner_chars: 20,
        }
    }
}

/// Per-session tuning for the editing controllers.
#[derive(Clone, Debug)]
pub struct EditorConfig {
    /// Undo entries kept before the oldest is evicted.
    pub undo_capacity: usize,
    /// How long the "Undo" affordance stays up after a deletion.
    pub undo_toast: Duration,
    /// How long informational notices stay up.
    pub notice_timeout: Duration,
    /// Maximum gap between clicks counted as a double click.
    pub double_click: Duration,
    pub importance: ImportanceRules,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_capacity: 20,
            undo_toast: Duration::from_secs(5),
            notice_timeout: Duration::from_secs(4),
            double_click: Duration::from_millis(400),
            importance: ImportanceRules::default(),
        }
    }
}
