//! Sequential exact-match edit engine.
//!
//! Edits are applied in order against an in-memory buffer. Each edit
//! replaces the first occurrence of its `old_text` in the buffer as left by
//! the edits before it. Nothing here touches the filesystem: callers persist
//! the final buffer only when [`apply_edits`] succeeds.

pub mod diff;

use serde::Deserialize;
use tracing::debug;

use crate::error::{StataError, StataResult};

/// One text replacement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditOperation {
    /// Text to search for; must match exactly.
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
}

impl EditOperation {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }
}

/// Apply `edits` to `content` in order and return the final buffer.
///
/// # Errors
///
/// [`StataError::EditNotFound`] for the first edit whose `old_text` is not
/// present in the buffer at that point. The partially edited buffer is
/// dropped.
pub fn apply_edits(content: &str, edits: &[EditOperation]) -> StataResult<String> {
    let mut buffer = content.to_owned();

    for (i, edit) in edits.iter().enumerate() {
        if !buffer.contains(edit.old_text.as_str()) {
            debug!(index = i, "edit target not found");
            return Err(StataError::EditNotFound {
                text: edit.old_text.clone(),
            });
        }
        buffer = buffer.replacen(edit.old_text.as_str(), &edit.new_text, 1);
    }

    Ok(buffer)
}
