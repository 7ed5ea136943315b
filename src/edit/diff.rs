//! Diff generation using the `similar` crate.
//!
//! Renders dry-run edit previews as git-style unified diffs.

use similar::{Algorithm, TextDiff};

/// Generate a unified diff between old and new content of `file_name`.
///
/// Both sides of the header carry the same name, since an edit never
/// renames the file.
pub fn unified_diff(file_name: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);

    let body = diff
        .unified_diff()
        .context_radius(3)
        .header(file_name, file_name)
        .to_string();

    format!("Index: {file_name}\n{}\n{body}", "=".repeat(67))
}
