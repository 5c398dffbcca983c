use std::path::{Component, Path};

use tracing::trace;

use crate::glob::Pattern;

/// Patterns excluded from every archive unless the caller supplies its own list.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "**/*.xpi",
    "**/*.zip",
    "**/.*", // any hidden file or directory
];

/// Allows or ignores files when building the archive.
#[derive(Debug, Clone)]
pub struct FileFilter {
    files_to_ignore: Vec<Pattern>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_PATTERNS.iter().copied())
    }
}

impl FileFilter {
    /// Build a filter from an ignore list. The list replaces the defaults entirely.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            files_to_ignore: patterns
                .into_iter()
                .map(|p| Pattern::new(p.as_ref()))
                .collect(),
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.files_to_ignore.iter().map(Pattern::as_str)
    }

    /// Returns true if the file at `relative_path` belongs in the archive.
    ///
    /// A pattern excludes a path when it matches the path itself or any of its
    /// ancestor directories, so `**/.*` hides everything under `.git/`.
    /// Patterns are tested in order and the first match wins.
    pub fn want_file(&self, relative_path: impl AsRef<Path>) -> bool {
        let relative_path = relative_path.as_ref();
        let parts: Vec<String> = relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();

        for pattern in &self.files_to_ignore {
            if (1..=parts.len()).any(|end| pattern.matches_segments(&parts[..end])) {
                trace!(
                    "Not including file {} in archive (matched {})",
                    relative_path.display(),
                    pattern.as_str()
                );
                return false;
            }
        }
        true
    }
}
