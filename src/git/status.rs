//! Changed-file listings parsed from `git status` and `git diff` output.

use serde::{Deserialize, Serialize};

/// How a file changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// New file.
    Added,
    /// Removed file.
    Deleted,
    /// Moved file.
    Renamed,
    /// Anything else, including untracked files.
    #[default]
    #[serde(other)]
    Modified,
}

impl FileStatus {
    /// Maps a porcelain `XY` code.
    fn from_porcelain(code: &str) -> Self {
        let code = code.trim();
        if code.contains('A') {
            Self::Added
        } else if code.contains('D') {
            Self::Deleted
        } else if code.contains('R') {
            Self::Renamed
        } else {
            Self::Modified
        }
    }

    /// Maps a `--name-status` code such as `M` or `R087`.
    fn from_name_status(code: &str) -> Self {
        match code.chars().next() {
            Some('A') => Self::Added,
            Some('D') => Self::Deleted,
            Some('R') => Self::Renamed,
            _ => Self::Modified,
        }
    }

    /// Two-column marker used when listing files.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Added => "+ ",
            Self::Deleted => "- ",
            Self::Renamed => "~ ",
            Self::Modified => "• ",
        }
    }
}

/// One changed file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Kind of change.
    pub status: FileStatus,
    /// The change sits in the index with nothing left in the working tree.
    #[serde(skip)]
    pub index_only: bool,
}

impl FileChange {
    /// Creates a file change.
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            index_only: false,
        }
    }

    /// Marks the change as already staged in full.
    #[must_use]
    pub fn in_index(mut self) -> Self {
        self.index_only = true;
        self
    }
}

/// Parses `git status --porcelain -z` output.
///
/// Entries are `XY path` separated by NUL; renames and copies are followed by
/// an extra entry holding the source path, which is dropped.
pub fn parse_porcelain(output: &str) -> Vec<FileChange> {
    let mut entries = output.split('\0');
    let mut changes = Vec::new();
    while let Some(entry) = entries.next() {
        let (Some(code), Some(path)) = (entry.get(..2), entry.get(3..)) else {
            continue;
        };
        let (index, worktree) = (code.as_bytes()[0], code.as_bytes()[1]);
        if matches!(index, b'R' | b'C') {
            entries.next();
        }
        if path.is_empty() {
            continue;
        }
        let change = FileChange::new(path, FileStatus::from_porcelain(code));
        changes.push(if worktree == b' ' && index != b' ' {
            change.in_index()
        } else {
            change
        });
    }
    changes
}

/// Parses `git diff --name-status -z` output.
///
/// Each code is followed by one path, or two for renames and copies, in
/// which case the destination is kept.
pub fn parse_name_status(output: &str) -> Vec<FileChange> {
    let mut fields = output.split('\0');
    let mut changes = Vec::new();
    while let Some(code) = fields.next() {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let mut path = fields.next();
        if code.starts_with(['R', 'C']) {
            path = fields.next();
        }
        match path {
            Some(path) if !path.is_empty() => {
                changes.push(FileChange::new(path, FileStatus::from_name_status(code)));
            }
            _ => break,
        }
    }
    changes
}
