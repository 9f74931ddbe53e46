use crate::OperationFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use uuid::Uuid;

/// A regular file found under a comparison root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub absolute_path: PathBuf,
    /// Root-relative, `/`-separated path; the identity key across roots
    pub relative_path: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl DirectoryEntry {
    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            size: self.size,
            modified: self.modified,
        }
    }
}

/// Files of one root, sorted by relative path with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<DirectoryEntry>,
}

impl Inventory {
    /// Sorts entries byte-wise by relative path. When a relative path occurs
    /// more than once, the first occurrence is kept.
    pub fn new(mut entries: Vec<DirectoryEntry>) -> Self {
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        entries.dedup_by(|later, earlier| later.relative_path == earlier.relative_path);
        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn relative_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.relative_path.as_str())
    }

    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a DirectoryEntry;
    type IntoIter = std::slice::Iter<'a, DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Size and modification time of one side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub size: u64,
    #[serde(rename = "modified_ms", with = "system_time_ms")]
    pub modified: SystemTime,
}

/// Status of a compared relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStatus {
    /// Size and modification time match on both sides
    Same,
    /// Present on both sides with differing size or modification time
    Different,
    /// Present only under the left root
    LeftOnly,
    /// Present only under the right root
    RightOnly,
}

impl CompareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareStatus::Same => "same",
            CompareStatus::Different => "different",
            CompareStatus::LeftOnly => "left_only",
            CompareStatus::RightOnly => "right_only",
        }
    }
}

/// How a differing file pair should be compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Text,
    Binary,
    TooLarge,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::Text => "text",
            DiffKind::Binary => "binary",
            DiffKind::TooLarge => "too_large",
        }
    }
}

/// Merged comparison result for one relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareItem {
    pub relative_path: String,
    pub status: CompareStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<FileSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<FileSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_kind_hint: Option<DiffKind>,
}

/// Item counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    pub same: usize,
    pub different: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl CompareSummary {
    pub fn record(&mut self, status: CompareStatus) {
        match status {
            CompareStatus::Same => self.same += 1,
            CompareStatus::Different => self.different += 1,
            CompareStatus::LeftOnly => self.left_only += 1,
            CompareStatus::RightOnly => self.right_only += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.same + self.different + self.left_only + self.right_only
    }

    pub fn count(&self, status: CompareStatus) -> usize {
        match status {
            CompareStatus::Same => self.same,
            CompareStatus::Different => self.different,
            CompareStatus::LeftOnly => self.left_only,
            CompareStatus::RightOnly => self.right_only,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

/// One line of a computed text diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiffLine {
    pub kind: DiffLineKind,
    /// Line content without its trailing newline
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_line_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_line_number: Option<usize>,
}

impl FileDiffLine {
    pub fn context(text: impl Into<String>, left: usize, right: usize) -> Self {
        Self {
            kind: DiffLineKind::Context,
            text: text.into(),
            left_line_number: Some(left),
            right_line_number: Some(right),
        }
    }

    pub fn removed(text: impl Into<String>, left: usize) -> Self {
        Self {
            kind: DiffLineKind::Removed,
            text: text.into(),
            left_line_number: Some(left),
            right_line_number: None,
        }
    }

    pub fn added(text: impl Into<String>, right: usize) -> Self {
        Self {
            kind: DiffLineKind::Added,
            text: text.into(),
            left_line_number: None,
            right_line_number: Some(right),
        }
    }

    /// Synthetic context line standing in for `hidden` collapsed lines
    pub fn placeholder(hidden: usize) -> Self {
        Self {
            kind: DiffLineKind::Context,
            text: format!("... {} context lines hidden ...", hidden),
            left_line_number: None,
            right_line_number: None,
        }
    }

    /// Placeholders are the only context lines without line numbers
    pub fn is_placeholder(&self) -> bool {
        self.kind == DiffLineKind::Context
            && self.left_line_number.is_none()
            && self.right_line_number.is_none()
    }
}

/// Line alignment algorithm used by the line differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
}

/// Read-only diff policy constants surfaced to hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPolicy {
    pub max_text_diff_bytes: u64,
    pub binary_extensions: Vec<String>,
    pub default_exclude_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub left_path: String,
    pub right_path: String,
    #[serde(default)]
    pub exclude_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiffRequest {
    pub left_root_path: String,
    pub right_root_path: String,
    pub relative_path: String,
}

/// Successful result of a directory comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub left_root: PathBuf,
    pub right_root: PathBuf,
    pub left_file_count: usize,
    pub right_file_count: usize,
    pub applied_exclude_names: Vec<String>,
    pub policy: DiffPolicy,
    pub summary: CompareSummary,
    pub items: Vec<CompareItem>,
}

/// Successful result of a single file diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiffReport {
    pub relative_path: String,
    pub kind: DiffKind,
    /// Empty unless `kind` is `Text`
    pub lines: Vec<FileDiffLine>,
    pub added: usize,
    pub removed: usize,
    pub max_bytes: u64,
}

pub type CompareResult = std::result::Result<CompareReport, OperationFailure>;
pub type FileDiffResult = std::result::Result<FileDiffReport, OperationFailure>;

/// `{"ok": true, "data": ...}` / `{"ok": false, "error": ...}` envelope for hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationFailure>,
}

impl<T> From<std::result::Result<T, OperationFailure>> for Response<T> {
    fn from(result: std::result::Result<T, OperationFailure>) -> Self {
        match result {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Names excluded at every depth, on top of the built-in defaults
    #[serde(default)]
    pub exclude_names: Vec<String>,

    /// Show every context line in file diffs instead of collapsing long runs
    #[serde(default)]
    pub show_all_context: bool,

    #[serde(default)]
    pub diff_algorithm: DiffAlgorithm,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

/// Serde adapter storing a `SystemTime` as fractional milliseconds since the epoch
pub mod system_time_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn to_millis(time: SystemTime) -> f64 {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64() * 1000.0,
            Err(e) => -(e.duration().as_secs_f64() * 1000.0),
        }
    }

    /// `None` when `ms` is not finite or falls outside the platform's time range
    pub fn from_millis(ms: f64) -> Option<SystemTime> {
        let offset = Duration::try_from_secs_f64(ms.abs() / 1000.0).ok()?;
        if ms >= 0.0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_millis(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        from_millis(ms).ok_or_else(|| {
            serde::de::Error::custom(format!("modification time out of range: {}", ms))
        })
    }
}
