use crate::walker::DEFAULT_EXCLUDED_NAMES;
use dirdiff_common::{DiffKind, DiffPolicy};
use std::path::Path;

/// Files larger than this on either side are never text-diffed
pub const MAX_TEXT_DIFF_BYTES: u64 = 1024 * 1024;

/// Number of leading bytes scanned for a NUL when sniffing binary content
pub const BINARY_SNIFF_BYTES: usize = 8000;

/// Extensions (lowercase, with leading dot) always treated as binary
pub const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".ico", ".pdf", ".zip", ".gz", ".mp3",
    ".mp4", ".mov", ".exe", ".dll", ".so", ".dylib",
];

/// Decide how a differing pair should be compared.
///
/// The size ceiling is checked before the extension, so an oversized image is
/// `TooLarge` rather than `Binary`.
pub fn classify_diff_kind(relative_path: &str, left_size: u64, right_size: u64) -> DiffKind {
    if left_size > MAX_TEXT_DIFF_BYTES || right_size > MAX_TEXT_DIFF_BYTES {
        return DiffKind::TooLarge;
    }

    if is_binary_path(relative_path) {
        return DiffKind::Binary;
    }

    DiffKind::Text
}

pub fn is_binary_path(path: impl AsRef<Path>) -> bool {
    match dotted_extension(path.as_ref()) {
        Some(ext) => BINARY_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// True when a NUL byte appears within the first `BINARY_SNIFF_BYTES` bytes
pub fn has_binary_content(content: &[u8]) -> bool {
    let len = content.len().min(BINARY_SNIFF_BYTES);
    content[..len].contains(&0)
}

/// Snapshot of the active policy for display by hosts
pub fn diff_policy() -> DiffPolicy {
    DiffPolicy {
        max_text_diff_bytes: MAX_TEXT_DIFF_BYTES,
        binary_extensions: BINARY_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        default_exclude_names: DEFAULT_EXCLUDED_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect(),
    }
}

fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
