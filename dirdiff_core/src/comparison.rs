use crate::classifier::classify_inventories;
use crate::policy::{
    classify_diff_kind, diff_policy, has_binary_content, is_binary_path, MAX_TEXT_DIFF_BYTES,
};
use crate::text_diff::TextDiffEngine;
use crate::walker::{DirectoryWalker, ExcludedNames};
use chrono::Utc;
use directories::BaseDirs;
use dirdiff_common::{
    CompareRequest, CompareResult, CompareReport, CompareStatus, DiffAlgorithm, DiffKind,
    DiffLineKind, FailureCode, FailureSource, FileDiffLine, FileDiffReport, FileDiffRequest,
    FileDiffResult, OperationFailure, PipelineStep, WalkError,
};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Entry point for directory comparisons and single-file diffs.
///
/// Holds no state between calls beyond its configuration, so concurrent
/// invocations are independent.
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    default_excludes: Vec<String>,
    text_diff: TextDiffEngine,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra names excluded on every compare, in addition to request names
    pub fn with_default_excludes(mut self, names: Vec<String>) -> Self {
        self.default_excludes = names;
        self
    }

    pub fn with_algorithm(mut self, algorithm: DiffAlgorithm) -> Self {
        self.text_diff = TextDiffEngine::with_algorithm(algorithm);
        self
    }

    /// Compare two directory trees
    pub fn compare(&self, request: &CompareRequest) -> CompareResult {
        const SOURCE: FailureSource = FailureSource::Compare;

        let (left_root, right_root) = match (
            normalize_input_path(&request.left_path),
            normalize_input_path(&request.right_path),
        ) {
            (Some(left), Some(right)) => (left, right),
            _ => {
                return Err(OperationFailure::invalid_input(
                    SOURCE,
                    PipelineStep::ValidateInput,
                    "Both left and right paths are required.",
                ))
            }
        };

        ensure_directory(&left_root, "Left")?;
        ensure_directory(&right_root, "Right")?;

        let excluded = ExcludedNames::with_defaults(
            self.default_excludes
                .iter()
                .chain(request.exclude_names.iter()),
        );
        let walker = DirectoryWalker::new(excluded);

        info!("Comparing:");
        info!("  Left:  {}", left_root.display());
        info!("  Right: {}", right_root.display());

        let (left_walk, right_walk) =
            rayon::join(|| walker.walk(&left_root), || walker.walk(&right_root));
        let left_inventory = left_walk.map_err(|e| scan_failure(e, "left"))?;
        let right_inventory = right_walk.map_err(|e| scan_failure(e, "right"))?;

        info!(
            "Found {} files in left root, {} files in right root",
            left_inventory.len(),
            right_inventory.len()
        );

        let mut classification = classify_inventories(&left_inventory, &right_inventory)
            .map_err(|e| {
                error!("Classification failed: {}", e);
                OperationFailure::internal(
                    SOURCE,
                    PipelineStep::ClassifyResult,
                    format!("Unexpected error while classifying results: {}", e),
                )
            })?;

        for item in classification
            .items
            .iter_mut()
            .filter(|item| item.status == CompareStatus::Different)
        {
            let left_size = item.left.map_or(0, |s| s.size);
            let right_size = item.right.map_or(0, |s| s.size);
            item.diff_kind_hint = Some(classify_diff_kind(&item.relative_path, left_size, right_size));
        }

        Ok(CompareReport {
            request_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            left_file_count: left_inventory.len(),
            right_file_count: right_inventory.len(),
            left_root,
            right_root,
            applied_exclude_names: walker.excluded().names().to_vec(),
            policy: diff_policy(),
            summary: classification.summary,
            items: classification.items,
        })
    }

    /// Compute the diff of one relative path present under both roots
    pub fn file_diff(&self, request: &FileDiffRequest) -> FileDiffResult {
        const SOURCE: FailureSource = FailureSource::FileDiff;

        let (left_root, right_root) = match (
            normalize_input_path(&request.left_root_path),
            normalize_input_path(&request.right_root_path),
        ) {
            (Some(left), Some(right)) => (left, right),
            _ => {
                return Err(OperationFailure::invalid_input(
                    SOURCE,
                    PipelineStep::ValidateInput,
                    "Both left and right root paths are required.",
                ))
            }
        };

        let relative = validate_relative_path(&request.relative_path)?;
        let left_path = left_root.join(&relative);
        let right_path = right_root.join(&relative);

        // Links are not resolved so a diff never reads outside the roots
        let left_meta = fs::symlink_metadata(&left_path).map_err(read_failure)?;
        let right_meta = fs::symlink_metadata(&right_path).map_err(read_failure)?;
        if left_meta.file_type().is_symlink() || right_meta.file_type().is_symlink() {
            return Err(OperationFailure::invalid_input(
                SOURCE,
                PipelineStep::ValidateInput,
                "Compared targets must not be symbolic links.",
            ));
        }
        if !left_meta.is_file() || !right_meta.is_file() {
            return Err(OperationFailure::invalid_input(
                SOURCE,
                PipelineStep::ValidateInput,
                "Both compared targets must be files.",
            ));
        }

        let report = |kind: DiffKind, lines: Vec<FileDiffLine>| {
            let added = count_kind(&lines, DiffLineKind::Added);
            let removed = count_kind(&lines, DiffLineKind::Removed);
            FileDiffReport {
                relative_path: request.relative_path.clone(),
                kind,
                lines,
                added,
                removed,
                max_bytes: MAX_TEXT_DIFF_BYTES,
            }
        };

        if left_meta.len() > MAX_TEXT_DIFF_BYTES || right_meta.len() > MAX_TEXT_DIFF_BYTES {
            debug!("{} exceeds the text diff ceiling", request.relative_path);
            return Ok(report(DiffKind::TooLarge, Vec::new()));
        }

        let left_bytes = fs::read(&left_path).map_err(read_failure)?;
        let right_bytes = fs::read(&right_path).map_err(read_failure)?;

        if is_binary_path(&relative) || has_binary_content(&left_bytes) || has_binary_content(&right_bytes) {
            debug!("{} treated as binary", request.relative_path);
            return Ok(report(DiffKind::Binary, Vec::new()));
        }

        let left_text = String::from_utf8_lossy(&left_bytes);
        let right_text = String::from_utf8_lossy(&right_bytes);
        let lines = self.text_diff.compare_text(&left_text, &right_text);

        Ok(report(DiffKind::Text, lines))
    }
}

/// Trim, strip one pair of surrounding quotes and expand a leading `~`.
/// Returns `None` when nothing is left.
pub fn normalize_input_path(raw: &str) -> Option<PathBuf> {
    let mut value = raw.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = value[1..value.len() - 1].trim();
            break;
        }
    }

    if value.is_empty() {
        return None;
    }

    if value == "~" || value.starts_with("~/") || value.starts_with("~\\") {
        match BaseDirs::new() {
            Some(dirs) => {
                let rest = value[1..].trim_start_matches(['/', '\\']);
                let home = dirs.home_dir().to_path_buf();
                return Some(if rest.is_empty() { home } else { home.join(rest) });
            }
            None => warn!("Unable to determine home directory; using {} as given", value),
        }
    }

    Some(PathBuf::from(value))
}

fn ensure_directory(path: &Path, side: &str) -> Result<(), OperationFailure> {
    const SOURCE: FailureSource = FailureSource::Compare;

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OperationFailure::invalid_input(
            SOURCE,
            PipelineStep::ValidateInput,
            format!("{} path is not a directory: {}", side, path.display()),
        )),
        Err(e) => {
            let code = FailureCode::from_io_error(&e);
            let message = match code {
                FailureCode::NotFound => format!("{} path does not exist: {}", side, path.display()),
                FailureCode::InvalidInput => format!("{} path is invalid: {}", side, path.display()),
                FailureCode::PermissionDenied => {
                    format!("{} path is not accessible: {}", side, path.display())
                }
                _ => format!("Unable to inspect {} path {}: {}", side.to_lowercase(), path.display(), e),
            };
            Err(OperationFailure::new(code, SOURCE, PipelineStep::ValidateInput, message))
        }
    }
}

fn scan_failure(err: WalkError, side: &str) -> OperationFailure {
    let code = err.failure_code();
    if code == FailureCode::InternalError {
        error!("Scanning {} root failed: {}", side, err);
    } else {
        warn!("Scanning {} root failed: {}", side, err);
    }
    OperationFailure::new(
        code,
        FailureSource::Compare,
        PipelineStep::ScanDirectory,
        format!("Failed to scan {} directory: {}", side, err),
    )
}

fn read_failure(err: io::Error) -> OperationFailure {
    const SOURCE: FailureSource = FailureSource::FileDiff;

    match FailureCode::from_io_error(&err) {
        FailureCode::NotFound => OperationFailure::new(
            FailureCode::NotFound,
            SOURCE,
            PipelineStep::ReadFile,
            "Compared file was not found on one or both sides.",
        ),
        FailureCode::PermissionDenied => OperationFailure::new(
            FailureCode::PermissionDenied,
            SOURCE,
            PipelineStep::ReadFile,
            "Compared file is not accessible.",
        ),
        FailureCode::InvalidInput => OperationFailure::invalid_input(
            SOURCE,
            PipelineStep::ReadFile,
            "Compared file path is invalid.",
        ),
        _ => {
            error!("Unexpected error while reading compared file: {}", err);
            OperationFailure::internal(
                SOURCE,
                PipelineStep::ReadFile,
                format!("Unexpected error while creating file diff: {}", err),
            )
        }
    }
}

/// Reject empty, absolute and parent-escaping relative paths
fn validate_relative_path(raw: &str) -> Result<PathBuf, OperationFailure> {
    let invalid = |message: &str| {
        OperationFailure::invalid_input(FailureSource::FileDiff, PipelineStep::ValidateInput, message)
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("Relative path is required."));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("Relative path must stay inside both roots."))
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(invalid("Relative path must name a file."));
    }
    Ok(relative)
}

fn count_kind(lines: &[FileDiffLine], kind: DiffLineKind) -> usize {
    lines.iter().filter(|l| l.kind == kind).count()
}
