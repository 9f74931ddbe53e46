use dirdiff_common::{DirectoryEntry, Inventory, WalkError};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Names excluded at every depth unless the caller opts out of defaults
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[".git", "node_modules"];

/// Exact file and directory names skipped during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedNames {
    names: Vec<String>,
}

impl ExcludedNames {
    /// Built-in defaults followed by `custom` names. Custom names are trimmed,
    /// empty names are discarded and duplicates collapse onto their first occurrence.
    pub fn with_defaults<I, S>(custom: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();
        let defaults = DEFAULT_EXCLUDED_NAMES.iter().map(|name| name.to_string());
        let custom = custom
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty());

        for name in defaults.chain(custom) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        Self { names }
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        match name.to_str() {
            Some(name) => self.names.iter().any(|excluded| excluded == name),
            None => false,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

impl Default for ExcludedNames {
    fn default() -> Self {
        Self::with_defaults(std::iter::empty::<&str>())
    }
}

/// Directory walker producing a sorted file inventory
pub struct DirectoryWalker {
    excluded: ExcludedNames,
}

impl DirectoryWalker {
    pub fn new(excluded: ExcludedNames) -> Self {
        Self { excluded }
    }

    pub fn excluded(&self) -> &ExcludedNames {
        &self.excluded
    }

    /// Walk `root` and return every regular file below it.
    ///
    /// Symbolic links are neither followed nor recorded. Excluded names are
    /// pruned before descending. Any IO failure aborts the whole walk.
    pub fn walk(&self, root: &Path) -> Result<Inventory, WalkError> {
        let metadata = fs::metadata(root).map_err(|e| WalkError::io(root, e))?;
        if !metadata.is_dir() {
            return Err(WalkError::NotADirectory(root.to_path_buf()));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                let excluded = self.excluded.contains(entry.file_name());
                if excluded {
                    trace!("Excluded {:?}", entry.path());
                }
                !excluded
            });

        for entry in walker {
            let entry = entry.map_err(|e| walk_failure(root, e))?;
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                debug!("Skipping symbolic link {:?}", entry.path());
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| walk_failure(root, e))?;
            let modified = metadata.modified().map_err(|e| WalkError::io(path, e))?;

            entries.push(DirectoryEntry {
                relative_path: relative_path(root, path)?,
                absolute_path: path.to_path_buf(),
                size: metadata.len(),
                modified,
            });
        }

        debug!("Walked {} files under {:?}", entries.len(), root);
        Ok(Inventory::new(entries))
    }
}

impl Default for DirectoryWalker {
    fn default() -> Self {
        Self::new(ExcludedNames::default())
    }
}

fn walk_failure(root: &Path, err: walkdir::Error) -> WalkError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = match err.into_io_error() {
        Some(source) => source,
        None => io::Error::new(io::ErrorKind::Other, "filesystem loop detected"),
    };
    WalkError::io(path, source)
}

/// Root-relative path joined with `/` regardless of the host separator
fn relative_path(root: &Path, path: &Path) -> Result<String, WalkError> {
    let relative = path.strip_prefix(root).map_err(|e| {
        WalkError::io(path, io::Error::new(io::ErrorKind::Other, e.to_string()))
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(parts.join("/"))
}
