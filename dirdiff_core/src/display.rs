//! Display transforms over a computed line diff: side-by-side row pairing and
//! collapsing of long unchanged runs.

use dirdiff_common::{DiffLineKind, FileDiffLine};
use serde::Serialize;

/// Context runs longer than this are collapsed
pub const CONTEXT_COLLAPSE_THRESHOLD: usize = 12;
/// Lines kept at the start of a collapsed run
pub const CONTEXT_KEEP_HEAD: usize = 4;
/// Lines kept at the end of a collapsed run
pub const CONTEXT_KEEP_TAIL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Context,
    /// A removed line shown next to the added line replacing it
    Changed,
    Removed,
    Added,
}

/// One side-by-side display row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitRow {
    pub left: Option<FileDiffLine>,
    pub right: Option<FileDiffLine>,
}

impl SplitRow {
    pub fn kind(&self) -> RowKind {
        let left = self.left.as_ref().map(|l| l.kind);
        let right = self.right.as_ref().map(|l| l.kind);
        match (left, right) {
            (Some(DiffLineKind::Removed), Some(DiffLineKind::Added)) => RowKind::Changed,
            (Some(DiffLineKind::Removed), _) => RowKind::Removed,
            (_, Some(DiffLineKind::Added)) => RowKind::Added,
            _ => RowKind::Context,
        }
    }
}

/// Group diff lines into side-by-side rows.
///
/// A removed run immediately followed by an added run is zipped position by
/// position; the longer run's surplus becomes one-sided rows.
pub fn pair_rows(lines: &[FileDiffLine]) -> Vec<SplitRow> {
    let mut rows = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];

        match line.kind {
            DiffLineKind::Context => {
                rows.push(SplitRow {
                    left: Some(line.clone()),
                    right: Some(line.clone()),
                });
                index += 1;
            }
            DiffLineKind::Removed => {
                let removed_end = run_end(lines, index, DiffLineKind::Removed);
                let added_end = run_end(lines, removed_end, DiffLineKind::Added);
                let removed = &lines[index..removed_end];
                let added = &lines[removed_end..added_end];

                for i in 0..removed.len().max(added.len()) {
                    rows.push(SplitRow {
                        left: removed.get(i).cloned(),
                        right: added.get(i).cloned(),
                    });
                }
                index = added_end;
            }
            DiffLineKind::Added => {
                let added_end = run_end(lines, index, DiffLineKind::Added);
                for added in &lines[index..added_end] {
                    rows.push(SplitRow {
                        left: None,
                        right: Some(added.clone()),
                    });
                }
                index = added_end;
            }
        }
    }

    rows
}

/// Result of context collapsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollapsedLines {
    pub lines: Vec<FileDiffLine>,
    pub has_collapsed: bool,
    /// Total context lines replaced by placeholders
    pub hidden_lines: usize,
}

/// Replace each context run longer than the threshold by its head, a
/// placeholder line and its tail. `show_all` returns the input untouched.
pub fn collapse_context(lines: &[FileDiffLine], show_all: bool) -> CollapsedLines {
    if show_all {
        return CollapsedLines {
            lines: lines.to_vec(),
            has_collapsed: false,
            hidden_lines: 0,
        };
    }

    let mut collapsed = Vec::with_capacity(lines.len());
    let mut hidden_lines = 0;
    let mut index = 0;

    while index < lines.len() {
        if lines[index].kind != DiffLineKind::Context {
            collapsed.push(lines[index].clone());
            index += 1;
            continue;
        }

        let end = run_end(lines, index, DiffLineKind::Context);
        let run = &lines[index..end];

        if run.len() <= CONTEXT_COLLAPSE_THRESHOLD {
            collapsed.extend_from_slice(run);
        } else {
            let hidden = run.len() - CONTEXT_KEEP_HEAD - CONTEXT_KEEP_TAIL;
            collapsed.extend_from_slice(&run[..CONTEXT_KEEP_HEAD]);
            collapsed.push(FileDiffLine::placeholder(hidden));
            collapsed.extend_from_slice(&run[run.len() - CONTEXT_KEEP_TAIL..]);
            hidden_lines += hidden;
        }
        index = end;
    }

    CollapsedLines {
        lines: collapsed,
        has_collapsed: hidden_lines > 0,
        hidden_lines,
    }
}

fn run_end(lines: &[FileDiffLine], start: usize, kind: DiffLineKind) -> usize {
    lines[start..]
        .iter()
        .position(|l| l.kind != kind)
        .map_or(lines.len(), |offset| start + offset)
}
