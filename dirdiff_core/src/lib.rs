pub mod walker;
pub mod policy;
pub mod classifier;
pub mod text_diff;
pub mod display;
pub mod comparison;

pub use walker::{DirectoryWalker, ExcludedNames, DEFAULT_EXCLUDED_NAMES};
pub use policy::{classify_diff_kind, diff_policy, BINARY_EXTENSIONS, MAX_TEXT_DIFF_BYTES};
pub use classifier::{classify_inventories, Classification};
pub use text_diff::{diff_text, TextDiffEngine};
pub use display::{collapse_context, pair_rows, CollapsedLines, RowKind, SplitRow};
pub use comparison::ComparisonEngine;
