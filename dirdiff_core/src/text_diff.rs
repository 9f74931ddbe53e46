use dirdiff_common::{DiffAlgorithm, FileDiffLine};
use similar::{ChangeTag, TextDiff};

/// Line-granularity text diff engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDiffEngine {
    algorithm: DiffAlgorithm,
}

impl TextDiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(algorithm: DiffAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DiffAlgorithm {
        self.algorithm
    }

    /// Align two texts line by line.
    ///
    /// Within each change run every removed line precedes every added line.
    /// Line numbers are 1-based and tracked independently per side.
    pub fn compare_text(&self, left: &str, right: &str) -> Vec<FileDiffLine> {
        let algorithm = match self.algorithm {
            DiffAlgorithm::Myers => similar::Algorithm::Myers,
            DiffAlgorithm::Patience => similar::Algorithm::Patience,
        };
        let left_lines = split_lines(left);
        let right_lines = split_lines(right);
        let diff = TextDiff::configure()
            .algorithm(algorithm)
            .diff_slices(&left_lines, &right_lines);

        let mut result = Vec::new();
        let mut left_line_num = 1;
        let mut right_line_num = 1;

        for change in diff.iter_all_changes() {
            let text = change.value();

            match change.tag() {
                ChangeTag::Equal => {
                    result.push(FileDiffLine::context(text, left_line_num, right_line_num));
                    left_line_num += 1;
                    right_line_num += 1;
                }
                ChangeTag::Delete => {
                    result.push(FileDiffLine::removed(text, left_line_num));
                    left_line_num += 1;
                }
                ChangeTag::Insert => {
                    result.push(FileDiffLine::added(text, right_line_num));
                    right_line_num += 1;
                }
            }
        }

        result
    }
}

/// Diff two texts with the default (Myers) alignment
pub fn diff_text(left: &str, right: &str) -> Vec<FileDiffLine> {
    TextDiffEngine::new().compare_text(left, right)
}

// Lines end at `\n` only; a `\r` anywhere stays part of the line text.
// The empty piece after a final newline is not a line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}
