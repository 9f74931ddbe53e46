use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dirdiff_common::{
    ensure_config, load_config, AppConfig, CompareItem, CompareReport, CompareRequest, CompareStatus,
    DiffAlgorithm, DiffKind, FileDiffLine, FileDiffReport, FileDiffRequest, OperationFailure,
    Response,
};
use dirdiff_core::{collapse_context, diff_policy, pair_rows, ComparisonEngine, RowKind, SplitRow};
use serde::Serialize;
use std::io::IsTerminal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const RULE_WIDTH: usize = 80;
const CELL_WIDTH: usize = 56;

#[derive(Parser)]
#[command(name = "dirdiff")]
#[command(author = "dirdiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare two directory trees and show line diffs of differing files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two directories
    Compare(CompareArgs),

    /// Show the line diff of one file present under both roots
    Diff(DiffArgs),

    /// Print the active diff policy
    Policy {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configuration file location and contents
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Use the configuration file next to the executable
        #[arg(long)]
        portable: bool,
    },
}

#[derive(Args)]
struct CompareArgs {
    /// Left directory path
    left: String,

    /// Right directory path
    right: String,

    /// Names to exclude at every depth (can be specified multiple times)
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Show only differences (hide identical files)
    #[arg(short = 'd', long)]
    diff_only: bool,

    /// List only items with these statuses (can be specified multiple times)
    #[arg(short, long, value_enum)]
    status: Vec<StatusFilter>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Disable ANSI colors in output
    #[arg(long)]
    no_color: bool,
}

#[derive(Args)]
struct DiffArgs {
    /// Left root directory
    left_root: String,

    /// Right root directory
    right_root: String,

    /// File path relative to both roots
    relative_path: String,

    /// Show every unchanged line instead of collapsing long runs
    #[arg(short = 'a', long)]
    show_all_context: bool,

    /// Use the patience diff algorithm
    #[arg(long)]
    patience: bool,

    /// Output result as JSON
    #[arg(long)]
    json: bool,

    /// Disable ANSI colors in output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusFilter {
    #[value(name = "same")]
    Same,
    #[value(name = "different")]
    Different,
    #[value(name = "left_only")]
    LeftOnly,
    #[value(name = "right_only")]
    RightOnly,
}

impl From<StatusFilter> for CompareStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Same => CompareStatus::Same,
            StatusFilter::Different => CompareStatus::Different,
            StatusFilter::LeftOnly => CompareStatus::LeftOnly,
            StatusFilter::RightOnly => CompareStatus::RightOnly,
        }
    }
}

/// Which items are listed; the summary always counts every item
struct ItemFilter {
    diff_only: bool,
    statuses: Vec<CompareStatus>,
}

impl ItemFilter {
    fn allows(&self, status: CompareStatus) -> bool {
        if self.diff_only && status == CompareStatus::Same {
            return false;
        }
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}

fn main() {
    // Initialize tracing to stderr (so JSON output can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare(args) => run_compare(args),
        Commands::Diff(args) => run_diff(args),
        Commands::Policy { json } => run_policy(json),
        Commands::Config { init, portable } => run_config(init, portable),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Settings for the engine commands; an unreadable config file falls back to defaults
fn load_settings() -> AppConfig {
    match load_config(false) {
        Ok(loaded) => loaded.config,
        Err(e) => {
            warn!("Ignoring configuration file: {}", e);
            AppConfig::default()
        }
    }
}

fn run_compare(args: CompareArgs) -> anyhow::Result<()> {
    let config = load_settings();
    let engine = ComparisonEngine::new().with_default_excludes(config.exclude_names);
    let filter = ItemFilter {
        diff_only: args.diff_only,
        statuses: args.status.into_iter().map(CompareStatus::from).collect(),
    };

    let request = CompareRequest {
        left_path: args.left,
        right_path: args.right,
        exclude_names: args.exclude,
    };
    let result = engine.compare(&request);

    if args.json {
        return emit_json(result.map(|mut report| {
            report.items.retain(|item| filter.allows(item.status));
            report
        }));
    }

    let report = result?;
    let use_color = !args.no_color && std::io::stdout().is_terminal();
    print_compare_report(&report, &filter, use_color);
    Ok(())
}

fn run_diff(args: DiffArgs) -> anyhow::Result<()> {
    let config = load_settings();
    let algorithm = if args.patience {
        DiffAlgorithm::Patience
    } else {
        config.diff_algorithm
    };
    let show_all = args.show_all_context || config.show_all_context;

    let request = FileDiffRequest {
        left_root_path: args.left_root,
        right_root_path: args.right_root,
        relative_path: args.relative_path,
    };
    let result = ComparisonEngine::new()
        .with_algorithm(algorithm)
        .file_diff(&request);

    if args.json {
        return emit_json(result);
    }

    let report = result?;
    let use_color = !args.no_color && std::io::stdout().is_terminal();
    print_file_diff(&report, show_all, use_color);
    Ok(())
}

fn run_policy(json: bool) -> anyhow::Result<()> {
    let policy = diff_policy();
    if json {
        println!("{}", serde_json::to_string_pretty(&policy)?);
        return Ok(());
    }

    println!("Max text diff size:     {} bytes", policy.max_text_diff_bytes);
    println!("Binary extensions:      {}", policy.binary_extensions.join(" "));
    println!("Default exclusions:     {}", policy.default_exclude_names.join(" "));
    Ok(())
}

fn run_config(init: bool, portable: bool) -> anyhow::Result<()> {
    let loaded = if init {
        ensure_config(portable)?
    } else {
        load_config(portable)?
    };

    let state = match (loaded.exists, init) {
        (true, _) => "",
        (false, true) => " (created)",
        (false, false) => " (not found, using defaults)",
    };
    info!("Resolved configuration from {}", loaded.path.display());
    println!("Config file: {}{}", loaded.path.display(), state);
    println!();
    let data = toml::to_string_pretty(&loaded.config).context("Failed to render configuration")?;
    print!("{data}");
    Ok(())
}

/// Print the response envelope; a failure still exits non-zero
fn emit_json<T: Serialize>(result: Result<T, OperationFailure>) -> anyhow::Result<()> {
    let failure = result.as_ref().err().cloned();
    let response: Response<T> = result.into();
    println!("{}", serde_json::to_string_pretty(&response)?);

    match failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

fn print_compare_report(report: &CompareReport, filter: &ItemFilter, use_color: bool) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("Comparison Results");
    println!("  Left:  {}", report.left_root.display());
    println!("  Right: {}", report.right_root.display());
    println!("{}", "=".repeat(RULE_WIDTH));

    for item in report.items.iter().filter(|item| filter.allows(item.status)) {
        let (status_color, reset) = status_colors(item.status, use_color);
        println!(
            "{}{}{} {}{}",
            status_color,
            status_symbol(item.status),
            reset,
            item.relative_path,
            hint_label(item)
        );
    }

    println!("\n{}", "=".repeat(RULE_WIDTH));
    let mark = |status: CompareStatus| {
        let (color, reset) = status_colors(status, use_color);
        format!("{}({}){}", color, status_symbol(status).trim(), reset)
    };

    println!("Summary:");
    println!("  Total entries:   {}", report.summary.total());
    println!("  Identical:       {} {}", report.summary.same, mark(CompareStatus::Same));
    println!("  Different:       {} {}", report.summary.different, mark(CompareStatus::Different));
    println!("  Left only:       {} {}", report.summary.left_only, mark(CompareStatus::LeftOnly));
    println!("  Right only:      {} {}", report.summary.right_only, mark(CompareStatus::RightOnly));
    println!("  Files scanned:   {} left, {} right", report.left_file_count, report.right_file_count);
    println!("  Excluded names:  {}", report.applied_exclude_names.join(", "));
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_file_diff(report: &FileDiffReport, show_all: bool, use_color: bool) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{} ({})", report.relative_path, report.kind.as_str());
    println!("{}", "=".repeat(RULE_WIDTH));

    match report.kind {
        DiffKind::Binary => println!("Binary files differ; no line diff shown."),
        DiffKind::TooLarge => println!(
            "File exceeds {} bytes; no line diff shown.",
            report.max_bytes
        ),
        DiffKind::Text => {
            if report.added == 0 && report.removed == 0 {
                println!("Text content is identical.");
                return;
            }

            let collapsed = collapse_context(&report.lines, show_all);
            for row in pair_rows(&collapsed.lines) {
                println!("{}", format_row(&row, use_color));
            }

            println!("{}", "-".repeat(RULE_WIDTH));
            if collapsed.has_collapsed {
                println!(
                    "{} unchanged lines hidden (use --show-all-context to show them)",
                    collapsed.hidden_lines
                );
            }
            println!("+{} added, -{} removed", report.added, report.removed);
        }
    }
}

fn status_symbol(status: CompareStatus) -> &'static str {
    match status {
        CompareStatus::Same => "  ==  ",
        CompareStatus::Different => "  !=  ",
        CompareStatus::LeftOnly => "  <<  ",
        CompareStatus::RightOnly => "  >>  ",
    }
}

fn status_colors(status: CompareStatus, use_color: bool) -> (&'static str, &'static str) {
    if !use_color {
        return ("", "");
    }
    let color = match status {
        CompareStatus::Same => "\x1b[32m",      // Green
        CompareStatus::Different => "\x1b[31m", // Red
        CompareStatus::LeftOnly => "\x1b[33m",  // Yellow
        CompareStatus::RightOnly => "\x1b[34m", // Blue
    };
    (color, "\x1b[0m")
}

fn hint_label(item: &CompareItem) -> String {
    match item.diff_kind_hint {
        Some(kind) => format!(" [{}]", kind.as_str()),
        None => String::new(),
    }
}

fn format_row(row: &SplitRow, use_color: bool) -> String {
    let kind = row.kind();
    let marker = match kind {
        RowKind::Context => ' ',
        RowKind::Changed => '~',
        RowKind::Removed => '-',
        RowKind::Added => '+',
    };
    let (color, reset) = match (use_color, kind) {
        (false, _) | (true, RowKind::Context) => ("", ""),
        (true, RowKind::Changed) => ("\x1b[33m", "\x1b[0m"),
        (true, RowKind::Removed) => ("\x1b[31m", "\x1b[0m"),
        (true, RowKind::Added) => ("\x1b[32m", "\x1b[0m"),
    };

    format!(
        "{}{} {} | {}{}",
        color,
        marker,
        format_cell(row.left.as_ref(), true),
        format_cell(row.right.as_ref(), false),
        reset
    )
    .trim_end()
    .to_string()
}

fn format_cell(line: Option<&FileDiffLine>, left_side: bool) -> String {
    let (number, text) = match line {
        Some(line) => {
            let number = if left_side {
                line.left_line_number
            } else {
                line.right_line_number
            };
            (
                number.map(|n| n.to_string()).unwrap_or_default(),
                truncate_text(&line.text, CELL_WIDTH),
            )
        }
        None => (String::new(), String::new()),
    };
    format!("{:>5} {:<width$}", number, text, width = CELL_WIDTH)
}

fn truncate_text(text: &str, max_len: usize) -> String {
    let expanded = text.replace('\t', "    ");
    let expanded = expanded.trim_end_matches('\r');
    if expanded.chars().count() <= max_len {
        return expanded.to_string();
    }

    // Keep the start of the line visible
    let suffix = "...";
    let keep_len = max_len.saturating_sub(suffix.len());
    let prefix: String = expanded.chars().take(keep_len).collect();
    format!("{}{}", prefix, suffix)
}
