//! CLI output formatting for the batch run.
//!
//! One line per file as it is processed, then a summary. Paths are shown
//! relative to the roots the user configured, so the output reads as a
//! mirror of the input tree:
//!
//! ```text
//! saved    a/one.jpg
//! saved    a/b/two.jpeg
//! skipped  three.png (already exists)
//! failed   broken.jpg: image error: ...
//!
//! 4 files: 2 saved, 1 skipped, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each event has a `format_*` function (returns `String`) for testability
//! and a `print_*` wrapper that writes to stdout or stderr. Format functions
//! are pure — no I/O, no side effects. Warnings (font fallback, failures) go
//! to stderr so a piped stdout stays a clean file listing.

use crate::process::{Event, RunSummary, SkipReason};
use std::path::Path;

/// Render a path relative to `root` when possible, as-is otherwise.
fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn skip_detail(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::DestinationExists => "already exists",
        SkipReason::DegenerateText => "text renders empty",
        SkipReason::NoSpace => "no room between margins",
    }
}

/// Format one per-file event as a display line.
///
/// `input` and `output` are the configured roots; source paths are shown
/// relative to `input`, destinations relative to `output`.
pub fn format_event(event: &Event, input: &Path, output: &Path) -> String {
    match event {
        Event::FontFallback { path, message } => {
            format!(
                "warning: font {} unusable ({message}), using the built-in font",
                path.display()
            )
        }
        Event::Saved { dest, .. } => {
            format!("saved    {}", relative(dest, output).display())
        }
        Event::Skipped { source, reason } => {
            format!(
                "skipped  {} ({})",
                relative(source, input).display(),
                skip_detail(*reason)
            )
        }
        Event::Failed { source, message } => {
            format!("failed   {}: {message}", relative(source, input).display())
        }
    }
}

/// Format the end-of-run summary line.
pub fn format_summary(summary: &RunSummary) -> String {
    let files = if summary.total() == 1 { "file" } else { "files" };
    format!(
        "{} {files}: {} saved, {} skipped, {} failed",
        summary.total(),
        summary.saved,
        summary.skipped(),
        summary.failed
    )
}

/// Print one event as it happens. Warnings and failures go to stderr.
pub fn print_event(event: &Event, input: &Path, output: &Path) {
    let line = format_event(event, input, output);
    match event {
        Event::FontFallback { .. } | Event::Failed { .. } => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

/// Print the summary, preceded by a blank line when any files were seen.
pub fn print_summary(summary: &RunSummary) {
    if summary.total() > 0 {
        println!();
    }
    println!("{}", format_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn roots() -> (PathBuf, PathBuf) {
        (PathBuf::from("/photos"), PathBuf::from("/stamped"))
    }

    #[test]
    fn saved_shows_destination_relative_to_output() {
        let (input, output) = roots();
        let event = Event::Saved {
            source: input.join("a/one.jpg"),
            dest: output.join("a/one.jpg"),
        };
        assert_eq!(format_event(&event, &input, &output), "saved    a/one.jpg");
    }

    #[test]
    fn skipped_names_the_reason() {
        let (input, output) = roots();
        let event = Event::Skipped {
            source: input.join("b/two.png"),
            reason: SkipReason::DestinationExists,
        };
        assert_eq!(
            format_event(&event, &input, &output),
            "skipped  b/two.png (already exists)"
        );

        let event = Event::Skipped {
            source: input.join("tiny.jpg"),
            reason: SkipReason::NoSpace,
        };
        assert_eq!(
            format_event(&event, &input, &output),
            "skipped  tiny.jpg (no room between margins)"
        );
    }

    #[test]
    fn failed_includes_the_error_message() {
        let (input, output) = roots();
        let event = Event::Failed {
            source: input.join("broken.jpg"),
            message: "image error: bad huffman table".into(),
        };
        assert_eq!(
            format_event(&event, &input, &output),
            "failed   broken.jpg: image error: bad huffman table"
        );
    }

    #[test]
    fn font_fallback_is_a_warning() {
        let (input, output) = roots();
        let event = Event::FontFallback {
            path: PathBuf::from("missing.ttf"),
            message: "IO error: not found".into(),
        };
        let line = format_event(&event, &input, &output);
        assert!(line.starts_with("warning: font missing.ttf"));
        assert!(line.contains("built-in font"));
    }

    #[test]
    fn paths_outside_the_roots_print_unchanged() {
        let (input, output) = roots();
        let event = Event::Failed {
            source: PathBuf::from("/elsewhere/x.jpg"),
            message: "gone".into(),
        };
        assert!(format_event(&event, &input, &output).contains("/elsewhere/x.jpg"));
    }

    #[test]
    fn summary_counts_and_pluralizes() {
        let summary = RunSummary {
            saved: 2,
            skipped_existing: 1,
            skipped_degenerate: 0,
            skipped_no_space: 0,
            failed: 1,
        };
        assert_eq!(
            format_summary(&summary),
            "4 files: 2 saved, 1 skipped, 1 failed"
        );

        let one = RunSummary {
            saved: 1,
            ..RunSummary::default()
        };
        assert_eq!(format_summary(&one), "1 file: 1 saved, 0 skipped, 0 failed");

        assert_eq!(
            format_summary(&RunSummary::default()),
            "0 files: 0 saved, 0 skipped, 0 failed"
        );
    }
}
