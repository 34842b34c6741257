//! Progress bar and logging utilities.
//!
//! Provides helpers for creating progress bars and spinners, with support
//! for log-only mode where progress bars are hidden for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long-running phases report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Animated bars on stderr.
    #[default]
    Bars,
    /// Hidden bars; periodic `[phase] n/total` log lines instead.
    LogOnly,
}

impl ProgressMode {
    pub fn from_flag(log_only: bool) -> Self {
        if log_only {
            ProgressMode::LogOnly
        } else {
            ProgressMode::Bars
        }
    }

    pub fn is_log_only(self) -> bool {
        self == ProgressMode::LogOnly
    }
}

/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignore the error when a subscriber is already installed (tests, reruns).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Log progress periodically for tail-friendly output.
/// Only logs when in log-only mode and at specified intervals.
pub fn log_progress(mode: ProgressMode, phase: &str, current: u64, total: u64, interval: u64) {
    if total == 0 || !mode.is_log_only() {
        return;
    }
    if current % interval.max(1) == 0 || current == total {
        let pct = 100.0 * current as f64 / total as f64;
        tracing::info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_mode_from_flag() {
        assert!(ProgressMode::from_flag(true).is_log_only());
        assert!(!ProgressMode::from_flag(false).is_log_only());
    }

    #[test]
    fn test_hidden_bar_in_log_only_mode() {
        let pb = create_progress_bar(10, "test", ProgressMode::LogOnly);
        assert!(pb.is_hidden());
    }
}
