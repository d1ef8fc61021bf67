//! Spinner shown while the caller waits on a subprocess or network call.
//!
//! The spinner is redrawn by indicatif's steady-tick thread. Stopping (or
//! dropping) an indicator disables the steady tick before anything else, and
//! indicatif joins the ticker thread when it is disabled, so nothing is drawn
//! once [`ProgressIndicator::stop`] returns.
//!
//! A disabled indicator draws nothing but still measures elapsed time, so
//! callers behave the same in quiet mode.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

use crate::constants::{SPINNER_CHARS, SPINNER_TICK_MS};

/// Elapsed-time spinner for a single blocking phase.
pub struct ProgressIndicator {
    bar: Option<ProgressBar>,
    label: String,
    started: Instant,
}

impl ProgressIndicator {
    /// Start a spinner with the given label.
    ///
    /// When `enabled` is false nothing is rendered.
    pub fn start(label: impl Into<String>, enabled: bool) -> Self {
        let target = if enabled {
            Some(ProgressDrawTarget::stderr())
        } else {
            None
        };
        Self::start_with_target(label, target)
    }

    fn start_with_target(label: impl Into<String>, target: Option<ProgressDrawTarget>) -> Self {
        let label = label.into();
        let bar = target.map(|target| {
            let bar = ProgressBar::with_draw_target(None, target);
            bar.set_style(spinner_style());
            bar.set_message(label.clone());
            bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            bar
        });

        Self {
            bar,
            label,
            started: Instant::now(),
        }
    }

    /// Whether this indicator renders anything.
    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Stop the spinner and return the elapsed time.
    ///
    /// An enabled indicator prints a completion line using `final_label`, or
    /// the start label when none is given.
    pub fn stop(mut self, final_label: Option<&str>) -> Duration {
        let elapsed = self.started.elapsed();
        if let Some(bar) = self.bar.take() {
            halt(&bar);
            println!(
                "{} {} ({:.1}s)",
                "✓".green(),
                final_label.unwrap_or(self.label.as_str()),
                elapsed.as_secs_f64()
            );
        }
        elapsed
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            halt(&bar);
        }
    }
}

/// Join the ticker thread, then clear the spinner line.
fn halt(bar: &ProgressBar) {
    bar.disable_steady_tick();
    bar.finish_and_clear();
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} ({secs})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
        .with_key("secs", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}s", state.elapsed().as_secs_f64());
        })
}
