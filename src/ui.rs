//! Loading indicator for the analysis CLI.
//!
//! A remote analysis shows one stage per network leg (upload, detection);
//! the annotated-image export gets its own stage. On a terminal each stage
//! is an `indicatif` spinner, otherwise a `==>` line on stderr.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::detect::{Leg, LegObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    spinners: bool,
}

impl Ui {
    /// `piped` turns `Auto` into plain output, e.g. when stdout feeds
    /// another program. Spinners need `stderr_is_tty` in every mode.
    pub fn new(mode: UiMode, stderr_is_tty: bool, piped: bool) -> Self {
        let spinners = stderr_is_tty
            && match mode {
                UiMode::Pretty => true,
                UiMode::Auto => !piped,
                UiMode::Plain => false,
            };
        Self { spinners }
    }

    /// Starts a named stage; it ends when the guard is finished or dropped.
    pub fn stage(&self, name: &str) -> Stage {
        let spinner = if self.spinners {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg} {elapsed}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("{name}…"));
            Some(spinner)
        } else {
            eprintln!("==> {}", name);
            None
        };
        Stage {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
            outcome: None,
        }
    }

    /// Leg observer for `Analyzer::analyze_observed`.
    pub fn analysis(&self) -> AnalysisProgress<'_> {
        AnalysisProgress {
            ui: self,
            active: None,
        }
    }
}

/// One running stage.
pub struct Stage {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    outcome: Option<(bool, String)>,
}

impl Stage {
    pub fn finish(mut self, detail: impl Into<String>) {
        self.outcome = Some((true, detail.into()));
    }

    pub fn fail(mut self, detail: impl Into<String>) {
        self.outcome = Some((false, detail.into()));
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let message = summary_line(&self.name, self.outcome.as_ref(), self.start.elapsed());
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

/// Shows the legs of one analysis as consecutive stages.
pub struct AnalysisProgress<'a> {
    ui: &'a Ui,
    active: Option<(Leg, Stage)>,
}

impl AnalysisProgress<'_> {
    pub fn active_leg(&self) -> Option<Leg> {
        self.active.as_ref().map(|(leg, _)| *leg)
    }
}

impl LegObserver for AnalysisProgress<'_> {
    fn started(&mut self, leg: Leg) {
        // close any unfinished leg before the next one prints
        self.active = None;
        self.active = Some((leg, self.ui.stage(leg.label())));
    }

    fn finished(&mut self, leg: Leg, ok: bool, detail: &str) {
        match self.active.take() {
            Some((active, stage)) if active == leg => {
                if ok {
                    stage.finish(detail)
                } else {
                    stage.fail(detail)
                }
            }
            other => self.active = other,
        }
    }
}

fn summary_line(name: &str, outcome: Option<&(bool, String)>, elapsed: Duration) -> String {
    let elapsed = format_duration(elapsed);
    match outcome {
        Some((true, detail)) => format!("✔ {}: {} ({})", name, detail, elapsed),
        Some((false, detail)) => format!("✘ {}: {} ({})", name, detail, elapsed),
        None => format!("✔ {} ({})", name, elapsed),
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
