//! Progress reporting for tool invocations

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use relay_application::InvocationProgress;
use relay_domain::{BackendEndpoint, ExecutionOutcome};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Spinner shown while `call` waits for a callback or polls
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationProgress for ProgressReporter {
    fn on_dispatched(&self, tool: &str, backend: &BackendEndpoint, execution_id: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(tool.to_string());
        pb.set_message(format!("waiting for callback ({} on {})", execution_id, backend));
        pb.enable_steady_tick(Duration::from_millis(100));

        let previous = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(pb);
        if let Some(previous) = previous {
            previous.finish_and_clear();
        }
    }

    fn on_callback_timeout(&self, _execution_id: &str, waited: Duration) {
        self.with_spinner(|pb| {
            pb.set_message(format!(
                "no callback after {:.1}s, polling",
                waited.as_secs_f64()
            ))
        });
    }

    fn on_poll_attempt(&self, _execution_id: &str, attempt: u32, budget: u32) {
        self.with_spinner(|pb| pb.set_message(format!("still pending (poll {}/{})", attempt, budget)));
    }

    fn on_finished(&self, tool: &str, outcome: &ExecutionOutcome) {
        let taken = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pb) = taken {
            let status = if outcome.is_success() {
                format!("{} {}", "v".green(), tool)
            } else {
                format!("{} {}", "x".red(), tool)
            };
            pb.finish_with_message(status);
        }
    }
}

/// Plain line-per-event progress on stderr (no fancy UI)
pub struct SimpleProgress;

impl InvocationProgress for SimpleProgress {
    fn on_dispatched(&self, tool: &str, backend: &BackendEndpoint, execution_id: &str) {
        eprintln!(
            "{} {} dispatched to {} ({})",
            "->".cyan(),
            tool.bold(),
            backend,
            execution_id
        );
    }

    fn on_callback_timeout(&self, execution_id: &str, waited: Duration) {
        eprintln!(
            "  {} no callback for {} after {:.1}s, polling",
            "!".yellow(),
            execution_id,
            waited.as_secs_f64()
        );
    }

    fn on_finished(&self, tool: &str, outcome: &ExecutionOutcome) {
        if outcome.is_success() {
            eprintln!("  {} {}", "v".green(), tool);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), tool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reporter_lifecycle() {
        let reporter = ProgressReporter::new();
        let backend = BackendEndpoint::parse("http://127.0.0.1:8000").unwrap();

        reporter.on_dispatched("divide", &backend, "abc");
        assert!(reporter.spinner.lock().unwrap().is_some());

        reporter.on_callback_timeout("abc", Duration::from_secs(30));
        reporter.on_poll_attempt("abc", 1, 30);
        reporter.on_finished("divide", &ExecutionOutcome::Completed(json!(5.0)));
        assert!(reporter.spinner.lock().unwrap().is_none());
    }

    #[test]
    fn test_events_without_spinner_are_ignored() {
        let reporter = ProgressReporter::new();
        reporter.on_poll_attempt("abc", 1, 30);
        reporter.on_finished("divide", &ExecutionOutcome::Completed(json!(5.0)));
    }
}
