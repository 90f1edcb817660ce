use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rft_core::ProgressListener;

use super::Formatter;

/// Progress listener showing the latest message next to a spinner
///
/// Hidden in quiet and JSON modes.
pub struct SpinnerListener {
    bar: ProgressBar,
}

impl SpinnerListener {
    pub fn new(formatter: &Formatter) -> Self {
        if formatter.is_quiet() || formatter.is_json() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Remove the spinner from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressListener for SpinnerListener {
    fn message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }
}

impl Drop for SpinnerListener {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
