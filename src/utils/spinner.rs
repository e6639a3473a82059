//! Terminal spinner shown while waiting on git or a backend.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_INTERVAL: Duration = Duration::from_millis(80);

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner style used during ongoing operations.
/// - Blue spinner with braille frames.
/// - Displays the current message next to the spinner.
fn spinner_style() -> ProgressStyle {
    style("\x1b[34m{spinner}\x1b[0m {wide_msg}")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "])
}

/// Green check mark followed by the final message.
fn ok_style() -> ProgressStyle {
    style("\x1b[32m✔\x1b[0m {wide_msg}")
}

/// Red cross followed by the error message.
fn err_style() -> ProgressStyle {
    style("\x1b[31m✘\x1b[0m {wide_msg}")
}

/// A single-line spinner on stderr that ends in a success or failure mark.
///
/// Drawing is suppressed when stderr is not a terminal.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Starts a spinner with `message`.
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar }
    }

    /// Replaces the message while spinning.
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Stops with a check mark.
    pub fn succeed(&self, message: impl Into<String>) {
        self.bar.set_style(ok_style());
        self.bar.finish_with_message(message.into());
    }

    /// Stops with a cross.
    pub fn fail(&self, message: impl Into<String>) {
        self.bar.set_style(err_style());
        self.bar.finish_with_message(message.into());
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
