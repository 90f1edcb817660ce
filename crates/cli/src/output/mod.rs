//! Output formatting and progress reporting

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::SpinnerListener;

/// Output settings shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Strict JSON on stdout, no colors or progress
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything but errors
    pub quiet: bool,
}
