//! Human readable and JSON output
//!
//! Every command prints through a [`Formatter`] so that quiet and JSON
//! modes behave the same everywhere.

use console::Style;
use rft_core::{Completion, Entry, EntryType};
use serde::Serialize;

use super::OutputConfig;

/// Styles of the listing columns and status messages
#[derive(Debug, Clone)]
struct Palette {
    volume: Style,
    directory: Style,
    symlink: Style,
    file: Style,
    size: Style,
    date: Style,
    key: Style,
    url: Style,
    ok: Style,
    failed: Style,
    degraded: Style,
}

impl Palette {
    fn colored() -> Self {
        Self {
            volume: Style::new().magenta().bold(),
            directory: Style::new().blue().bold(),
            symlink: Style::new().cyan(),
            file: Style::new(),
            size: Style::new().green(),
            date: Style::new().dim(),
            key: Style::new().cyan(),
            url: Style::new().cyan().underlined(),
            ok: Style::new().green(),
            failed: Style::new().red(),
            degraded: Style::new().yellow(),
        }
    }

    fn plain() -> Self {
        let none = Style::new();
        Self {
            volume: none.clone(),
            directory: none.clone(),
            symlink: none.clone(),
            file: none.clone(),
            size: none.clone(),
            date: none.clone(),
            key: none.clone(),
            url: none.clone(),
            ok: none.clone(),
            failed: none.clone(),
            degraded: none,
        }
    }

    fn entry(&self, kind: EntryType) -> &Style {
        match kind {
            EntryType::Volume => &self.volume,
            EntryType::Directory | EntryType::Placeholder => &self.directory,
            EntryType::Symlink => &self.symlink,
            EntryType::File => &self.file,
        }
    }
}

/// Prints command results
///
/// In JSON mode only documents reach stdout; errors go to stderr as
/// `{"error": ...}` and status lines are dropped.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    palette: Palette,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let palette = if config.no_color || config.json {
            Palette::plain()
        } else {
            Palette::colored()
        };
        Self { config, palette }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Entry name styled by kind; containers get a trailing `/`
    pub fn style_entry(&self, entry: &Entry) -> String {
        let style = self.palette.entry(entry.kind());
        if entry.kind().is_directory() {
            style.apply_to(format!("{}/", entry.name())).to_string()
        } else {
            style.apply_to(entry.name()).to_string()
        }
    }

    pub fn style_size(&self, text: &str) -> String {
        self.palette.size.apply_to(text).to_string()
    }

    pub fn style_date(&self, text: &str) -> String {
        self.palette.date.apply_to(text).to_string()
    }

    pub fn style_key(&self, text: &str) -> String {
        self.palette.key.apply_to(text).to_string()
    }

    pub fn style_url(&self, text: &str) -> String {
        self.palette.url.apply_to(text).to_string()
    }

    /// Status line of a finished operation; silent in quiet and JSON mode
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{} {message}", self.palette.ok.apply_to("✓"));
    }

    /// Errors are printed in every mode
    pub fn error(&self, message: &str) {
        if self.config.json {
            let document = serde_json::json!({ "error": message });
            eprintln!("{document}");
        } else {
            eprintln!("{} {message}", self.palette.failed.apply_to("✗"));
        }
    }

    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        eprintln!("{} {message}", self.palette.degraded.apply_to("⚠"));
    }

    /// Warn about every best-effort step that failed
    pub fn degradations(&self, completion: &Completion) {
        for degradation in completion.degradations() {
            self.warning(&format!(
                "{} of {} failed: {}",
                degradation.step, degradation.path, degradation.error
            ));
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("Cannot serialize output: {e}")),
        }
    }

    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use rft_core::EntryPath;

    use super::*;

    fn plain() -> Formatter {
        Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_formatter_modes() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(!formatter.is_quiet());
        assert!(formatter.colors_enabled());

        let json = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(json.is_json());
        assert!(!json.colors_enabled());

        assert!(!plain().colors_enabled());
    }

    #[test]
    fn test_style_entry_marks_containers() {
        let formatter = plain();
        let dir = Entry::directory(EntryPath::parse("/c/photos"));
        let file = Entry::file(EntryPath::parse("/c/a.txt"));
        assert_eq!(formatter.style_entry(&dir), "photos/");
        assert_eq!(formatter.style_entry(&file), "a.txt");
        assert_eq!(formatter.style_entry(&Entry::volume("c")), "c/");
    }
}
