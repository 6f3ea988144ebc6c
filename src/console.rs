//! Console output formatting with ANSI color support.
//!
//! Progress goes to stdout; skip diagnostics go to stderr so they can be
//! redirected separately. Colors follow TTY detection and `NO_COLOR`.

use std::io::{self, IsTerminal};

/// ANSI style codes for terminal formatting.
#[derive(Debug, Clone, Copy)]
pub enum Style {
    Bold,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    Gray,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Red => "31",
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Blue => "34",
            Style::Magenta => "35",
            Style::Cyan => "36",
            Style::Gray => "90",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Console output handler with color support detection.
#[derive(Debug, Clone)]
pub struct Console {
    stdout_colors: bool,
    stderr_colors: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Creates a Console, enabling colors per stream when it is a terminal
    /// and `NO_COLOR` is unset.
    pub fn new() -> Self {
        let allowed = std::env::var_os("NO_COLOR").is_none();
        Self {
            stdout_colors: allowed && io::stdout().is_terminal(),
            stderr_colors: allowed && io::stderr().is_terminal(),
        }
    }

    /// Creates a Console with colors explicitly enabled or disabled.
    pub fn with_colors(enabled: bool) -> Self {
        Self {
            stdout_colors: enabled,
            stderr_colors: enabled,
        }
    }

    fn paint(enabled: bool, text: &str, styles: &[Style]) -> String {
        if !enabled || styles.is_empty() {
            return text.to_string();
        }

        let codes: Vec<&str> = styles.iter().map(|s| s.code()).collect();
        format!("\x1b[{}m{}{}", codes.join(";"), text, RESET)
    }

    /// Applies ANSI styles for stdout output.
    pub fn style(&self, text: &str, styles: &[Style]) -> String {
        Self::paint(self.stdout_colors, text, styles)
    }

    /// Creates a colored label like `[INFO]`.
    pub fn label(&self, label: &str, color: Style) -> String {
        format!("[{}]", self.style(label, &[color, Style::Bold]))
    }

    fn err_label(&self, label: &str, color: Style) -> String {
        format!(
            "[{}]",
            Self::paint(self.stderr_colors, label, &[color, Style::Bold])
        )
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", self.label("INFO", Style::Blue), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", self.label("OK", Style::Green), message);
    }

    pub fn step(&self, message: &str) {
        println!("{} {}", self.label("STEP", Style::Cyan), message);
    }

    /// Prints a section header in magenta bold.
    pub fn section(&self, message: &str) {
        println!();
        println!("{}", self.style(message, &[Style::Magenta, Style::Bold]));
    }

    /// Prints a warning to stderr.
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", self.err_label("WARN", Style::Yellow), message);
    }

    /// Prints an error to stderr. Used for every skipped item.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.err_label("ERROR", Style::Red), message);
    }

    /// Formats a book reference as `#<id> <name>` for progress lines.
    pub fn book(&self, id: &str, name: &str) -> String {
        format!(
            "{} {}",
            self.style(&format!("#{}", id), &[Style::Gray]),
            self.style(name, &[Style::Bold])
        )
    }

    /// Formats a count with styling.
    pub fn count(&self, n: usize) -> String {
        self.style(&n.to_string(), &[Style::Green, Style::Bold])
    }
}
