//! Terminal output in colored text or JSON

use crate::error::Result;
use colored::Colorize;
use serde::Serialize;

/// Formats command results for humans or machines
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    json: bool,
    color: bool,
}

impl OutputFormatter {
    #[must_use]
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            json,
            color: !no_color,
        }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Display formatted success message
    pub fn success(&self, message: &str) {
        if self.json {
            return;
        }
        if self.color {
            println!("{} {message}", "✓".green().bold());
        } else {
            println!("OK {message}");
        }
    }

    /// Display formatted info message
    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    /// Display formatted warning message
    pub fn warning(&self, message: &str) {
        if self.color {
            eprintln!("{} {message}", "warning:".yellow().bold());
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Display formatted error message; always goes to stderr
    pub fn error(&self, message: &str) {
        if self.color {
            eprintln!("{} {message}", "error:".red().bold());
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Print any serializable value as pretty JSON on stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_flag() {
        assert!(OutputFormatter::new(true, true).is_json());
        assert!(!OutputFormatter::new(false, true).is_json());
    }

    #[test]
    fn test_print_json_accepts_values() {
        let output = OutputFormatter::new(true, true);
        output
            .print_json(&serde_json::json!({"status": "ok"}))
            .unwrap();
    }
}
