//! Human-readable and JSON rendering of command results
//!
//! In JSON mode every command prints exactly one JSON document on stdout,
//! and errors go to stderr as `{"error": ..., "exit_code": ...}`.

use serde::Serialize;

use super::OutputConfig;
use crate::exit_code::ExitCode;

/// Status marks prefixed to human-readable messages
#[derive(Debug, Clone, Copy)]
enum Mark {
    Ok,
    Fail,
    Warn,
}

impl Mark {
    fn glyph(self) -> &'static str {
        match self {
            Mark::Ok => "✓",
            Mark::Fail => "✗",
            Mark::Warn => "⚠",
        }
    }

    fn ansi(self) -> &'static str {
        match self {
            Mark::Ok => "32",
            Mark::Fail => "31",
            Mark::Warn => "33",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    /// Never true in JSON mode
    pub fn colors_enabled(&self) -> bool {
        !(self.config.no_color || self.config.json)
    }

    fn marked(&self, mark: Mark, message: &str) -> String {
        if self.colors_enabled() {
            format!("\x1b[{}m{}\x1b[0m {message}", mark.ansi(), mark.glyph())
        } else {
            format!("{} {message}", mark.glyph())
        }
    }

    /// Human-only confirmation on stdout
    pub fn success(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            println!("{}", self.marked(Mark::Ok, message));
        }
    }

    /// Printed in every mode, quiet included
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", error_document(message, None));
        } else {
            eprintln!("{}", self.marked(Mark::Fail, message));
        }
    }

    /// Report a store error and return the matching exit code
    pub fn fail(&self, context: &str, error: &snap_core::Error) -> ExitCode {
        let code = ExitCode::from(error);
        let message = format!("{context}: {error}");
        if self.config.json {
            eprintln!("{}", error_document(&message, Some(code)));
        } else {
            eprintln!("{}", self.marked(Mark::Fail, &message));
        }
        code
    }

    pub fn warning(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            eprintln!("{}", self.marked(Mark::Warn, message));
        }
    }

    /// Print `value` as the command's JSON document
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(document) => println!("{document}"),
            Err(e) => self.error(&format!("Could not encode output: {e}")),
        }
    }

    /// Plain stdout line; suppressed in quiet mode
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }
}

fn error_document(message: &str, code: Option<ExitCode>) -> String {
    let mut document = serde_json::json!({ "error": message });
    if let Some(code) = code {
        document["exit_code"] = code.as_i32().into();
    }
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| message.to_string())
}
