//! Output formatting and display system
//!
//! Human-readable text (plain or colored) for every diagnostic result, or
//! the annotated result as a JSON document.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};

use crate::{
    error::{AppError, Result},
    models::{AnnotatedResult, Config, DiagnosticResult},
};
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, true)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json_output: bool,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>, json_output: bool) -> Self {
        Self { formatter, json_output }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            OutputFormatterFactory::create_formatter(config.enable_color, config.verbose),
            config.json_output,
        )
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    /// Render one annotated result: pretty JSON in JSON mode, otherwise the
    /// text produced by `text`
    pub fn render<T, F>(&self, annotated: &AnnotatedResult<T>, text: F) -> Result<String>
    where
        T: Serialize,
        F: FnOnce(&dyn OutputFormatter, &DiagnosticResult<T>) -> Result<String>,
    {
        if self.json_output {
            return serde_json::to_string_pretty(annotated).map_err(AppError::from);
        }
        text(self.formatter.as_ref(), annotated.result())
    }
}
