use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{transformation_engine::TransformationSummary, validation::ValidationReport};

/// Formats per-file outcomes for the console or as machine-readable JSON.
pub struct TransformationReporter {
    output_format: ReportFormat,
}

/// Available output formats for batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Console,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(ReportFormat::Console),
            "json" => Ok(ReportFormat::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Condensed validation outcome carried in file reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    pub is_valid: bool,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(report: &ValidationReport) -> Self {
        Self {
            total_errors: report.errors.len(),
            total_warnings: report.warnings.len(),
            is_valid: report.is_valid,
        }
    }
}

/// Outcome of processing one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input: String,
    pub output: Option<String>,
    pub summary: Option<TransformationSummary>,
    pub validation: Option<ValidationSummary>,
    pub error: Option<String>,
}

impl FileReport {
    pub fn success(
        input: String,
        output: String,
        summary: TransformationSummary,
        validation: Option<&ValidationReport>,
    ) -> Self {
        Self {
            input,
            output: Some(output),
            summary: Some(summary),
            validation: validation.map(ValidationSummary::from),
            error: None,
        }
    }

    pub fn failure(input: String, error: String) -> Self {
        Self {
            input,
            output: None,
            summary: None,
            validation: None,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated outcome of a multi-file invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub target_version: String,
    pub files: Vec<FileReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn new(target_version: String, files: Vec<FileReport>) -> Self {
        let succeeded = files.iter().filter(|file| file.succeeded()).count();
        let failed = files.len() - succeeded;
        Self {
            target_version,
            files,
            succeeded,
            failed,
        }
    }
}

impl TransformationReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    /// One console line per file, matching the batch output of the tool.
    pub fn format_file_line(&self, report: &FileReport) -> String {
        match &report.error {
            Some(error) => format!("[FAIL] {}: {}", report.input, error),
            None => {
                let summary = report.summary.clone().unwrap_or_default();
                let check = match &report.validation {
                    None => String::new(),
                    Some(validation) if validation.is_valid => " | check:OK".to_string(),
                    Some(validation) => {
                        format!(" | check:FAIL ({} errors)", validation.total_errors)
                    }
                };
                format!(
                    "[OK] {} -> {} | AddtlNtryInf*={}, ValDt+={}{}",
                    report.input,
                    report.output.as_deref().unwrap_or("-"),
                    summary.addtl_ntry_inf_changed,
                    summary.valdt_added_on_entries,
                    check
                )
            }
        }
    }

    /// Format the whole batch according to the configured output format.
    pub fn format_report(&self, report: &BatchReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(report
                .files
                .iter()
                .map(|file| self.format_file_line(file))
                .collect::<Vec<_>>()
                .join("\n")),
            ReportFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|error| ReportError::Serialization(error.to_string())),
        }
    }
}

impl Default for TransformationReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown report format: {0} (expected console or json)")]
    UnknownFormat(String),
}
