//! CSV export of assessment entries
//!
//! Fields are quoted only when they contain a comma, a double quote, CR or
//! LF. Output carries no terminator after the last row.

use crate::entry::RaEntry;
use crate::ids::AssessmentId;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

/// Header row, in column order
pub const CSV_HEADERS: [&str; 11] = [
    "Activity / Task",
    "Hazard",
    "Risk",
    "Who is Affected?",
    "Initial Likelihood",
    "Initial Impact",
    "Initial Risk",
    "Control Measures",
    "Resultant Likelihood",
    "Resultant Impact",
    "Resultant Risk",
];

/// Row separator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    fn terminator(self) -> Terminator {
        match self {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::CrLf => Terminator::CRLF,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Export options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default)]
    pub line_ending: LineEnding,
}

impl CsvOptions {
    /// With line ending
    #[inline]
    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Export failure
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer flush failed: {0}")]
    Flush(String),

    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render entries as CSV text, header first.
///
/// # Errors
/// Only on writer failures, which an in-memory buffer does not produce in
/// practice.
pub fn to_csv(entries: &[RaEntry], options: &CsvOptions) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(options.line_ending.terminator())
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for entry in entries {
        writer.write_record(row(entry))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    let mut text = String::from_utf8(bytes)?;

    let ending = options.line_ending.as_str();
    if text.ends_with(ending) {
        text.truncate(text.len() - ending.len());
    }
    Ok(text)
}

fn row(entry: &RaEntry) -> [String; 11] {
    [
        entry.task_description.clone().unwrap_or_default(),
        entry.hazard_name().unwrap_or_default().to_string(),
        entry.risk_name().unwrap_or_default().to_string(),
        entry.person_affected.clone().unwrap_or_default(),
        entry.initial_likelihood.to_string(),
        entry.initial_impact.to_string(),
        entry.initial_risk().to_string(),
        entry.control_measures.clone().unwrap_or_default(),
        entry.resultant_likelihood.to_string(),
        entry.resultant_impact.to_string(),
        entry.resultant_risk().to_string(),
    ]
}

/// Download name for an assessment's export
#[must_use]
pub fn export_file_name(ra_id: AssessmentId) -> String {
    format!("risk_assessment_{ra_id}.csv")
}
