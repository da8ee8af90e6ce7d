use std::path::PathBuf;
use thiserror::Error;

use crate::model::{AnnotationId, Feature};
use crate::validation::ValidationReport;

/// The main error type for facelabel operations.
#[derive(Debug, Error)]
pub enum FacelabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation '{input}': {message}")]
    GrammarParse { input: String, message: String },

    #[error("Unknown feature code '{0}'")]
    UnknownFeature(String),

    #[error("Block '{block}' appears more than once in one annotation")]
    DuplicateBlock { block: String },

    #[error("Attribute block '{block}' is not a valid selection")]
    AttributeRejected { block: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{child} cannot be nested inside {parent}")]
    InvalidNesting { parent: Feature, child: Feature },

    #[error("No annotation {0} in this tree")]
    UnknownAnnotation(AnnotationId),

    #[error("Invalid attribute schema: {0}")]
    SchemaParse(String),

    #[error("Failed to parse {path} line {line}: {source}")]
    ListParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<FacelabelError>,
    },

    #[error("Failed to read image dimensions from {path}: {message}")]
    ImageDimensionRead { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FacelabelError {
    pub(crate) fn grammar(input: &str, message: impl Into<String>) -> Self {
        FacelabelError::GrammarParse {
            input: input.to_string(),
            message: message.into(),
        }
    }
}
