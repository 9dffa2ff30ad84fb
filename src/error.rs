//! Error types for o4n.
//!
//! This module defines the error type shared by the scanner and the renderer,
//! providing rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::ttp::TtpError;

/// Result type alias for o4n operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for o4n.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Inventory Errors
    // ========================================================================
    /// Error loading or parsing an inventory source.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// The dynamic inventory command could not produce an inventory.
    #[error("dynamic inventory could not be imported from '{source_name}': {message}")]
    DynamicInventory {
        /// Inventory source handed to the command
        source_name: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Scan Errors
    // ========================================================================
    /// The scan could not be carried out at all.
    #[error("reachability scan aborted: {0}")]
    ScanAborted(String),

    /// Writing the unreachable hosts report failed.
    #[error("failed to write report to '{path}': {message}")]
    ReportWrite {
        /// Destination path
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Extraction / Rendering Errors
    // ========================================================================
    /// Extraction template could not be compiled.
    #[error(transparent)]
    Extraction(#[from] TtpError),

    /// The configuration produced no records.
    #[error("no data extracted from configuration")]
    NoMatches,

    /// Template rendering error.
    #[error("template rendering failed for '{template}': {message}")]
    TemplateRender {
        /// Template name or path
        template: String,
        /// Error message
        message: String,
    },

    /// Invalid combination of renderer inputs.
    #[error("invalid renderer input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// File not found.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new dynamic inventory error.
    pub fn dynamic_inventory(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DynamicInventory {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new template render error.
    pub fn template_render(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates a new report write error.
    pub fn report_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReportWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ScanAborted(_) | Error::ReportWrite { .. } => 3,
            Error::Extraction(_) => 4,
            Error::Inventory(_) | Error::DynamicInventory { .. } => 5,
            Error::NoMatches | Error::TemplateRender { .. } => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::NoMatches.exit_code(), 6);
        assert_eq!(Error::template_render("t", "undefined value").exit_code(), 6);
        assert_eq!(Error::ScanAborted("x".into()).exit_code(), 3);
        assert_eq!(Error::dynamic_inventory("inv.yml", "exit 1").exit_code(), 5);
        assert_eq!(Error::Config("bad".into()).exit_code(), 1);
    }

    #[test]
    fn test_dynamic_inventory_message() {
        let err = Error::dynamic_inventory("fedele.yml", "exit status 1");
        assert_eq!(
            err.to_string(),
            "dynamic inventory could not be imported from 'fedele.yml': exit status 1"
        );
    }

    #[test]
    fn test_context_wraps_source() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        ));
        let err = res.context("writing report").unwrap_err();
        assert_eq!(err.to_string(), "writing report");
        assert!(std::error::Error::source(&err).is_some());
    }
}
