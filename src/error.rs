//! Report pipeline error types
//!
//! Classification and BMI errors are local data-integrity errors and propagate
//! to the caller of the pure function; they are never defaulted to "Normal".
//! Export failures abort the whole document assembly.

use thiserror::Error;

/// Errors produced by the report derivation and export pipeline
#[derive(Debug, Error)]
pub enum ReportError {
    /// Reference range string did not parse into two numeric bounds
    #[error("malformed reference range: {0:?}")]
    MalformedReferenceRange(String),

    /// Height or weight was non-positive
    #[error("invalid body profile: {0}")]
    InvalidBodyProfile(String),

    /// Provider response failed structural schema validation
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Export was requested before any report was rendered
    #[error("no rendered report to export")]
    ExportTargetMissing,

    /// A report section failed to rasterize; the whole export is aborted
    #[error("section '{section}' failed to rasterize: {reason}")]
    ExportRasterFailure { section: String, reason: String },

    /// Provider request failed at the network or HTTP level
    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report pipeline operations
pub type ReportResult<T> = Result<T, ReportError>;
