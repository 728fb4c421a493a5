//! Error types for linsss-rs.

use thiserror::Error;

/// The main error type for linsss core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A BSSRDF profile file ended before the declared payload.
    #[error("BSSRDF profile truncated: expected {expected} bytes, got {actual}")]
    ProfileTruncated { expected: usize, actual: usize },

    /// A BSSRDF profile declares more Gaussian lobes than supported.
    #[error("BSSRDF profile has {n_gauss} lobes, maximum is {max}")]
    TooManyLobes { n_gauss: u32, max: u32 },

    /// A BSSRDF profile header field is out of range.
    #[error("invalid BSSRDF profile header: {0}")]
    InvalidHeader(String),

    /// A spherical harmonics coefficient file is malformed.
    #[error("invalid SH coefficient file: {0}")]
    InvalidShFile(String),

    /// The render-pass schedule references a resource no pass produces.
    #[error("pass '{pass}' reads '{resource}' which no earlier pass writes")]
    UnsatisfiedRead { pass: String, resource: String },

    /// Two passes in the schedule write the same resource.
    #[error("resource '{resource}' is written by both '{first}' and '{second}'")]
    DuplicateWriter {
        resource: String,
        first: String,
        second: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for linsss core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
