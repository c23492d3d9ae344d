use std::{fmt, io};
use thiserror::Error;

pub use adbc_core::error::Status as DriverStatus;

/// Unified error type for every nullbind crate.
///
/// Driver failures keep the driver's message verbatim so reports can print
/// exactly what the driver said. Errors raised while a particular stage of
/// the reproduction runs are wrapped in [`Error::Stage`] so the caller can
/// tell a connection failure from a schema or control-case failure.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while writing the report.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while building or printing a columnar batch.
    ///
    /// Usually indicates a schema/column mismatch when assembling a
    /// parameter batch, or a formatting failure when rendering results.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// A non-OK status returned by the database driver.
    ///
    /// Displays as the bare driver message.
    #[error("{0}")]
    Driver(DriverError),

    /// Invalid user input or API parameter.
    ///
    /// Raised for malformed table identifiers, parameter rows that do not
    /// match their declared column types, and parameter batches whose width
    /// does not match the statement's placeholders.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// A failure that aborted one stage of the reproduction.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Build a driver error from a status and message.
    #[inline]
    pub fn driver(status: DriverStatus, message: impl Into<String>) -> Self {
        Error::Driver(DriverError::new(status, message))
    }

    /// Attach the stage that was running when `err` occurred.
    ///
    /// Already-staged errors are returned unchanged so the innermost stage
    /// wins.
    pub fn stage(stage: Stage, err: Error) -> Self {
        match err {
            staged @ Error::Stage { .. } => staged,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error aborted, if it was wrapped in one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Look through [`Error::Stage`] wrappers for the underlying driver error.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Driver(err) => Some(err),
            Error::Stage { source, .. } => source.driver_error(),
            _ => None,
        }
    }
}

impl From<adbc_core::error::Error> for Error {
    fn from(err: adbc_core::error::Error) -> Self {
        Error::Driver(DriverError::from(err))
    }
}

/// Status, message and diagnostics reported by a driver for one failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub status: DriverStatus,
    pub message: String,
    /// Five-character SQLSTATE, when the driver supplied one.
    pub sqlstate: Option<String>,
    pub vendor_code: i32,
}

impl DriverError {
    pub fn new(status: DriverStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            sqlstate: None,
            vendor_code: 0,
        }
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<adbc_core::error::Error> for DriverError {
    fn from(err: adbc_core::error::Error) -> Self {
        // An all-zero SQLSTATE means the driver did not set one.
        let sqlstate = if err.sqlstate.iter().all(|&c| c == 0) {
            None
        } else {
            Some(
                err.sqlstate
                    .iter()
                    .take_while(|&&c| c != 0)
                    .map(|&c| c as u8 as char)
                    .collect(),
            )
        };
        Self {
            status: err.status,
            message: err.message,
            sqlstate,
            vendor_code: err.vendor_code,
        }
    }
}

/// The stages of a reproduction run whose failure is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    SchemaPrep,
    Control,
    Probe,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connection setup",
            Stage::SchemaPrep => "schema preparation",
            Stage::Control => "control insert",
            Stage::Probe => "probe statement setup",
        };
        f.write_str(name)
    }
}
