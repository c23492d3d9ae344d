//! Error types and result definitions for nullbind.
//!
//! Every crate in the workspace returns [`Result<T>`] with the single
//! [`Error`] enum defined here, so failures propagate across crate
//! boundaries with `?`.
//!
//! # Error Categories
//!
//! - **Driver errors** ([`Error::Driver`]): non-OK statuses from the ADBC
//!   driver, carrying the driver's message verbatim
//! - **Data format errors** ([`Error::Arrow`]): parameter batch assembly and
//!   result rendering
//! - **User input errors** ([`Error::InvalidArgumentError`]): bad
//!   identifiers, rows that do not fit their declared column types
//! - **Stage failures** ([`Error::Stage`]): any of the above, tagged with
//!   the reproduction stage it aborted
//! - **I/O errors** ([`Error::Io`]): writing the report

pub mod error;
pub mod result;

pub use error::{DriverError, DriverStatus, Error, Stage};
pub use result::Result;
