//! Database session abstraction for nullbind.
//!
//! The reproduction talks to a store through four small traits that mirror
//! the ADBC handle hierarchy: a [`Backend`] opens a [`Database`], which opens
//! [`Session`]s, which create [`ParamStatement`]s. Every handle is released
//! by `Drop`, so early returns cannot leak one.
//!
//! [`AdbcBackend`] is the production implementation over the ADBC driver
//! manager. Tests use the scripted backend from `nullbind-test-utils`.

pub mod adbc;
pub mod traits;

pub use adbc::{AdbcBackend, AdbcDatabase, AdbcSession, AdbcStatement};
pub use traits::{Backend, ConnectTarget, Database, ParamStatement, Session};
