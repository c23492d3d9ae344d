//! Reproduction of the ADBC NULL parameter binding defect.
//!
//! The run opens a database and connection through a
//! [`nullbind_session::Backend`], recreates a scratch table, inserts a fully
//! populated text row as a control, then inserts rows whose NULL parameters
//! carry the Arrow no-type marker (`na`). Drivers that cannot map `na` to a
//! column type fail the bind; the run reports which step failed and the
//! driver's message instead of treating it as fatal.
//!
//! ```no_run
//! use nullbind_repro::{ReproConfig, run_reproduction};
//! use nullbind_session::AdbcBackend;
//!
//! let mut backend = AdbcBackend::default();
//! let report = run_reproduction(&mut backend, &ReproConfig::default(), &mut std::io::stdout())?;
//! println!("bug reproduced: {}", report.bug_reproduced());
//! # Ok::<(), nullbind_result::Error>(())
//! ```

pub mod cases;
pub mod config;
pub mod report;
pub mod workflow;

pub use cases::{CaseOutcome, CaseReport, CaseRole, ParamCase};
pub use config::{
    DEFAULT_DRIVER, DEFAULT_TABLE, DEFAULT_URI, Expectation, ReproConfig, validate_identifier,
};
pub use report::RunReport;
pub use workflow::run_reproduction;
