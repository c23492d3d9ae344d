use nullbind_params::{ParamBatch, ParamType};
use nullbind_result::{Error, Result};

/// Whether a case's failure aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseRole {
    /// Must succeed; a failure is fatal.
    Control,
    /// Any outcome is an observation.
    Probe,
}

/// One insert of a single parameter row into the scratch table.
#[derive(Debug, Clone)]
pub struct ParamCase {
    pub title: String,
    /// Printed after `✓ Success:` when the insert goes through.
    pub success_label: String,
    pub role: CaseRole,
    /// `(name, email)` column types.
    pub types: [ParamType; 2],
    /// `(name, email)` values; `None` binds NULL.
    pub row: [Option<String>; 2],
}

impl ParamCase {
    pub fn new(
        title: impl Into<String>,
        success_label: impl Into<String>,
        role: CaseRole,
        types: [ParamType; 2],
        row: [Option<&str>; 2],
    ) -> Self {
        Self {
            title: title.into(),
            success_label: success_label.into(),
            role,
            types,
            row: row.map(|value| value.map(str::to_string)),
        }
    }

    /// The control insert, the single and double no-type NULL probes, and a
    /// typed NULL probe that separates "nullable text" from "no type".
    pub fn default_suite() -> Vec<ParamCase> {
        use ParamType::{Untyped, Utf8};
        vec![
            ParamCase::new(
                "Insert with non-NULL values",
                "Non-NULL values inserted",
                CaseRole::Control,
                [Utf8, Utf8],
                [Some("Alice"), Some("alice@example.com")],
            ),
            ParamCase::new(
                "Insert with NULL value",
                "NULL value inserted",
                CaseRole::Probe,
                [Utf8, Untyped],
                [Some("Bob"), None],
            ),
            ParamCase::new(
                "Insert with multiple NULL values",
                "Multiple NULL values inserted",
                CaseRole::Probe,
                [Untyped, Untyped],
                [None, None],
            ),
            ParamCase::new(
                "Insert with typed NULL value",
                "Typed NULL value inserted",
                CaseRole::Probe,
                [Utf8, Utf8],
                [Some("Carol"), None],
            ),
        ]
    }

    pub fn uses_untyped(&self) -> bool {
        self.types.iter().any(|ty| ty.is_untyped())
    }

    pub fn param_batch(&self) -> Result<ParamBatch> {
        let row = [self.row[0].as_deref(), self.row[1].as_deref()];
        ParamBatch::single_row(&self.types, &row)
    }
}

/// What happened when a case's parameters were bound and executed.
#[derive(Debug)]
pub enum CaseOutcome {
    Succeeded { rows_affected: Option<i64> },
    BindFailed(Error),
    /// Bind went through, the driver rejected the statement on execute.
    ExecuteFailed(Error),
}

impl CaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaseOutcome::Succeeded { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            CaseOutcome::Succeeded { .. } => None,
            CaseOutcome::BindFailed(err) | CaseOutcome::ExecuteFailed(err) => Some(err),
        }
    }

    /// Short description for the summary.
    pub fn describe(&self) -> String {
        match self {
            CaseOutcome::Succeeded { .. } => "succeeded".to_string(),
            CaseOutcome::BindFailed(err) => format!("bind failed: {err}"),
            CaseOutcome::ExecuteFailed(err) => {
                format!("bind succeeded but execute failed: {err}")
            }
        }
    }
}

/// A case together with its observed outcome.
#[derive(Debug)]
pub struct CaseReport {
    pub number: usize,
    pub case: ParamCase,
    pub outcome: CaseOutcome,
}
