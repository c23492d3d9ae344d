use std::io::Write;

use arrow_array::RecordBatch;
use nullbind_result::Result;

use crate::cases::CaseReport;

pub const BANNER: &str = "============================================================";

/// Everything observed during one run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
    /// Table contents read back after the cases, when inspection ran and
    /// succeeded.
    pub table_contents: Option<Vec<RecordBatch>>,
}

impl RunReport {
    /// True when any probe using the no-type marker failed to insert.
    pub fn bug_reproduced(&self) -> bool {
        self.cases
            .iter()
            .any(|report| report.case.uses_untyped() && report.outcome.error().is_some())
    }

    /// True when at least one case exercised the no-type marker.
    pub fn probed_untyped(&self) -> bool {
        self.cases.iter().any(|report| report.case.uses_untyped())
    }

    pub fn table_row_count(&self) -> Option<usize> {
        self.table_contents
            .as_ref()
            .map(|batches| batches.iter().map(RecordBatch::num_rows).sum())
    }

    pub fn case(&self, number: usize) -> Option<&CaseReport> {
        self.cases.iter().find(|report| report.number == number)
    }

    /// Write the closing summary block.
    pub fn render_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "\n{BANNER}")?;
        writeln!(out, "SUMMARY:")?;
        for report in &self.cases {
            let marker = if report.outcome.error().is_some() { '✗' } else { '✓' };
            writeln!(
                out,
                "{marker} Test {} ({}): {}",
                report.number,
                report.case.title,
                report.outcome.describe()
            )?;
        }
        if let Some(rows) = self.table_row_count() {
            writeln!(out, "Rows in table after tests: {rows}")?;
        }
        writeln!(out, "{}", self.verdict())?;
        writeln!(out, "{BANNER}")?;
        Ok(())
    }

    pub fn verdict(&self) -> &'static str {
        if !self.probed_untyped() {
            "No parameters used the Arrow 'na' type; nothing to conclude"
        } else if self.bug_reproduced() {
            "NULL parameters typed as Arrow 'na' fail: the driver cannot map them to a Postgres type"
        } else {
            "NULL parameters typed as Arrow 'na' were bound and inserted: the driver handles them"
        }
    }
}
