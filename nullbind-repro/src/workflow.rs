//! The reproduction run: connect, prepare the scratch table, run the
//! parameter cases, inspect, clean up, summarize.
//!
//! Connection, schema and control-case failures abort the run with an
//! [`Error::Stage`]. Probe failures are recorded as [`CaseOutcome`]s. Handles
//! are owned by the stack frame that opened them, so every early return
//! releases the statement, then the session, then the database.

use std::io::Write;

use arrow::util::pretty::pretty_format_batches;
use arrow_array::RecordBatch;
use arrow_schema::DataType;
use nullbind_params::{
    ParamBatch, ParamType, arrow_type_label, postgres_type_for, unmappable_type_message,
};
use nullbind_result::{Error, Result, Stage};
use nullbind_session::{Backend, Database, ParamStatement, Session};

use crate::cases::{CaseOutcome, CaseReport, CaseRole, ParamCase};
use crate::config::ReproConfig;
use crate::report::RunReport;

const TRACE_TARGET: &str = "nullbind";

/// Run every stage against `backend`, writing progress to `out`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgumentError`] for an invalid configuration
/// (before any driver call), and [`Error::Stage`] when connecting, preparing
/// the schema, preparing a statement or the control insert fails.
pub fn run_reproduction<B, W>(backend: &mut B, config: &ReproConfig, out: &mut W) -> Result<RunReport>
where
    B: Backend,
    W: Write,
{
    config.validate()?;

    writeln!(out, "Initializing {} driver...", config.driver)?;
    tracing::info!(target: TRACE_TARGET, driver = %config.driver, "connecting");
    let report = {
        let mut database = backend
            .open(&config.target())
            .map_err(|err| Error::stage(Stage::Connect, err))?;
        let mut session = database
            .connect()
            .map_err(|err| Error::stage(Stage::Connect, err))?;

        exercise(&mut session, config, out)?
    };

    report.render_summary(out)?;
    Ok(report)
}

fn exercise<S, W>(session: &mut S, config: &ReproConfig, out: &mut W) -> Result<RunReport>
where
    S: Session,
    W: Write,
{
    writeln!(out, "Creating test table...")?;
    tracing::info!(target: TRACE_TARGET, table = %config.table, "preparing schema");
    execute_sql(session, &config.drop_if_exists_sql())
        .and_then(|_| execute_sql(session, &config.create_sql()))
        .map_err(|err| Error::stage(Stage::SchemaPrep, err))?;

    let insert_sql = config.insert_sql();
    let mut report = RunReport::default();
    for (idx, case) in config.cases.iter().enumerate() {
        let number = idx + 1;
        writeln!(out, "\nTest {number}: {}...", case.title)?;
        let outcome = run_case(session, &insert_sql, case)?;
        print_outcome(out, case, &outcome)?;

        if case.role == CaseRole::Control {
            if let CaseOutcome::BindFailed(err) | CaseOutcome::ExecuteFailed(err) = outcome {
                return Err(Error::stage(Stage::Control, err));
            }
        }
        report.cases.push(CaseReport {
            number,
            case: case.clone(),
            outcome,
        });
    }

    if config.inspect_table {
        writeln!(out, "\n--- Current table contents ---")?;
        match query(session, &config.select_sql()) {
            Ok(batches) => {
                print_rows(out, &batches)?;
                report.table_contents = Some(batches);
            }
            Err(err) => {
                tracing::warn!(target: TRACE_TARGET, error = %err, "table inspection failed");
                writeln!(out, "✗ Failed to read table: {err}")?;
            }
        }
    }

    writeln!(out, "\nCleaning up...")?;
    if !config.keep_table {
        if let Err(err) = execute_sql(session, &config.drop_sql()) {
            tracing::warn!(target: TRACE_TARGET, error = %err, "dropping scratch table failed");
            writeln!(out, "✗ Failed to drop {}: {err}", config.table)?;
        }
    }

    Ok(report)
}

/// Prepare a fresh statement for `case`, bind its row and execute.
///
/// Statement creation, SQL assignment and batch assembly are setup: their
/// failure is an error. Bind and execute failures become the outcome.
fn run_case<S: Session>(session: &mut S, sql: &str, case: &ParamCase) -> Result<CaseOutcome> {
    let stage = match case.role {
        CaseRole::Control => Stage::Control,
        CaseRole::Probe => Stage::Probe,
    };
    let params = case
        .param_batch()
        .and_then(|params| params.check_placeholders(sql).map(|()| params))
        .map_err(|err| Error::stage(stage, err))?;
    let mut stmt = prepare(session, sql).map_err(|err| Error::stage(stage, err))?;

    log_params(case, &params);
    if let Err(err) = stmt.bind(params.into_record_batch()) {
        tracing::warn!(target: TRACE_TARGET, case = %case.title, error = %err, "bind failed");
        return Ok(CaseOutcome::BindFailed(err));
    }
    match stmt.execute_update() {
        Ok(rows_affected) => Ok(CaseOutcome::Succeeded { rows_affected }),
        Err(err) => {
            tracing::warn!(target: TRACE_TARGET, case = %case.title, error = %err, "execute failed");
            Ok(CaseOutcome::ExecuteFailed(err))
        }
    }
}

fn log_params(case: &ParamCase, params: &ParamBatch) {
    let types: Vec<String> = params
        .types()
        .iter()
        .map(|ty| {
            let data_type = ty.data_type();
            let target = postgres_type_for(&data_type).unwrap_or_else(|| "?".to_string());
            format!("{}->{target}", arrow_type_label(&data_type))
        })
        .collect();
    tracing::debug!(
        target: TRACE_TARGET,
        case = %case.title,
        ?types,
        null_counts = ?params.null_counts(),
        "binding parameters"
    );
}

/// 1-based positions of parameters with no Postgres column type.
fn unmapped_parameters(types: &[ParamType]) -> Vec<(usize, DataType)> {
    types
        .iter()
        .enumerate()
        .map(|(idx, ty)| (idx + 1, ty.data_type()))
        .filter(|(_, data_type)| postgres_type_for(data_type).is_none())
        .collect()
}

fn print_outcome<W: Write>(out: &mut W, case: &ParamCase, outcome: &CaseOutcome) -> Result<()> {
    match outcome {
        CaseOutcome::Succeeded { .. } => {
            writeln!(out, "✓ Success: {}", case.success_label)?;
        }
        CaseOutcome::BindFailed(err) => {
            writeln!(out, "✗ Failed: {err}")?;
            let driver_message = err.driver_error().map(|driver| driver.message.as_str());
            for (position, data_type) in unmapped_parameters(&case.types) {
                let message = unmappable_type_message(&data_type);
                if driver_message == Some(message.as_str()) {
                    writeln!(out, "   This is the bug - parameter ${position}: {message}")?;
                }
            }
            print_status(out, err, "bind")?;
        }
        CaseOutcome::ExecuteFailed(err) => {
            writeln!(out, "✗ Failed: {err}")?;
            print_status(out, err, "execute")?;
        }
    }
    Ok(())
}

fn print_status<W: Write>(out: &mut W, err: &Error, phase: &str) -> Result<()> {
    if let Some(driver) = err.driver_error() {
        match &driver.sqlstate {
            Some(sqlstate) => writeln!(
                out,
                "   Error status: {:?} (SQLSTATE {sqlstate}) during {phase}",
                driver.status
            )?,
            None => writeln!(out, "   Error status: {:?} during {phase}", driver.status)?,
        }
    }
    Ok(())
}

fn print_rows<W: Write>(out: &mut W, batches: &[RecordBatch]) -> Result<()> {
    if batches.iter().all(|batch| batch.num_rows() == 0) {
        writeln!(out, "  (no rows)")?;
        return Ok(());
    }
    let table = pretty_format_batches(batches)?;
    for line in table.to_string().lines() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

fn prepare<S: Session>(session: &mut S, sql: &str) -> Result<S::Statement> {
    let mut stmt = session.new_statement()?;
    stmt.set_sql_query(sql)?;
    Ok(stmt)
}

fn execute_sql<S: Session>(session: &mut S, sql: &str) -> Result<Option<i64>> {
    tracing::debug!(target: TRACE_TARGET, sql, "execute");
    prepare(session, sql)?.execute_update()
}

fn query<S: Session>(session: &mut S, sql: &str) -> Result<Vec<RecordBatch>> {
    tracing::debug!(target: TRACE_TARGET, sql, "query");
    prepare(session, sql)?.execute_query()
}
