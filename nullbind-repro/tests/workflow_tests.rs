use arrow_schema::DataType;
use nullbind_repro::{
    CaseOutcome, CaseRole, Expectation, ParamCase, ReproConfig, RunReport, run_reproduction,
};
use nullbind_result::{DriverStatus, Error, Stage};
use nullbind_params::ParamType;
use nullbind_test_utils::{
    Event, ExecuteFailure, HandleKind, Journal, Script, ScriptedBackend, init_tracing_for_tests,
};

fn run(script: Script, config: &ReproConfig) -> (Result<RunReport, Error>, String, Journal) {
    init_tracing_for_tests();
    let mut backend = ScriptedBackend::new(script);
    let journal = backend.journal();
    let mut out = Vec::new();
    let result = run_reproduction(&mut backend, config, &mut out);
    (result, String::from_utf8(out).expect("utf8 output"), journal)
}

fn assert_all_released(journal: &Journal) {
    assert!(
        journal.outstanding().is_empty(),
        "unreleased handles: {:?}",
        journal.outstanding()
    );
    for kind in [HandleKind::Database, HandleKind::Session, HandleKind::Statement] {
        assert_eq!(journal.opened(kind), journal.released(kind), "{kind:?}");
    }
}

#[test]
fn unpatched_driver_reproduces_the_bug() {
    let (result, output, journal) = run(Script::unpatched(), &ReproConfig::default());
    let report = result.expect("run completes");

    assert!(report.case(1).expect("case 1").outcome.is_success());

    let probe = &report.case(2).expect("case 2").outcome;
    let CaseOutcome::BindFailed(err) = probe else {
        panic!("expected bind failure, got {probe:?}");
    };
    let driver = err.driver_error().expect("driver error");
    assert_eq!(driver.message, "Can't map Arrow type 'na' to Postgres type");
    assert!(matches!(driver.status, DriverStatus::InvalidArguments));

    assert!(matches!(
        report.case(3).expect("case 3").outcome,
        CaseOutcome::BindFailed(_)
    ));
    // A typed NULL is a nullable text column and maps fine.
    assert!(report.case(4).expect("case 4").outcome.is_success());

    assert!(report.bug_reproduced());
    assert_eq!(report.table_row_count(), Some(2));
    assert!(Expectation::Reproduced.is_met(report.bug_reproduced()));
    assert!(!Expectation::Fixed.is_met(report.bug_reproduced()));

    assert!(output.starts_with("Initializing adbc_driver_postgresql driver...\nCreating test table...\n"));
    assert!(output.contains("\nTest 1: Insert with non-NULL values...\n✓ Success: Non-NULL values inserted\n"));
    assert!(output.contains(
        "\nTest 2: Insert with NULL value...\n✗ Failed: Can't map Arrow type 'na' to Postgres type\n   This is the bug - parameter $2: Can't map Arrow type 'na' to Postgres type\n"
    ));
    // Both columns of test 3 carry the no-type marker.
    assert!(output.contains(
        "   This is the bug - parameter $1: Can't map Arrow type 'na' to Postgres type\n   This is the bug - parameter $2: Can't map Arrow type 'na' to Postgres type\n"
    ));
    assert!(output.contains("--- Current table contents ---"));
    assert!(output.contains("alice@example.com"));
    assert!(output.contains("Cleaning up..."));
    assert!(output.contains("SUMMARY:"));

    assert_all_released(&journal);
}

#[test]
fn patched_driver_inserts_every_row() {
    let (result, output, journal) = run(Script::patched(), &ReproConfig::default());
    let report = result.expect("run completes");

    assert!(report.cases.iter().all(|case| case.outcome.is_success()));
    assert!(!report.bug_reproduced());
    assert_eq!(report.table_row_count(), Some(4));
    assert!(output.contains("✓ Success: NULL value inserted"));
    assert!(output.contains("✓ Success: Multiple NULL values inserted"));
    assert!(!output.contains("This is the bug"));
    assert!(Expectation::Fixed.is_met(report.bug_reproduced()));

    // The probe reaches execute with the no-type column intact.
    assert!(journal
        .events()
        .contains(&Event::Bind(vec![DataType::Utf8, DataType::Null])));
    assert_all_released(&journal);
}

#[test]
fn unreachable_store_aborts_before_any_statement() {
    let (result, output, journal) = run(Script::unreachable(), &ReproConfig::default());
    let err = result.expect_err("connection must fail");

    assert_eq!(err.failed_stage(), Some(Stage::Connect));
    assert!(err.to_string().contains("Connection refused"));
    assert!(output.contains("Initializing"));
    assert!(!output.contains("Creating test table"));
    assert!(journal.sql().is_empty());
    assert!(journal.executed().is_empty());
    assert_all_released(&journal);
}

#[test]
fn failed_connection_init_releases_the_database() {
    let (result, output, journal) = run(Script::connect_fails(), &ReproConfig::default());
    let err = result.expect_err("connection must fail");

    assert_eq!(err.failed_stage(), Some(Stage::Connect));
    assert!(err.to_string().contains("password authentication failed"));
    assert!(!output.contains("Creating test table"));
    assert_eq!(journal.opened(HandleKind::Database), 1);
    assert_eq!(journal.opened(HandleKind::Session), 0);
    assert_eq!(
        journal.events().last(),
        Some(&Event::Release(HandleKind::Database))
    );
    assert_all_released(&journal);
}

#[test]
fn schema_failure_is_fatal_and_skips_inserts() {
    let script = Script::patched().fail_execute(ExecuteFailure::new(
        "CREATE TABLE",
        1,
        "permission denied for schema public",
    ));
    let (result, output, journal) = run(script, &ReproConfig::default());
    let err = result.expect_err("schema prep must fail");

    assert_eq!(err.failed_stage(), Some(Stage::SchemaPrep));
    assert!(!output.contains("Test 1"));
    assert!(journal.sql().iter().all(|sql| !sql.starts_with("INSERT")));
    assert_eq!(journal.opened(HandleKind::Statement), 2);
    assert_all_released(&journal);
}

#[test]
fn control_failure_is_fatal() {
    let script = Script::patched().fail_execute(ExecuteFailure::new(
        "INSERT",
        1,
        "duplicate key value violates unique constraint",
    ));
    let (result, output, journal) = run(script, &ReproConfig::default());
    let err = result.expect_err("control must fail");

    assert_eq!(err.failed_stage(), Some(Stage::Control));
    assert!(output.contains("✗ Failed: duplicate key value"));
    assert!(!output.contains("Test 2"));
    assert!(!output.contains("SUMMARY"));
    // No further statements after the failing insert.
    assert_eq!(journal.sql().last().map(String::as_str), Some("INSERT INTO test_nulls (name, email) VALUES ($1, $2)"));
    assert_eq!(journal.executed().len(), 3);
    assert_all_released(&journal);
}

#[test]
fn execute_failure_after_bind_is_reported_not_fatal() {
    let script = Script::patched().fail_execute(
        ExecuteFailure::new(
            "INSERT",
            2,
            "null value in column \"email\" violates not-null constraint",
        )
        .with_sqlstate("23502"),
    );
    let (result, output, journal) = run(script, &ReproConfig::default());
    let report = result.expect("run completes");

    let probe = &report.case(2).expect("case 2").outcome;
    assert!(matches!(probe, CaseOutcome::ExecuteFailed(_)));
    assert!(probe.describe().starts_with("bind succeeded but execute failed"));
    assert!(report.bug_reproduced());
    assert!(output.contains("Error status: IO (SQLSTATE 23502) during execute"));
    assert!(!output.contains("This is the bug"));
    assert_all_released(&journal);
}

#[test]
fn keep_table_and_no_inspect_skip_their_statements() {
    let config = ReproConfig {
        keep_table: true,
        inspect_table: false,
        ..ReproConfig::default()
    };
    let (result, output, journal) = run(Script::patched(), &config);
    let report = result.expect("run completes");

    assert!(report.table_contents.is_none());
    assert!(!output.contains("Current table contents"));
    let sql = journal.sql();
    assert!(sql.iter().all(|s| !s.starts_with("SELECT")));
    assert!(sql.iter().all(|s| s != "DROP TABLE test_nulls"));
    assert_all_released(&journal);
}

#[test]
fn cleanup_drops_the_table_last() {
    let (result, _, journal) = run(Script::unpatched(), &ReproConfig::default());
    result.expect("run completes");

    let sql = journal.sql();
    assert_eq!(sql.first().map(String::as_str), Some("DROP TABLE IF EXISTS test_nulls"));
    assert_eq!(sql.last().map(String::as_str), Some("DROP TABLE test_nulls"));

    let events = journal.events();
    let tail: Vec<&Event> = events.iter().rev().take(2).collect();
    assert_eq!(
        tail,
        vec![
            &Event::Release(HandleKind::Database),
            &Event::Release(HandleKind::Session)
        ]
    );
}

#[test]
fn invalid_table_name_is_rejected_before_connecting() {
    let config = ReproConfig {
        table: "test_nulls; DROP TABLE users".to_string(),
        ..ReproConfig::default()
    };
    let (result, output, journal) = run(Script::patched(), &config);
    assert!(matches!(result, Err(Error::InvalidArgumentError(_))));
    assert!(output.is_empty());
    assert!(journal.events().is_empty());
}

#[test]
fn text_in_untyped_column_is_a_setup_error() {
    let mut config = ReproConfig::default();
    config.cases.push(ParamCase::new(
        "Text in a no-type column",
        "unreachable",
        CaseRole::Probe,
        [ParamType::Utf8, ParamType::Untyped],
        [Some("Dave"), Some("dave@example.com")],
    ));
    let (result, _, journal) = run(Script::patched(), &config);
    let err = result.expect_err("bad case must fail");

    assert_eq!(err.failed_stage(), Some(Stage::Probe));
    assert_all_released(&journal);
}
