use arrow_schema::DataType;
use nullbind_params::{ParamBatch, ParamType};
use nullbind_session::{Backend, ConnectTarget, Database, ParamStatement, Session};
use nullbind_test_utils::{
    Event, ExecuteFailure, HandleKind, Script, ScriptedBackend, init_tracing_for_tests,
};

fn target() -> ConnectTarget {
    ConnectTarget::new("adbc_driver_postgresql", "postgresql://localhost/test")
}

fn untyped_row() -> ParamBatch {
    ParamBatch::single_row(&[ParamType::Utf8, ParamType::Untyped], &[Some("Bob"), None])
        .expect("batch")
}

#[test]
fn unpatched_bind_rejects_no_type_column() {
    init_tracing_for_tests();
    let mut backend = ScriptedBackend::new(Script::unpatched());
    let mut db = backend.open(&target()).expect("open");
    let mut session = db.connect().expect("connect");
    let mut stmt = session.new_statement().expect("statement");

    let err = stmt.bind(untyped_row().into_record_batch()).unwrap_err();
    let driver = err.driver_error().expect("driver error");
    assert_eq!(driver.message, "Can't map Arrow type 'na' to Postgres type");

    let binds: Vec<Event> = backend
        .journal()
        .events()
        .into_iter()
        .filter(|event| matches!(event, Event::Bind(_)))
        .collect();
    assert_eq!(binds, vec![Event::Bind(vec![DataType::Utf8, DataType::Null])]);
}

#[test]
fn patched_backend_stores_null_rows() {
    let mut backend = ScriptedBackend::new(Script::patched());
    {
        let mut db = backend.open(&target()).expect("open");
        let mut session = db.connect().expect("connect");

        let mut create = session.new_statement().expect("statement");
        create
            .set_sql_query("CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT, email TEXT)")
            .expect("sql");
        create.execute_update().expect("create");

        let mut insert = session.new_statement().expect("statement");
        insert
            .set_sql_query("INSERT INTO t (name, email) VALUES ($1, $2)")
            .expect("sql");
        insert.bind(untyped_row().into_record_batch()).expect("bind");
        assert_eq!(insert.execute_update().expect("insert"), Some(1));

        let mut select = session.new_statement().expect("statement");
        select.set_sql_query("SELECT * FROM t").expect("sql");
        let batches = select.execute_query().expect("select");
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    }

    assert_eq!(backend.rows(), vec![(1, Some("Bob".to_string()), None)]);
    let journal = backend.journal();
    assert!(journal.outstanding().is_empty());
    assert_eq!(journal.opened(HandleKind::Statement), 3);
    assert_eq!(journal.released(HandleKind::Database), 1);
}

#[test]
fn unreachable_store_fails_open_without_handles() {
    let mut backend = ScriptedBackend::new(Script::unreachable());
    let err = match backend.open(&target()) {
        Ok(_) => panic!("open should fail"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("Connection refused"));
    assert!(backend.journal().events().is_empty());
}

#[test]
fn injected_failure_hits_only_the_requested_occurrence() {
    let script = Script::patched().fail_execute(ExecuteFailure::new("CREATE", 2, "disk full"));
    let mut backend = ScriptedBackend::new(script);
    let mut db = backend.open(&target()).expect("open");
    let mut session = db.connect().expect("connect");

    let run = |session: &mut nullbind_test_utils::ScriptedSession, sql: &str| {
        let mut stmt = session.new_statement().expect("statement");
        stmt.set_sql_query(sql).expect("sql");
        stmt.execute_update()
    };

    run(&mut session, "CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT, email TEXT)")
        .expect("first create");
    run(&mut session, "DROP TABLE t").expect("drop");
    let err = run(&mut session, "CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT, email TEXT)")
        .unwrap_err();
    assert_eq!(err.to_string(), "disk full");
}

#[test]
fn failed_connect_still_releases_the_database() {
    let mut backend = ScriptedBackend::new(Script::connect_fails());
    {
        let mut db = backend.open(&target()).expect("open");
        let err = match db.connect() {
            Ok(_) => panic!("connect should fail"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("password authentication failed"));
    }

    let journal = backend.journal();
    assert_eq!(
        journal.events(),
        vec![
            Event::Open(HandleKind::Database),
            Event::Release(HandleKind::Database)
        ]
    );
    assert_eq!(journal.opened(HandleKind::Session), 0);
}

#[test]
fn injected_failure_carries_sqlstate() {
    let script = Script::patched().fail_execute(
        ExecuteFailure::new("CREATE", 1, "permission denied for schema public")
            .with_sqlstate("42501"),
    );
    let mut backend = ScriptedBackend::new(script);
    let mut db = backend.open(&target()).expect("open");
    let mut session = db.connect().expect("connect");
    let mut stmt = session.new_statement().expect("statement");
    stmt.set_sql_query("CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT, email TEXT)")
        .expect("sql");

    let err = stmt.execute_update().unwrap_err();
    let driver = err.driver_error().expect("driver error");
    assert_eq!(driver.sqlstate.as_deref(), Some("42501"));
}
