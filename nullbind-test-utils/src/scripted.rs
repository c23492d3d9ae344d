//! In-memory [`Backend`] that behaves like an ADBC Postgres driver for the
//! handful of statements the reproduction issues.
//!
//! Every handle open, release and driver call is appended to a shared
//! [`Journal`], so tests can assert on call order and on each handle being
//! released exactly once.

use std::sync::{Arc, Mutex, MutexGuard};

use arrow_array::{Array, ArrayRef, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use nullbind_params::{postgres_type_for, unmappable_type_message};
use nullbind_result::{DriverError, DriverStatus, Error, Result};
use nullbind_session::{Backend, ConnectTarget, Database, ParamStatement, Session};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Database,
    Session,
    Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open(HandleKind),
    Release(HandleKind),
    SetSql(String),
    Bind(Vec<DataType>),
    Execute(String),
}

/// Shared, append-only log of everything the scripted backend did.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    fn record(&self, event: Event) {
        lock(&self.events).push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub fn opened(&self, kind: HandleKind) -> usize {
        self.count(|event| *event == Event::Open(kind))
    }

    pub fn released(&self, kind: HandleKind) -> usize {
        self.count(|event| *event == Event::Release(kind))
    }

    /// Handles opened but not yet released, per kind.
    pub fn outstanding(&self) -> FxHashMap<HandleKind, i64> {
        let mut open: FxHashMap<HandleKind, i64> = FxHashMap::default();
        for event in lock(&self.events).iter() {
            match event {
                Event::Open(kind) => *open.entry(*kind).or_default() += 1,
                Event::Release(kind) => *open.entry(*kind).or_default() -= 1,
                _ => {}
            }
        }
        open.retain(|_, count| *count != 0);
        open
    }

    /// SQL text of every statement that was set, in order.
    pub fn sql(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Event::SetSql(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// SQL text of every statement that was executed, in order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Event::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        lock(&self.events).iter().filter(|event| pred(event)).count()
    }
}

/// Make the `occurrence`-th execution (1-based) of SQL containing
/// `sql_contains` fail with the given status and message.
#[derive(Debug, Clone)]
pub struct ExecuteFailure {
    pub sql_contains: String,
    pub occurrence: usize,
    pub status: DriverStatus,
    pub message: String,
    pub sqlstate: Option<String>,
}

impl ExecuteFailure {
    pub fn new(sql_contains: impl Into<String>, occurrence: usize, message: impl Into<String>) -> Self {
        Self {
            sql_contains: sql_contains.into(),
            occurrence,
            status: DriverStatus::IO,
            message: message.into(),
            sqlstate: None,
        }
    }

    /// Report the failure with a server SQLSTATE, as libpq errors carry.
    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    fn to_error(&self) -> Error {
        let err = DriverError::new(self.status, self.message.clone());
        match &self.sqlstate {
            Some(sqlstate) => Error::Driver(err.with_sqlstate(sqlstate.clone())),
            None => Error::Driver(err),
        }
    }
}

/// How the scripted driver behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Fail `open` as if the store refused the connection.
    pub unreachable: bool,
    /// Open the database, then fail connection init (bad credentials).
    pub connect_fails: bool,
    /// Map the no-type marker to a Postgres type instead of rejecting it,
    /// like a driver with the NULL-binding defect fixed.
    pub maps_untyped: bool,
    pub execute_failures: Vec<ExecuteFailure>,
}

impl Script {
    pub fn unpatched() -> Self {
        Self::default()
    }

    pub fn patched() -> Self {
        Self {
            maps_untyped: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn connect_fails() -> Self {
        Self {
            connect_fails: true,
            ..Self::default()
        }
    }

    pub fn fail_execute(mut self, failure: ExecuteFailure) -> Self {
        self.execute_failures.push(failure);
        self
    }
}

pub type Row = (i32, Option<String>, Option<String>);

#[derive(Debug, Default)]
struct Store {
    table: Option<Vec<Row>>,
    next_id: i32,
    executions: FxHashMap<usize, usize>,
}

#[derive(Clone)]
struct Shared {
    script: Arc<Script>,
    journal: Journal,
    store: Arc<Mutex<Store>>,
}

pub struct ScriptedBackend {
    shared: Shared,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            shared: Shared {
                script: Arc::new(script),
                journal: Journal::default(),
                store: Arc::new(Mutex::new(Store::default())),
            },
        }
    }

    pub fn journal(&self) -> Journal {
        self.shared.journal.clone()
    }

    /// Rows currently stored, as `(id, name, email)`.
    pub fn rows(&self) -> Vec<Row> {
        lock(&self.shared.store).table.clone().unwrap_or_default()
    }
}

impl Backend for ScriptedBackend {
    type Database = ScriptedDatabase;

    fn open(&mut self, target: &ConnectTarget) -> Result<ScriptedDatabase> {
        if self.shared.script.unreachable {
            return Err(Error::driver(
                DriverStatus::IO,
                format!(
                    "[libpq] Failed to connect: could not connect to server at {}: Connection refused",
                    target.uri
                ),
            ));
        }
        Ok(ScriptedDatabase::new(self.shared.clone()))
    }
}

pub struct ScriptedDatabase {
    shared: Shared,
}

impl ScriptedDatabase {
    fn new(shared: Shared) -> Self {
        shared.journal.record(Event::Open(HandleKind::Database));
        Self { shared }
    }
}

impl Drop for ScriptedDatabase {
    fn drop(&mut self) {
        self.shared.journal.record(Event::Release(HandleKind::Database));
    }
}

impl Database for ScriptedDatabase {
    type Session = ScriptedSession;

    fn connect(&mut self) -> Result<ScriptedSession> {
        if self.shared.script.connect_fails {
            return Err(Error::driver(
                DriverStatus::Unauthenticated,
                "[libpq] Failed to connect: FATAL:  password authentication failed for user \"user\"",
            ));
        }
        self.shared.journal.record(Event::Open(HandleKind::Session));
        Ok(ScriptedSession {
            shared: self.shared.clone(),
        })
    }
}

pub struct ScriptedSession {
    shared: Shared,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.shared.journal.record(Event::Release(HandleKind::Session));
    }
}

impl Session for ScriptedSession {
    type Statement = ScriptedStatement;

    fn new_statement(&mut self) -> Result<ScriptedStatement> {
        self.shared.journal.record(Event::Open(HandleKind::Statement));
        Ok(ScriptedStatement {
            shared: self.shared.clone(),
            sql: None,
            params: None,
        })
    }
}

pub struct ScriptedStatement {
    shared: Shared,
    sql: Option<String>,
    params: Option<RecordBatch>,
}

impl Drop for ScriptedStatement {
    fn drop(&mut self) {
        self.shared.journal.record(Event::Release(HandleKind::Statement));
    }
}

impl ScriptedStatement {
    fn sql(&self) -> Result<String> {
        self.sql.clone().ok_or_else(|| {
            Error::driver(DriverStatus::InvalidState, "statement has no SQL query set")
        })
    }

    fn injected_failure(&self, sql: &str) -> Option<Error> {
        let mut store = lock(&self.shared.store);
        for (idx, failure) in self.shared.script.execute_failures.iter().enumerate() {
            if !sql.contains(&failure.sql_contains) {
                continue;
            }
            let seen = store.executions.entry(idx).or_default();
            *seen += 1;
            if *seen == failure.occurrence {
                return Some(failure.to_error());
            }
        }
        None
    }

    fn insert(&self, store: &mut Store) -> Result<Option<i64>> {
        let params = self.params.as_ref().ok_or_else(|| {
            Error::driver(DriverStatus::InvalidState, "INSERT requires bound parameters")
        })?;
        if params.num_columns() != 2 {
            return Err(Error::driver(
                DriverStatus::InvalidArguments,
                format!("expected 2 parameters, got {}", params.num_columns()),
            ));
        }
        let names = text_column(params.column(0))?;
        let emails = text_column(params.column(1))?;
        let next_id = &mut store.next_id;
        let table = store.table.as_mut().ok_or_else(|| {
            Error::driver(DriverStatus::NotFound, "relation does not exist")
        })?;
        for (name, email) in names.into_iter().zip(emails) {
            *next_id += 1;
            table.push((*next_id, name, email));
        }
        Ok(Some(params.num_rows() as i64))
    }
}

impl ParamStatement for ScriptedStatement {
    fn set_sql_query(&mut self, sql: &str) -> Result<()> {
        self.shared.journal.record(Event::SetSql(sql.to_string()));
        self.sql = Some(sql.to_string());
        Ok(())
    }

    fn bind(&mut self, params: RecordBatch) -> Result<()> {
        let types: Vec<DataType> = params
            .schema()
            .fields()
            .iter()
            .map(|field| field.data_type().clone())
            .collect();
        self.shared.journal.record(Event::Bind(types.clone()));

        for data_type in &types {
            let mapped = postgres_type_for(data_type).is_some()
                || (self.shared.script.maps_untyped && *data_type == DataType::Null);
            if !mapped {
                return Err(Error::driver(
                    DriverStatus::InvalidArguments,
                    unmappable_type_message(data_type),
                ));
            }
        }
        self.params = Some(params);
        Ok(())
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        let sql = self.sql()?;
        self.shared.journal.record(Event::Execute(sql.clone()));
        if let Some(err) = self.injected_failure(&sql) {
            return Err(err);
        }

        let mut store = lock(&self.shared.store);
        let upper = sql.trim_start().to_ascii_uppercase();
        if upper.starts_with("DROP TABLE IF EXISTS") {
            store.table = None;
            Ok(None)
        } else if upper.starts_with("DROP TABLE") {
            match store.table.take() {
                Some(_) => Ok(None),
                None => Err(Error::driver(DriverStatus::NotFound, "table does not exist")),
            }
        } else if upper.starts_with("CREATE TABLE") {
            if store.table.is_some() {
                return Err(Error::driver(
                    DriverStatus::AlreadyExists,
                    "relation already exists",
                ));
            }
            store.table = Some(Vec::new());
            store.next_id = 0;
            Ok(None)
        } else if upper.starts_with("INSERT") {
            self.insert(&mut store)
        } else {
            Err(Error::driver(
                DriverStatus::NotImplemented,
                format!("scripted backend cannot execute '{sql}'"),
            ))
        }
    }

    fn execute_query(&mut self) -> Result<Vec<RecordBatch>> {
        let sql = self.sql()?;
        self.shared.journal.record(Event::Execute(sql.clone()));
        if let Some(err) = self.injected_failure(&sql) {
            return Err(err);
        }
        if !sql.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            return Err(Error::driver(
                DriverStatus::NotImplemented,
                format!("scripted backend cannot query '{sql}'"),
            ));
        }

        let store = lock(&self.shared.store);
        let rows = store.table.as_ref().ok_or_else(|| {
            Error::driver(DriverStatus::NotFound, "relation does not exist")
        })?;
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("email", DataType::Utf8, true),
        ]));
        let ids = Int32Array::from_iter_values(rows.iter().map(|row| row.0));
        let names: StringArray = rows.iter().map(|row| row.1.as_deref()).collect();
        let emails: StringArray = rows.iter().map(|row| row.2.as_deref()).collect();
        let columns: Vec<ArrayRef> = vec![Arc::new(ids), Arc::new(names), Arc::new(emails)];
        Ok(vec![RecordBatch::try_new(schema, columns)?])
    }
}

fn text_column(column: &ArrayRef) -> Result<Vec<Option<String>>> {
    match column.data_type() {
        DataType::Null => Ok(vec![None; column.len()]),
        DataType::Utf8 => {
            let strings = column
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::Internal("utf8 column is not a StringArray".into()))?;
            Ok(strings.iter().map(|value| value.map(str::to_string)).collect())
        }
        other => Err(Error::driver(
            DriverStatus::InvalidArguments,
            format!("scripted backend cannot store {other:?} parameters"),
        )),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A test that panicked mid-record still leaves a usable journal.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
