//! [`Backend`] over the ADBC driver manager.
//!
//! The driver is loaded by name from the platform library search path
//! (`adbc_driver_postgresql` resolves to `libadbc_driver_postgresql.so` on
//! Linux). Handle release is left to the driver manager's `Drop`
//! implementations.

use adbc_core::options::{AdbcVersion, OptionDatabase, OptionValue};
use adbc_core::{Connection as _, Database as _, Driver as _, Statement as _};
use adbc_driver_manager::{ManagedConnection, ManagedDatabase, ManagedDriver, ManagedStatement};
use arrow_array::RecordBatch;
use nullbind_result::Result;

use crate::traits::{Backend, ConnectTarget, Database, ParamStatement, Session};

const TRACE_TARGET: &str = "nullbind::adbc";

pub struct AdbcBackend {
    version: AdbcVersion,
}

impl AdbcBackend {
    pub fn new(version: AdbcVersion) -> Self {
        Self { version }
    }
}

impl Default for AdbcBackend {
    fn default() -> Self {
        Self::new(AdbcVersion::V110)
    }
}

impl Backend for AdbcBackend {
    type Database = AdbcDatabase;

    fn open(&mut self, target: &ConnectTarget) -> Result<AdbcDatabase> {
        tracing::debug!(target: TRACE_TARGET, driver = %target.driver, "loading driver");
        let mut driver = ManagedDriver::load_dynamic_from_name(&target.driver, None, self.version)?;

        tracing::debug!(target: TRACE_TARGET, "initializing database");
        let opts = [(OptionDatabase::Uri, OptionValue::String(target.uri.clone()))];
        let inner = driver.new_database_with_opts(opts)?;
        Ok(AdbcDatabase { inner })
    }
}

pub struct AdbcDatabase {
    inner: ManagedDatabase,
}

impl Database for AdbcDatabase {
    type Session = AdbcSession;

    fn connect(&mut self) -> Result<AdbcSession> {
        tracing::debug!(target: TRACE_TARGET, "initializing connection");
        let inner = self.inner.new_connection()?;
        Ok(AdbcSession { inner })
    }
}

pub struct AdbcSession {
    inner: ManagedConnection,
}

impl Session for AdbcSession {
    type Statement = AdbcStatement;

    fn new_statement(&mut self) -> Result<AdbcStatement> {
        let inner = self.inner.new_statement()?;
        Ok(AdbcStatement { inner })
    }
}

pub struct AdbcStatement {
    inner: ManagedStatement,
}

impl ParamStatement for AdbcStatement {
    fn set_sql_query(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(target: TRACE_TARGET, sql, "set sql query");
        self.inner.set_sql_query(sql)?;
        Ok(())
    }

    fn bind(&mut self, params: RecordBatch) -> Result<()> {
        tracing::debug!(
            target: TRACE_TARGET,
            columns = params.num_columns(),
            rows = params.num_rows(),
            "bind parameters"
        );
        self.inner.bind(params)?;
        Ok(())
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        let rows = self.inner.execute_update()?;
        tracing::debug!(target: TRACE_TARGET, ?rows, "execute update");
        Ok(rows)
    }

    fn execute_query(&mut self) -> Result<Vec<RecordBatch>> {
        let reader = self.inner.execute()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!(target: TRACE_TARGET, batches = batches.len(), "execute query");
        Ok(batches)
    }
}
