use arrow_array::RecordBatch;
use nullbind_result::Result;

/// Where to connect: the driver to load and the store it should talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Driver identifier, e.g. `adbc_driver_postgresql`.
    pub driver: String,
    pub uri: String,
}

impl ConnectTarget {
    pub fn new(driver: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            uri: uri.into(),
        }
    }
}

/// Opens database handles. Implemented once per client library.
pub trait Backend {
    type Database: Database;

    /// Load the driver, apply the URI and initialize a database handle.
    fn open(&mut self, target: &ConnectTarget) -> Result<Self::Database>;
}

/// An initialized database handle. Released on drop.
pub trait Database {
    type Session: Session;

    /// Open a logical connection on this database.
    fn connect(&mut self) -> Result<Self::Session>;
}

/// A connection. Released on drop, before the database it came from.
pub trait Session {
    type Statement: ParamStatement;

    fn new_statement(&mut self) -> Result<Self::Statement>;
}

/// A statement that can carry bound parameters. Released on drop.
pub trait ParamStatement {
    fn set_sql_query(&mut self, sql: &str) -> Result<()>;

    /// Bind one parameter set per row of `params`.
    fn bind(&mut self, params: RecordBatch) -> Result<()>;

    /// Execute without a result set; returns the affected row count when the
    /// driver reports one.
    fn execute_update(&mut self) -> Result<Option<i64>>;

    /// Execute and collect the whole result set.
    fn execute_query(&mut self) -> Result<Vec<RecordBatch>>;
}
