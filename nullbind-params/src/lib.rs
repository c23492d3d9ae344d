//! Arrow parameter batches for parameterized statements.
//!
//! [`ParamBatchBuilder`] assembles the schema + batch pair an ADBC statement
//! binds. Columns are declared either as UTF-8 text or as the Arrow no-type
//! marker, which is what separates "a text column that happens to be NULL"
//! from "a column whose type is not known yet".
//!
//! [`type_map`] describes how an ADBC Postgres driver maps Arrow parameter
//! types onto Postgres column types, which the reproduction uses to explain
//! its results.

pub mod batch;
pub mod placeholders;
pub mod type_map;

pub use batch::{ParamBatch, ParamBatchBuilder, ParamType};
pub use placeholders::count_placeholders;
pub use type_map::{arrow_type_label, postgres_type_for, unmappable_type_message};
