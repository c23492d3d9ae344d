use crate::error::Error;

/// Result type alias used throughout nullbind.
pub type Result<T> = std::result::Result<T, Error>;
