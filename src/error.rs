use thiserror::Error;

/// Errors surfaced by the table engine.
///
/// Missing data for a geography is never an error anywhere in this crate;
/// it resolves to zero values. Validation failures are raised before any
/// data query is issued.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid field/column '{field}' for table '{table}'. Valid columns are: {valid}")]
    InvalidField {
        field: String,
        table: String,
        valid: String,
    },

    #[error("Total column '{column}' isn't one of the columns for table '{table}'. Valid columns are: {valid}")]
    InvalidTotalColumn {
        column: String,
        table: String,
        valid: String,
    },

    #[error("A field table needs at least one field")]
    EmptyFields,

    #[error("A table with id '{0}' is already registered")]
    DuplicateTable(String),

    /// The backing store is unreachable or a query failed. Propagated
    /// unmodified; retry policy belongs to the storage collaborator.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
