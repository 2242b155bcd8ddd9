//! Error taxonomy shared by the store, the fund directory and the request boundary.

pub type Result<T> = std::result::Result<T, FinanceError>;

#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    /// Malformed or contradictory input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// Unknown symbol, unresolvable quote or missing record.
    #[error("{0}")]
    Lookup(String),

    /// The record belongs to another user. Nothing was mutated.
    #[error("{0}")]
    Permission(String),

    #[error("Storage failure: {0}")]
    Store(String),
}

impl FinanceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FinanceError::Validation(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        FinanceError::Lookup(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        FinanceError::Permission(msg.into())
    }
}

impl From<anyhow::Error> for FinanceError {
    fn from(e: anyhow::Error) -> Self {
        FinanceError::Store(format!("{e:#}"))
    }
}
