/// Errors produced while building or executing a query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query string contained a fragment that cannot form a valid
    /// filter document
    #[error("Malformed query parameter: {0}")]
    Parse(String),

    /// A sort, projection, or filter key is not in the resource's
    /// allow-list
    #[error("Unknown {kind} field: {field}")]
    UnknownField { field: String, kind: &'static str },

    /// Driver-level failure, propagated unmodified
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}
