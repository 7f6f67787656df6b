//! Error types for tetrad
//!
//! Hard failures are returned as `Result`; soft contract violations
//! (conflicting literal tags, stale cursors, interner eviction misses)
//! are routed through the [`World`](crate::World) error sink instead of
//! unwinding, and the offending operation degrades to a no-op.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error type
#[derive(Error, Debug)]
pub enum StoreError {
    /// A literal was constructed with both a datatype and a language tag
    #[error("literal `{0}` given both a datatype and a language; keeping the language")]
    ConflictingLiteralTag(String),

    /// A literal datatype was not a URI node
    #[error("literal datatype `{0}` is not a URI node; ignoring it")]
    NonUriDatatype(String),

    /// A cursor was used after a mutation that did not go through it
    #[error("cursor used after the model was mutated")]
    StaleCursor,

    /// A cursor was used against a model other than the one that made it
    #[error("cursor does not belong to this model")]
    ForeignCursor,

    /// A node scheduled for eviction was missing from its interner
    #[error("node `{0}` missing from the interner on eviction; leaked")]
    InternerLeak(String),

    /// `get` called with other than exactly one unbound statement field
    #[error("get requires exactly one of subject, predicate, object to be unbound")]
    AmbiguousGet,

    /// A prefixed name could not be expanded by the prefix environment
    #[error("failed to expand prefixed name `{0}`")]
    CurieExpansion(String),

    /// A reader emitted a statement the data model cannot hold
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
}

impl StoreError {
    /// Create a conflicting-literal-tag error
    pub fn conflicting_literal_tag(text: impl Into<String>) -> Self {
        StoreError::ConflictingLiteralTag(text.into())
    }

    /// Create a non-URI-datatype error
    pub fn non_uri_datatype(datatype: impl Into<String>) -> Self {
        StoreError::NonUriDatatype(datatype.into())
    }

    /// Create an interner-leak error
    pub fn interner_leak(node: impl Into<String>) -> Self {
        StoreError::InternerLeak(node.into())
    }

    /// Create a CURIE-expansion error
    pub fn curie_expansion(curie: impl Into<String>) -> Self {
        StoreError::CurieExpansion(curie.into())
    }

    /// Create an invalid-statement error
    pub fn invalid_statement(msg: impl Into<String>) -> Self {
        StoreError::InvalidStatement(msg.into())
    }
}
