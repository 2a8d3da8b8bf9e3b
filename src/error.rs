//! Error types for document parsing, mutation, and querying.
//!
//! The two selector dialects report misuse through two deliberately
//! unrelated payload types: [`SelectorSyntaxError`] for the path
//! dialect and [`ExpressionEvalError`] for the expression dialect.
//! Both hang directly off the [`Error`] root as siblings: they share
//! no common "query error" supertype. The asymmetry matches the
//! reference behavior this model reproduces and is intentional.

use std::path::PathBuf;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all document operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed markup or an unusable encoding label
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed path selector (bad syntax, unresolvable prefix)
    #[error(transparent)]
    Selector(#[from] SelectorSyntaxError),

    /// Expression query failed to compile or evaluate
    #[error(transparent)]
    Eval(#[from] ExpressionEvalError),

    /// Structural misuse of the element tree
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// File access failed
    #[error("io error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed markup encountered while parsing a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the decoded input where the problem was found
    pub offset: usize,
}

impl ParseError {
    pub fn new<S: Into<String>>(message: S, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

/// Bad path-selector syntax, reported before any tree traversal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed selector {selector:?}: {message}")]
pub struct SelectorSyntaxError {
    pub selector: String,
    pub message: String,
}

impl SelectorSyntaxError {
    pub fn new<S: Into<String>, M: Into<String>>(selector: S, message: M) -> Self {
        SelectorSyntaxError {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

/// Expression-query compilation or evaluation failure, including
/// unsupported dialect features
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expression error: {message}")]
pub struct ExpressionEvalError {
    pub message: String,
}

impl ExpressionEvalError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        ExpressionEvalError {
            message: message.into(),
        }
    }
}

/// Structural misuse of the element tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The node handle does not belong to this document
    #[error("node id is not part of this document")]
    InvalidNode,

    /// Positional insert past the end of the child list
    #[error("child index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Attaching an element under its own subtree
    #[error("element cannot be moved into its own subtree")]
    WouldCycle,

    /// Document-level operation on a document with no root
    #[error("document has no root element")]
    NoRoot,

    /// Nominating an attached element as a document root
    #[error("element already has a parent")]
    AlreadyAttached,

    /// The named child is not a child of the given parent
    #[error("element is not a child of the given parent")]
    NotAChild,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_and_eval_are_distinct() {
        // The two selector error kinds convert into different Error
        // variants and stay unrelated types.
        let s: Error = SelectorSyntaxError::new("x:foo", "undefined prefix").into();
        let e: Error = ExpressionEvalError::new("undefined prefix").into();
        assert!(matches!(s, Error::Selector(_)));
        assert!(matches!(e, Error::Eval(_)));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("mismatched tag", 17);
        assert_eq!(err.to_string(), "parse error at byte 17: mismatched tag");
    }
}
