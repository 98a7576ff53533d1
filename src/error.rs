//! Error handling for command chains
//!
//! Errors are split by the phase in which they surface:
//! - [`ConstructionError`]: a grammar specification or dispatcher could not be assembled
//! - [`LogicError`]: a grammar tried to extend a terminal command
//! - [`RuntimeError`]: a call on a dispatcher was rejected or failed
//!
//! [`ChainError`] wraps all three for callers that build and drive a chain in one place.

use thiserror::Error;

/// Main error type for the command chain system
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Logic error: {0}")]
    Logic(#[from] LogicError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Malformed grammar specification, or a dispatcher missing one of its parts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("Grammar specification must be a list or a map, found {found}")]
    NotATree { found: String },

    #[error("Invalid entry under '{parent}': {reason}")]
    InvalidEntry { parent: String, reason: String },

    #[error("Invalid command name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Command '{name}' declared more than once under '{parent}'")]
    DuplicateCommand { name: String, parent: String },

    #[error("Could not parse grammar specification: {message}")]
    Parse { message: String },

    #[error("No target object supplied to the dispatcher")]
    MissingTarget,

    #[error("No method registry supplied to the dispatcher")]
    MissingRegistry,

    #[error("Could not set a chain of command")]
    MissingGrammar,
}

/// Attempt to extend a command that ends or resets the chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("Cannot add child command '{child}' as parent '{parent}' is set to end the chain")]
    ExtendEndChain { parent: String, child: String },

    #[error("Cannot add child command '{child}' as parent '{parent}' is set to return to base")]
    ExtendReturnToBase { parent: String, child: String },
}

/// Rejected or failed calls on a dispatcher
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("No target bound to the chain")]
    NoTarget,

    #[error("No chain of command bound to the chain")]
    NoGrammar,

    #[error("{method}() is not available on the chain (available: {})", .available.join(", "))]
    Unreachable {
        method: String,
        available: Vec<String>,
    },

    #[error("No method {method}() exists on the target")]
    NotImplemented { method: String },

    #[error("{method}() failed: {source}")]
    Invocation {
        method: String,
        #[source]
        source: MethodError,
    },

    #[error("Cannot call {method}(): the chain has already ended")]
    ChainEnded { method: String },

    #[error("The chain is still open: the last call did not end it")]
    ChainOpen,
}

/// Failure reported by a registered method on the target
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MethodError {
    #[error("Missing argument at position {position}")]
    MissingArgument { position: usize },

    #[error("Argument {position}: expected {expected}, found {found}")]
    TypeMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{0}")]
    Failed(String),
}

impl MethodError {
    pub fn failed(message: impl Into<String>) -> Self {
        MethodError::Failed(message.into())
    }
}

impl RuntimeError {
    /// Name of the method the failing call targeted, if the error is tied to one
    pub fn method(&self) -> Option<&str> {
        match self {
            RuntimeError::Unreachable { method, .. }
            | RuntimeError::NotImplemented { method }
            | RuntimeError::Invocation { method, .. }
            | RuntimeError::ChainEnded { method } => Some(method),
            RuntimeError::NoTarget | RuntimeError::NoGrammar | RuntimeError::ChainOpen => None,
        }
    }
}

/// Result type aliases for convenience
pub type ChainResult<T> = Result<T, ChainError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
pub type MethodResult<T> = Result<T, MethodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let logic = LogicError::ExtendEndChain {
            parent: "eq".to_string(),
            child: "add".to_string(),
        };

        let chain_err: ChainError = logic.into();
        assert!(matches!(chain_err, ChainError::Logic(_)));
    }

    #[test]
    fn test_unreachable_message_lists_available() {
        let err = RuntimeError::Unreachable {
            method: "into".to_string(),
            available: vec!["from".to_string(), "where".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "into() is not available on the chain (available: from, where)"
        );
        assert_eq!(err.method(), Some("into"));
    }

    #[test]
    fn test_invocation_error_exposes_source() {
        use std::error::Error as _;

        let err = RuntimeError::Invocation {
            method: "div".to_string(),
            source: MethodError::failed("division by zero"),
        };

        assert_eq!(err.to_string(), "div() failed: division by zero");
        assert!(err.source().is_some());
        assert_eq!(RuntimeError::NoTarget.method(), None);
    }
}
