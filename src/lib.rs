//! command-chain: grammar-guarded fluent call chains
//!
//! Wraps a target so its methods can only be called in the sequences allowed
//! by a declarative grammar:
//! - [`CommandGrammar`]: tree of [`CommandNode`]s with a cursor and bubble-up lookup
//! - [`Dispatcher`]: validates each call against the grammar, moves the cursor,
//!   and forwards the call through the target's [`MethodRegistry`]
//! - [`GrammarSpec`]: the list/map grammar format, loadable from YAML or JSON
//!   files through [`GrammarLoader`]
//!
//! Command names prefixed with `$` end the chain and hand back the call's
//! result; names prefixed with `^` send the chain back to the root.

pub mod command;
pub mod demos;
pub mod dispatcher;
pub mod error;
pub mod grammar;
pub mod loader;
pub mod registry;
pub mod spec;
pub mod telemetry;
pub mod value;

// Re-export commonly used types
pub use command::{CommandId, CommandKind, CommandNode};
pub use dispatcher::{Dispatch, Dispatcher, DispatcherBuilder, GrammarSource};
pub use error::{
    ChainError, ChainResult, ConstructionError, LogicError, MethodError, MethodResult,
    RuntimeError, RuntimeResult,
};
pub use grammar::CommandGrammar;
pub use loader::GrammarLoader;
pub use registry::{Chainable, Invocable, Method, MethodRegistry};
pub use spec::{CommandSpec, GrammarSpec};
pub use value::{ArgList, Value};
