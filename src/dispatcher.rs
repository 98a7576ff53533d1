//! Dispatcher
//!
//! Binds a target, its [`MethodRegistry`] and a [`CommandGrammar`]. Every call
//! goes through [`Dispatcher::invoke`], which checks in order:
//!
//! 1. a target is bound
//! 2. a grammar is bound
//! 3. the method is reachable from the grammar's cursor
//! 4. the target implements the method
//!
//! Only then is the cursor moved (reset to the root for `$`/`^` commands,
//! descended otherwise) and the method invoked. `$` commands hand back the
//! method's return value; everything else hands back the dispatcher so the
//! next call can be chained:
//!
//! ```
//! use command_chain::demos::Calculator;
//! use command_chain::Dispatcher;
//!
//! let mut chain = Dispatcher::wrap(Calculator::default(), Calculator::grammar()).unwrap();
//! let answer = chain
//!     .invoke("clear", &[]).unwrap()
//!     .call("add", &[100.into()]).unwrap()
//!     .call("div", &[5.into()]).unwrap()
//!     .call("sub", &[10.into()]).unwrap()
//!     .call("mul", &[3.into()]).unwrap()
//!     .call("eq", &[]).unwrap()
//!     .finish().unwrap();
//!
//! assert_eq!(answer.as_f64(), Some(30.0));
//! ```
//!
//! A dispatcher keeps its cursor between calls without any locking. Use one
//! dispatcher per concurrent call sequence.

use tracing::{debug, info, warn};

use crate::command::CommandKind;
use crate::error::{ChainResult, ConstructionError, RuntimeError, RuntimeResult};
use crate::grammar::CommandGrammar;
use crate::registry::{Chainable, Invocable, MethodRegistry};
use crate::spec::GrammarSpec;
use crate::value::Value;

/// Either form a grammar can be supplied in
#[derive(Debug, Clone)]
pub enum GrammarSource {
    Spec(GrammarSpec),
    Grammar(CommandGrammar),
}

impl GrammarSource {
    /// Normalise into a built grammar with its cursor at the root
    pub fn into_grammar(self) -> ChainResult<CommandGrammar> {
        match self {
            GrammarSource::Spec(spec) => CommandGrammar::from_spec(&spec),
            GrammarSource::Grammar(mut grammar) => {
                grammar.reset();
                Ok(grammar)
            }
        }
    }
}

impl From<GrammarSpec> for GrammarSource {
    fn from(spec: GrammarSpec) -> Self {
        GrammarSource::Spec(spec)
    }
}

impl From<CommandGrammar> for GrammarSource {
    fn from(grammar: CommandGrammar) -> Self {
        GrammarSource::Grammar(grammar)
    }
}

/// Result of a successful call
#[derive(Debug)]
pub enum Dispatch<'d, T> {
    /// The chain goes on; call the next method on the dispatcher
    Continue(&'d mut Dispatcher<T>),
    /// An end-chain command ran; this is its return value
    Complete(Value),
}

impl<'d, T> Dispatch<'d, T> {
    /// Chain the next call
    pub fn call(self, method: &str, args: &[Value]) -> RuntimeResult<Dispatch<'d, T>> {
        match self {
            Dispatch::Continue(dispatcher) => dispatcher.invoke(method, args),
            Dispatch::Complete(_) => Err(RuntimeError::ChainEnded {
                method: method.to_string(),
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Dispatch::Complete(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Dispatch::Complete(value) => Some(value),
            Dispatch::Continue(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Dispatch::Complete(value) => Some(value),
            Dispatch::Continue(_) => None,
        }
    }

    /// The end-of-chain value, or `ChainOpen` if the chain continues
    pub fn finish(self) -> RuntimeResult<Value> {
        self.into_value().ok_or(RuntimeError::ChainOpen)
    }

    pub fn dispatcher(self) -> Option<&'d mut Dispatcher<T>> {
        match self {
            Dispatch::Continue(dispatcher) => Some(dispatcher),
            Dispatch::Complete(_) => None,
        }
    }
}

/// Grammar-guarded wrapper around a target
#[derive(Debug)]
pub struct Dispatcher<T> {
    target: Option<T>,
    registry: MethodRegistry<T>,
    grammar: Option<CommandGrammar>,
}

impl<T> Dispatcher<T> {
    pub fn new(target: T, registry: MethodRegistry<T>, grammar: CommandGrammar) -> Self {
        info!(
            "Wrapped target with {} methods and {} commands",
            registry.len(),
            grammar.len()
        );

        Self {
            target: Some(target),
            registry,
            grammar: Some(grammar),
        }
    }

    pub fn builder() -> DispatcherBuilder<T> {
        DispatcherBuilder::default()
    }

    /// Validate `method` against the grammar, move the cursor, and call it on the target
    pub fn invoke(&mut self, method: &str, args: &[Value]) -> RuntimeResult<Dispatch<'_, T>> {
        let target = self.target.as_mut().ok_or(RuntimeError::NoTarget)?;
        let grammar = self.grammar.as_mut().ok_or(RuntimeError::NoGrammar)?;

        let (id, kind) = match grammar.find_next(method) {
            Some(node) => (node.id(), node.kind()),
            None => {
                let available = grammar.available();
                warn!(
                    "Rejected {}() from {:?}: not reachable",
                    method,
                    grammar.current().map(|node| node.name())
                );
                return Err(RuntimeError::Unreachable {
                    method: method.to_string(),
                    available,
                });
            }
        };

        let Some(func) = self.registry.get(method) else {
            warn!("Rejected {}(): not implemented on the target", method);
            return Err(RuntimeError::NotImplemented {
                method: method.to_string(),
            });
        };

        let previous = grammar.cursor();
        let next = match kind {
            CommandKind::Chain => Some(id),
            CommandKind::EndChain | CommandKind::ReturnToBase => None,
        };
        grammar.set_cursor(next);
        debug!("Dispatching {}() as {:?} with {} args", method, kind, args.len());

        let value = match func(target, args) {
            Ok(value) => value,
            Err(source) => {
                grammar.set_cursor(previous);
                warn!("{}() failed, cursor restored: {}", method, source);
                return Err(RuntimeError::Invocation {
                    method: method.to_string(),
                    source,
                });
            }
        };

        if kind.ends_chain() {
            debug!("Chain ended by {}() with {}", method, value);
            Ok(Dispatch::Complete(value))
        } else {
            Ok(Dispatch::Continue(self))
        }
    }

    /// Return the cursor to the root without calling anything
    pub fn reset(&mut self) {
        if let Some(grammar) = self.grammar.as_mut() {
            grammar.reset();
        }
    }

    /// Names callable right now
    pub fn available(&self) -> Vec<String> {
        self.grammar
            .as_ref()
            .map(CommandGrammar::available)
            .unwrap_or_default()
    }

    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut T> {
        self.target.as_mut()
    }

    /// Release the target; later calls fail with `NoTarget`
    pub fn take_target(&mut self) -> Option<T> {
        self.target.take()
    }

    /// Bind a new target, returning the previous one. The cursor is reset.
    pub fn bind_target(&mut self, target: T) -> Option<T> {
        self.reset();
        self.target.replace(target)
    }

    pub fn into_target(self) -> Option<T> {
        self.target
    }

    pub fn grammar(&self) -> Option<&CommandGrammar> {
        self.grammar.as_ref()
    }

    /// Release the grammar; later calls fail with `NoGrammar`
    pub fn take_grammar(&mut self) -> Option<CommandGrammar> {
        self.grammar.take()
    }

    pub fn bind_grammar(&mut self, source: impl Into<GrammarSource>) -> ChainResult<()> {
        self.grammar = Some(source.into().into_grammar()?);
        Ok(())
    }

    pub fn registry(&self) -> &MethodRegistry<T> {
        &self.registry
    }
}

impl<T: Invocable> Dispatcher<T> {
    /// Wrap a target using its own registry and the supplied grammar
    pub fn wrap(target: T, source: impl Into<GrammarSource>) -> ChainResult<Self> {
        let grammar = source.into().into_grammar()?;
        Ok(Self::new(target, T::method_registry(), grammar))
    }
}

impl<T: Invocable + Chainable> Dispatcher<T> {
    /// Wrap a target that declares its own grammar
    pub fn chainable(target: T) -> ChainResult<Self> {
        let spec = target.chain_of_command();
        Self::wrap(target, spec)
    }
}

/// Step-by-step assembly of a [`Dispatcher`]
#[derive(Debug)]
pub struct DispatcherBuilder<T> {
    target: Option<T>,
    registry: Option<MethodRegistry<T>>,
    grammar: Option<GrammarSource>,
}

impl<T> Default for DispatcherBuilder<T> {
    fn default() -> Self {
        Self {
            target: None,
            registry: None,
            grammar: None,
        }
    }
}

impl<T> DispatcherBuilder<T> {
    pub fn target(mut self, target: T) -> Self {
        self.target = Some(target);
        self
    }

    pub fn registry(mut self, registry: MethodRegistry<T>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn grammar(mut self, source: impl Into<GrammarSource>) -> Self {
        self.grammar = Some(source.into());
        self
    }

    pub fn build(self) -> ChainResult<Dispatcher<T>> {
        let target = self.target.ok_or(ConstructionError::MissingTarget)?;
        let registry = self.registry.ok_or(ConstructionError::MissingRegistry)?;
        let grammar = self
            .grammar
            .ok_or(ConstructionError::MissingGrammar)?
            .into_grammar()?;

        Ok(Dispatcher::new(target, registry, grammar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, MethodError};
    use crate::spec::CommandSpec;
    use crate::value::ArgList;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    fn registry() -> MethodRegistry<Recorder> {
        let mut registry = MethodRegistry::new();
        for name in ["select", "from", "where", "query", "clear"] {
            registry.register(name, move |r: &mut Recorder, _: &[Value]| {
                r.calls.push(name.to_string());
                Ok(Value::Int(r.calls.len() as i64))
            });
        }
        registry.register("check", |_: &mut Recorder, args: &[Value]| {
            args.require_f64(0).map(Value::Float)
        });
        registry
    }

    fn spec() -> GrammarSpec {
        GrammarSpec::new()
            .command(CommandSpec::branch("select", ["from", "^where", "check"]))
            .command("$query")
            .command("^clear")
            .command("missing")
    }

    fn dispatcher() -> Dispatcher<Recorder> {
        Dispatcher::builder()
            .target(Recorder::default())
            .registry(registry())
            .grammar(spec())
            .build()
            .unwrap()
    }

    fn cursor_name(d: &Dispatcher<Recorder>) -> Option<String> {
        d.grammar()
            .and_then(CommandGrammar::current)
            .map(|node| node.name().to_string())
    }

    #[test]
    fn test_descend_then_reset() {
        let mut d = dispatcher();

        d.invoke("select", &[]).unwrap();
        assert_eq!(cursor_name(&d), Some("select".to_string()));

        d.invoke("from", &[]).unwrap();
        assert_eq!(cursor_name(&d), Some("from".to_string()));

        let step = d.invoke("where", &[]).unwrap();
        assert!(!step.is_complete());
        assert_eq!(cursor_name(&d), None);

        let value = d.invoke("query", &[]).unwrap().finish().unwrap();
        assert_eq!(value, Value::Int(4));
        assert_eq!(cursor_name(&d), None);
    }

    #[test]
    fn test_checks_run_in_order() {
        let mut d = dispatcher();

        // Grammar is consulted before the registry
        assert!(matches!(
            d.invoke("unknown", &[]),
            Err(RuntimeError::Unreachable { .. })
        ));
        assert!(matches!(
            d.invoke("missing", &[]),
            Err(RuntimeError::NotImplemented { .. })
        ));

        d.take_grammar();
        assert!(matches!(d.invoke("select", &[]), Err(RuntimeError::NoGrammar)));

        d.take_target();
        assert!(matches!(d.invoke("select", &[]), Err(RuntimeError::NoTarget)));
    }

    #[test]
    fn test_rejected_calls_leave_cursor_untouched() {
        let mut d = dispatcher();
        d.invoke("select", &[]).unwrap();

        assert!(d.invoke("into", &[]).is_err());
        assert!(d.invoke("missing", &[]).is_err());
        assert_eq!(cursor_name(&d), Some("select".to_string()));
        assert!(d.target().unwrap().calls == vec!["select"]);
    }

    #[test]
    fn test_failed_method_restores_cursor() {
        let mut d = dispatcher();
        d.invoke("select", &[]).unwrap();

        let err = d.invoke("check", &[Value::from("nan")]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invocation {
                source: MethodError::TypeMismatch { .. },
                ..
            }
        ));
        assert_eq!(cursor_name(&d), Some("select".to_string()));

        d.invoke("check", &[Value::from(1)]).unwrap();
        assert_eq!(cursor_name(&d), Some("check".to_string()));
    }

    #[test]
    fn test_call_after_completion_fails() {
        let mut d = dispatcher();
        let done = d.invoke("query", &[]).unwrap();
        assert!(matches!(
            done.call("select", &[]),
            Err(RuntimeError::ChainEnded { .. })
        ));

        let open = d.invoke("select", &[]).unwrap();
        assert!(matches!(open.finish(), Err(RuntimeError::ChainOpen)));
    }

    #[test]
    fn test_builder_reports_missing_parts() {
        let missing_target = Dispatcher::<Recorder>::builder()
            .registry(registry())
            .grammar(spec())
            .build();
        assert!(matches!(
            missing_target,
            Err(ChainError::Construction(ConstructionError::MissingTarget))
        ));

        let missing_grammar = Dispatcher::builder()
            .target(Recorder::default())
            .registry(registry())
            .build();
        assert!(matches!(
            missing_grammar,
            Err(ChainError::Construction(ConstructionError::MissingGrammar))
        ));

        let bad_grammar = Dispatcher::builder()
            .target(Recorder::default())
            .registry(registry())
            .grammar(GrammarSpec::new().command(CommandSpec::branch("$query", ["from"])))
            .build();
        assert!(matches!(bad_grammar, Err(ChainError::Logic(_))));
    }

    #[test]
    fn test_rebinding_resets_position() {
        let mut d = dispatcher();
        d.invoke("select", &[]).unwrap();

        let previous = d.bind_target(Recorder::default()).unwrap();
        assert_eq!(previous.calls, vec!["select"]);
        assert_eq!(cursor_name(&d), None);

        let mut grammar = CommandGrammar::from_spec(&spec()).unwrap();
        let select = grammar.root("select").map(|node| node.id());
        grammar.set_cursor(select);
        d.bind_grammar(grammar).unwrap();
        assert_eq!(cursor_name(&d), None);
        assert_eq!(d.available(), vec!["clear", "missing", "query", "select"]);
    }
}
