//! Demonstration targets
//!
//! Two small objects wrapped by the tests and the `chain-demo` binary: a flat
//! calculator grammar and a nested SQL builder grammar.

use crate::dispatcher::Dispatcher;
use crate::error::{ChainResult, MethodError, MethodResult};
use crate::registry::{Chainable, Invocable, MethodRegistry};
use crate::spec::{CommandSpec, GrammarSpec};
use crate::value::{ArgList, Value};

// ============================================================================
// Calculator
// ============================================================================

/// Running f64 accumulator
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    answer: f64,
}

impl Calculator {
    pub fn new(starting_value: f64) -> Self {
        Self {
            answer: starting_value,
        }
    }

    pub fn answer(&self) -> f64 {
        self.answer
    }

    pub fn add(&mut self, value: f64) -> f64 {
        self.answer += value;
        self.answer
    }

    pub fn sub(&mut self, value: f64) -> f64 {
        self.answer -= value;
        self.answer
    }

    pub fn mul(&mut self, value: f64) -> f64 {
        self.answer *= value;
        self.answer
    }

    pub fn div(&mut self, value: f64) -> MethodResult<f64> {
        if value == 0.0 {
            return Err(MethodError::failed("division by zero"));
        }
        self.answer /= value;
        Ok(self.answer)
    }

    pub fn clear(&mut self) {
        self.answer = 0.0;
    }

    pub fn eq(&self) -> f64 {
        self.answer
    }

    /// `{add, sub, mul, div, ^clear, $eq}`
    pub fn grammar() -> GrammarSpec {
        ["add", "sub", "mul", "div", "^clear", "$eq"]
            .into_iter()
            .collect()
    }
}

fn calculator_methods<T: 'static>(calc: fn(&mut T) -> &mut Calculator) -> MethodRegistry<T> {
    MethodRegistry::new()
        .with("add", move |t: &mut T, args: &[Value]| {
            Ok(calc(t).add(args.require_f64(0)?).into())
        })
        .with("sub", move |t: &mut T, args: &[Value]| {
            Ok(calc(t).sub(args.require_f64(0)?).into())
        })
        .with("mul", move |t: &mut T, args: &[Value]| {
            Ok(calc(t).mul(args.require_f64(0)?).into())
        })
        .with("div", move |t: &mut T, args: &[Value]| {
            Ok(calc(t).div(args.require_f64(0)?)?.into())
        })
        .with("clear", move |t: &mut T, _: &[Value]| {
            calc(t).clear();
            Ok(Value::Null)
        })
        .with("eq", move |t: &mut T, _: &[Value]| Ok(calc(t).eq().into()))
}

impl Invocable for Calculator {
    fn method_registry() -> MethodRegistry<Self> {
        calculator_methods(|calc| calc)
    }
}

/// Calculator that carries its own grammar
#[derive(Debug, Clone, Default)]
pub struct ChainableCalculator(pub Calculator);

impl Invocable for ChainableCalculator {
    fn method_registry() -> MethodRegistry<Self> {
        calculator_methods(|chainable| &mut chainable.0)
    }
}

impl Chainable for ChainableCalculator {
    fn chain_of_command(&self) -> GrammarSpec {
        Calculator::grammar()
    }
}

// ============================================================================
// SQL builder
// ============================================================================

/// Assembles SQL text clause by clause; `query()` returns the statement
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    clauses: Vec<String>,
    pending_insert: Option<Vec<(String, Value)>>,
    history: Vec<String>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh chain over this builder
    pub fn builder(self) -> ChainResult<Dispatcher<SqlBuilder>> {
        Dispatcher::chainable(self)
    }

    /// Statements produced so far, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn select(&mut self, fields: &Value) -> MethodResult<()> {
        let fields = match fields {
            Value::List(items) => items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Str(s) => s.clone(),
            other => {
                return Err(MethodError::TypeMismatch {
                    position: 0,
                    expected: "string or list".to_string(),
                    found: other.type_name().to_string(),
                })
            }
        };
        self.clauses.push(format!("SELECT {}", fields));
        Ok(())
    }

    pub fn update(&mut self, table: &str) {
        self.clauses.push(format!("UPDATE {}", table));
    }

    pub fn insert(&mut self, field_values: &[(String, Value)]) {
        self.pending_insert = Some(field_values.to_vec());
    }

    pub fn delete(&mut self) {
        self.clauses.push("DELETE".to_string());
    }

    pub fn from_table(&mut self, table: &str) {
        self.clauses.push(format!("FROM {}", table));
    }

    pub fn where_clause(&mut self, clause: &str) {
        self.clauses.push(format!("WHERE {}", clause));
    }

    pub fn set(&mut self, field_values: &[(String, Value)]) {
        let assignments: Vec<String> = field_values
            .iter()
            .map(|(field, value)| format!("{} = {}", field, value.to_sql_literal()))
            .collect();
        self.clauses.push(format!("SET {}", assignments.join(", ")));
    }

    pub fn into_table(&mut self, table: &str) -> MethodResult<()> {
        let field_values = self
            .pending_insert
            .take()
            .ok_or_else(|| MethodError::failed("into() needs field values from insert()"))?;

        let fields: Vec<&str> = field_values.iter().map(|(f, _)| f.as_str()).collect();
        let values: Vec<String> = field_values
            .iter()
            .map(|(_, v)| v.to_sql_literal())
            .collect();

        self.clauses.push(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            fields.join(", "),
            values.join(", ")
        ));
        Ok(())
    }

    /// Finish the statement and start over
    pub fn query(&mut self) -> String {
        let statement = self.clauses.join(" ");
        self.clauses.clear();
        self.pending_insert = None;
        self.history.push(statement.clone());
        statement
    }
}

impl Invocable for SqlBuilder {
    fn method_registry() -> MethodRegistry<Self> {
        MethodRegistry::new()
            .with("select", |b: &mut SqlBuilder, args: &[Value]| {
                b.select(args.require_value(0)?)?;
                Ok(Value::Null)
            })
            .with("update", |b: &mut SqlBuilder, args: &[Value]| {
                b.update(args.require_str(0)?);
                Ok(Value::Null)
            })
            .with("insert", |b: &mut SqlBuilder, args: &[Value]| {
                b.insert(args.require_map(0)?);
                Ok(Value::Null)
            })
            .with("delete", |b: &mut SqlBuilder, _: &[Value]| {
                b.delete();
                Ok(Value::Null)
            })
            .with("from", |b: &mut SqlBuilder, args: &[Value]| {
                b.from_table(args.require_str(0)?);
                Ok(Value::Null)
            })
            .with("where", |b: &mut SqlBuilder, args: &[Value]| {
                b.where_clause(args.require_str(0)?);
                Ok(Value::Null)
            })
            .with("set", |b: &mut SqlBuilder, args: &[Value]| {
                b.set(args.require_map(0)?);
                Ok(Value::Null)
            })
            .with("into", |b: &mut SqlBuilder, args: &[Value]| {
                b.into_table(args.require_str(0)?)?;
                Ok(Value::Null)
            })
            .with("query", |b: &mut SqlBuilder, _: &[Value]| Ok(b.query().into()))
    }
}

impl Chainable for SqlBuilder {
    fn chain_of_command(&self) -> GrammarSpec {
        GrammarSpec::new()
            .command(CommandSpec::branch("select", ["from", "^where"]))
            .command(CommandSpec::branch("update", ["set", "^where"]))
            .command(CommandSpec::branch("insert", ["into"]))
            .command(CommandSpec::branch("delete", ["from", "^where"]))
            .command("$query")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculator_direct_use() {
        let mut calc = Calculator::default();
        calc.add(15.0);
        calc.mul(3.0);
        calc.div(9.0).unwrap();
        assert_eq!(calc.eq(), 5.0);
        assert!(calc.div(0.0).is_err());
        assert_eq!(calc.answer(), 5.0);
    }

    #[test]
    fn test_calculator_registry_covers_grammar() {
        let registry = Calculator::method_registry();
        assert_eq!(
            registry.names(),
            vec!["add", "clear", "div", "eq", "mul", "sub"]
        );
        assert_eq!(Calculator::grammar().len(), registry.len());
    }

    #[test]
    fn test_sql_builder_direct_use() {
        let mut sql = SqlBuilder::new();
        let fields: Value = [("bar", Value::from(2)), ("name", Value::from("x"))]
            .into_iter()
            .collect();

        sql.update("foo");
        sql.set(fields.as_map().unwrap());
        sql.where_clause("bar = 1");
        assert_eq!(sql.query(), "UPDATE foo SET bar = 2, name = 'x' WHERE bar = 1");

        assert!(sql.into_table("foo").is_err());
        assert_eq!(sql.history().len(), 1);
    }
}
