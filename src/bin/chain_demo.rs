//! Chain Demo CLI
//!
//! Drives the bundled demonstration targets through their grammars, one step
//! per argument. A step is a method name, optionally followed by `:` and a
//! comma-separated argument list. Arguments that all look like `key=value`
//! (no spaces) are passed as a single map.
//!
//! Usage:
//!   cargo run --features cli --bin chain-demo -- calc clear add:100 div:5 sub:10 mul:3 eq
//!   cargo run --features cli --bin chain-demo -- sql 'select:*' from:foo 'where:bar = 1' query
//!   cargo run --features cli --bin chain-demo -- sql insert:bar=3 into:foo query
//!   cargo run --features cli --bin chain-demo -- grammar sql

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use command_chain::demos::{Calculator, SqlBuilder};
use command_chain::telemetry::init_tracing;
use command_chain::{CommandSpec, Dispatch, Dispatcher, GrammarLoader, GrammarSpec, Value};

/// Run method chains against the demo targets
#[derive(Parser, Debug)]
#[command(name = "chain-demo")]
#[command(about = "Call demo targets through a command grammar")]
struct Args {
    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "warn", env = "CHAIN_LOG_LEVEL")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chain calls on a calculator
    Calc {
        /// Starting value of the accumulator
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Grammar file to use instead of the built-in calculator grammar
        #[arg(long)]
        grammar: Option<PathBuf>,

        /// Steps, e.g. `add:100` or `eq`
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Chain calls on an SQL builder
    Sql {
        /// Steps, e.g. `select:*` or `from:foo`
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Print a grammar, by name from the grammar directory or by file path
    Grammar { name: String },
}

/// One parsed call
#[derive(Debug, Clone, PartialEq)]
struct Step {
    method: String,
    args: Vec<Value>,
}

fn parse_step(raw: &str) -> Step {
    let Some((method, rest)) = raw.split_once(':') else {
        return Step {
            method: raw.to_string(),
            args: Vec::new(),
        };
    };

    let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
    let args = if !parts.is_empty() && parts.iter().all(|p| is_assignment(p)) {
        let map: Value = parts
            .iter()
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim(), parse_scalar(v.trim())))
            .collect();
        vec![map]
    } else {
        parts.into_iter().map(parse_scalar).collect()
    };

    Step {
        method: method.to_string(),
        args,
    }
}

fn is_assignment(part: &str) -> bool {
    part.contains('=') && !part.contains(char::is_whitespace)
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(n) = raw.parse::<f64>() {
        Value::Float(n)
    } else if let Ok(b) = raw.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::Str(raw.to_string())
    }
}

/// Run every step, returning the value of the last end-chain call
fn run_steps<T>(dispatcher: &mut Dispatcher<T>, steps: &[String]) -> Result<Option<Value>> {
    let mut result = None;

    for raw in steps {
        let step = parse_step(raw);
        match dispatcher
            .invoke(&step.method, &step.args)
            .with_context(|| format!("Step '{}' failed", raw))?
        {
            Dispatch::Complete(value) => {
                println!("{:<24} => {}", raw, value);
                result = Some(value);
            }
            Dispatch::Continue(_) => println!("{:<24} -> chain", raw),
        }
    }

    Ok(result)
}

fn load_spec(name_or_path: &str) -> Result<GrammarSpec> {
    let path = Path::new(name_or_path);
    if path.is_file() {
        GrammarLoader::load_file(path)
    } else {
        GrammarLoader::from_env().load(name_or_path)
    }
}

fn print_tree(commands: &[CommandSpec], depth: usize) {
    for command in commands {
        println!("{}{}", "  ".repeat(depth), command.name);
        print_tree(&command.children, depth + 1);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level);

    match args.command {
        Command::Calc {
            start,
            grammar,
            steps,
        } => {
            let spec = match grammar {
                Some(path) => GrammarLoader::load_file(&path)?,
                None => Calculator::grammar(),
            };
            let mut chain = Dispatcher::wrap(Calculator::new(start), spec)?;
            if run_steps(&mut chain, &steps)?.is_none() {
                println!("(chain still open, available: {})", chain.available().join(", "));
            }
        }
        Command::Sql { steps } => {
            let mut chain = SqlBuilder::new().builder()?;
            run_steps(&mut chain, &steps)?;
            if let Some(builder) = chain.target() {
                for statement in builder.history() {
                    println!("{}", statement);
                }
            }
        }
        Command::Grammar { name } => {
            let spec = load_spec(&name)?;
            print_tree(&spec.commands, 0);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step() {
        assert_eq!(
            parse_step("eq"),
            Step {
                method: "eq".to_string(),
                args: vec![]
            }
        );
        assert_eq!(parse_step("add:100").args, vec![Value::Int(100)]);
        assert_eq!(parse_step("select:*").args, vec![Value::from("*")]);
        assert_eq!(parse_step("where:bar = 1").args, vec![Value::from("bar = 1")]);
        assert_eq!(
            parse_step("set:bar=2, name=x").args,
            vec![[("bar", Value::Int(2)), ("name", Value::from("x"))]
                .into_iter()
                .collect::<Value>()]
        );
    }
}
