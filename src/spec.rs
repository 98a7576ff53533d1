//! Declarative grammar specifications
//!
//! A specification is a tree of command names. The accepted shapes follow the
//! list/map form used in grammar files:
//!
//! ```yaml
//! - add
//! - sub
//! - ^clear
//! - $eq
//! - select:
//!     - from
//!     - ^where
//! ```
//!
//! or the equivalent map form (`select: [from, ^where]`, `add: ~`). Children may
//! be `null` (a leaf), a list, a map, or a single name.
//!
//! JSON and YAML both normalise through `serde_json::Value`; shape and name
//! problems are reported as [`ConstructionError`]s. Attaching children to a
//! terminal command is not a shape problem and is only rejected when the
//! specification is built into a grammar.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

use crate::command::CommandKind;
use crate::error::ConstructionError;

const ROOT_LABEL: &str = "<root>";

/// A command and its children, names still carrying their prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub children: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn branch<I, C>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CommandSpec>,
    {
        Self {
            name: name.into(),
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    pub fn child(mut self, child: impl Into<CommandSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Number of commands in this subtree, itself included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CommandSpec::count).sum::<usize>()
    }

    fn to_json_value(&self) -> JsonValue {
        if self.children.is_empty() {
            JsonValue::String(self.name.clone())
        } else {
            let mut map = Map::new();
            map.insert(self.name.clone(), children_to_json(&self.children));
            JsonValue::Object(map)
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(name: &str) -> Self {
        CommandSpec::leaf(name)
    }
}

impl From<String> for CommandSpec {
    fn from(name: String) -> Self {
        CommandSpec::leaf(name)
    }
}

/// The forest of top-level commands making up a grammar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarSpec {
    pub commands: Vec<CommandSpec>,
}

impl GrammarSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<CommandSpec>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Total number of commands at every depth
    pub fn count(&self) -> usize {
        self.commands.iter().map(CommandSpec::count).sum()
    }

    /// Normalise a JSON tree into a specification
    pub fn from_json_value(value: &JsonValue) -> Result<Self, ConstructionError> {
        let commands = match value {
            JsonValue::Array(_) | JsonValue::Object(_) => entries_from_json(value, ROOT_LABEL)?,
            other => {
                return Err(ConstructionError::NotATree {
                    found: json_type_name(other).to_string(),
                })
            }
        };

        let spec = Self { commands };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConstructionError> {
        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| ConstructionError::Parse {
                message: e.to_string(),
            })?;
        Self::from_json_value(&value)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConstructionError> {
        let value: JsonValue =
            serde_yaml::from_str(text).map_err(|e| ConstructionError::Parse {
                message: e.to_string(),
            })?;
        Self::from_json_value(&value)
    }

    /// Canonical list form: leaves as names, branches as single-key maps
    pub fn to_json_value(&self) -> JsonValue {
        children_to_json(&self.commands)
    }

    /// Check every name and reject duplicate siblings
    pub fn validate(&self) -> Result<(), ConstructionError> {
        validate_siblings(&self.commands, ROOT_LABEL)
    }
}

impl<C: Into<CommandSpec>> FromIterator<C> for GrammarSpec {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Serialize for GrammarSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GrammarSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        GrammarSpec::from_json_value(&value).map_err(serde::de::Error::custom)
    }
}

fn children_to_json(children: &[CommandSpec]) -> JsonValue {
    JsonValue::Array(children.iter().map(CommandSpec::to_json_value).collect())
}

fn entries_from_json(value: &JsonValue, parent: &str) -> Result<Vec<CommandSpec>, ConstructionError> {
    match value {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::String(name) => Ok(vec![CommandSpec::leaf(name.as_str())]),
        JsonValue::Array(items) => {
            let mut commands = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    JsonValue::String(name) => commands.push(CommandSpec::leaf(name.as_str())),
                    JsonValue::Object(map) => commands.extend(branches_from_map(map)?),
                    other => {
                        return Err(ConstructionError::InvalidEntry {
                            parent: parent.to_string(),
                            reason: format!(
                                "list items must be names or maps, found {}",
                                json_type_name(other)
                            ),
                        })
                    }
                }
            }
            Ok(commands)
        }
        JsonValue::Object(map) => branches_from_map(map),
        other => Err(ConstructionError::InvalidEntry {
            parent: parent.to_string(),
            reason: format!(
                "children must be null, a name, a list or a map, found {}",
                json_type_name(other)
            ),
        }),
    }
}

fn branches_from_map(map: &Map<String, JsonValue>) -> Result<Vec<CommandSpec>, ConstructionError> {
    map.iter()
        .map(|(name, children)| {
            Ok(CommandSpec {
                name: name.clone(),
                children: entries_from_json(children, name)?,
            })
        })
        .collect()
}

fn validate_siblings(commands: &[CommandSpec], parent: &str) -> Result<(), ConstructionError> {
    let mut seen = HashSet::new();
    for command in commands {
        let (_, name) = CommandKind::parse_validated(&command.name)?;
        if !seen.insert(name) {
            return Err(ConstructionError::DuplicateCommand {
                name: name.to_string(),
                parent: parent.to_string(),
            });
        }
        validate_siblings(&command.children, name)?;
    }
    Ok(())
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "map",
    }
}
