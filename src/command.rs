//! Command nodes
//!
//! A command is a named node in a grammar tree. Nodes live in the arena owned
//! by [`CommandGrammar`](crate::grammar::CommandGrammar) and refer to each
//! other through [`CommandId`] indices; the parent link is only used to walk
//! upwards during lookup.
//!
//! Command names in a specification may carry a single prefix:
//!
//! - `$name` ends the chain: the call's return value is handed back instead of the chain
//! - `^name` returns to base: the cursor resets to the root and chaining continues
//!
//! Terminal commands (either prefix) can never have children.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ConstructionError, LogicError};

/// Stable index of a command inside its grammar's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a successful call through a command does to the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Ordinary command: the cursor descends into it
    #[default]
    Chain,
    /// `$` prefix: the cursor resets and the call's result is returned
    EndChain,
    /// `^` prefix: the cursor resets and the chain continues from the root
    ReturnToBase,
}

impl CommandKind {
    pub const END_CHAIN_PREFIX: char = '$';
    pub const RETURN_TO_BASE_PREFIX: char = '^';

    /// Split a raw specification name into its kind and bare name.
    ///
    /// ```
    /// use command_chain::CommandKind;
    ///
    /// assert_eq!(CommandKind::parse_name("$eq"), (CommandKind::EndChain, "eq"));
    /// assert_eq!(CommandKind::parse_name("^clear"), (CommandKind::ReturnToBase, "clear"));
    /// assert_eq!(CommandKind::parse_name("add"), (CommandKind::Chain, "add"));
    /// ```
    pub fn parse_name(raw: &str) -> (CommandKind, &str) {
        if let Some(name) = raw.strip_prefix(Self::END_CHAIN_PREFIX) {
            (CommandKind::EndChain, name)
        } else if let Some(name) = raw.strip_prefix(Self::RETURN_TO_BASE_PREFIX) {
            (CommandKind::ReturnToBase, name)
        } else {
            (CommandKind::Chain, raw)
        }
    }

    /// Like [`parse_name`](Self::parse_name), rejecting names that are empty,
    /// contain whitespace, or carry more than one prefix
    pub fn parse_validated(raw: &str) -> Result<(CommandKind, &str), ConstructionError> {
        let (kind, name) = Self::parse_name(raw);

        let invalid = |reason: &str| ConstructionError::InvalidName {
            name: raw.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("name contains whitespace"));
        }
        if name.starts_with([Self::END_CHAIN_PREFIX, Self::RETURN_TO_BASE_PREFIX]) {
            return Err(invalid("prefixes are mutually exclusive"));
        }

        Ok((kind, name))
    }

    pub fn ends_chain(self) -> bool {
        self == CommandKind::EndChain
    }

    pub fn returns_to_base(self) -> bool {
        self == CommandKind::ReturnToBase
    }

    /// True for both kinds that reset the cursor
    pub fn is_terminal(self) -> bool {
        self != CommandKind::Chain
    }

    pub fn prefix(self) -> &'static str {
        match self {
            CommandKind::Chain => "",
            CommandKind::EndChain => "$",
            CommandKind::ReturnToBase => "^",
        }
    }
}

/// A command in the grammar tree
#[derive(Debug, Clone)]
pub struct CommandNode {
    id: CommandId,
    name: String,
    kind: CommandKind,
    children: HashMap<String, CommandId>,
    parent: Option<CommandId>,
}

impl CommandNode {
    pub(crate) fn new(
        id: CommandId,
        name: impl Into<String>,
        kind: CommandKind,
        parent: Option<CommandId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            children: HashMap::new(),
            parent,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Method name without any prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn ends_chain(&self) -> bool {
        self.kind.ends_chain()
    }

    pub fn returns_to_base(&self) -> bool {
        self.kind.returns_to_base()
    }

    /// Name as written in a specification, prefix included
    pub fn spec_name(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.name)
    }

    pub fn child(&self, name: &str) -> Option<CommandId> {
        self.children.get(name).copied()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, CommandId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_parent(&self, id: CommandId) -> bool {
        self.parent == Some(id)
    }

    /// Check that `child` may be attached under this node
    pub(crate) fn check_extendable(&self, child: &str) -> Result<(), LogicError> {
        match self.kind {
            CommandKind::Chain => Ok(()),
            CommandKind::EndChain => Err(LogicError::ExtendEndChain {
                parent: self.name.clone(),
                child: child.to_string(),
            }),
            CommandKind::ReturnToBase => Err(LogicError::ExtendReturnToBase {
                parent: self.name.clone(),
                child: child.to_string(),
            }),
        }
    }

    pub(crate) fn attach(&mut self, name: impl Into<String>, child: CommandId) {
        self.children.insert(name.into(), child);
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.name)
    }
}
