//! Command grammar
//!
//! Owns the command tree and the cursor marking the chain's current position.
//! `None` as cursor means the chain sits at the root.
//!
//! Lookup bubbles up: from the cursor, each node and then each of its
//! ancestors is asked for a direct child with the requested name; the root
//! commands are tried last. Commands under a different branch at the same
//! depth are therefore only reachable by first calling a shared ancestor (or a
//! root command) again.
//!
//! A grammar is mutated by every dispatched call and carries no locking: drive
//! one grammar from one caller at a time.

use std::collections::HashMap;
use tracing::{info, trace};

use crate::command::{CommandId, CommandKind, CommandNode};
use crate::error::{ChainResult, ConstructionError};
use crate::spec::{CommandSpec, GrammarSpec};

const ROOT_LABEL: &str = "<root>";

/// Tree of commands with a cursor
#[derive(Debug, Clone, Default)]
pub struct CommandGrammar {
    /// Arena of every command, indexed by `CommandId`
    nodes: Vec<CommandNode>,
    /// Top-level commands by bare name
    roots: HashMap<String, CommandId>,
    cursor: Option<CommandId>,
}

impl CommandGrammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grammar from a declarative specification.
    ///
    /// Fails with a `LogicError` when a `$` or `^` command declares children and
    /// with a `ConstructionError` on invalid or duplicate names.
    pub fn from_spec(spec: &GrammarSpec) -> ChainResult<Self> {
        let mut grammar = Self::new();
        for command in &spec.commands {
            grammar.add_command(command)?;
        }

        info!(
            "Built command grammar with {} root commands ({} total)",
            grammar.roots.len(),
            grammar.nodes.len()
        );

        Ok(grammar)
    }

    /// Add a top-level command and its whole subtree
    pub fn add_command(&mut self, command: &CommandSpec) -> ChainResult<CommandId> {
        let id = self.add_root(&command.name)?;
        self.add_children(id, &command.children)?;
        Ok(id)
    }

    fn add_children(&mut self, parent: CommandId, children: &[CommandSpec]) -> ChainResult<()> {
        for child in children {
            let id = self.add_child(parent, &child.name)?;
            self.add_children(id, &child.children)?;
        }
        Ok(())
    }

    /// Add a top-level command from its raw (possibly prefixed) name
    pub fn add_root(&mut self, raw_name: &str) -> ChainResult<CommandId> {
        let (kind, name) = CommandKind::parse_validated(raw_name)?;

        if self.roots.contains_key(name) {
            return Err(ConstructionError::DuplicateCommand {
                name: name.to_string(),
                parent: ROOT_LABEL.to_string(),
            }
            .into());
        }

        let id = self.push_node(name, kind, None);
        self.roots.insert(name.to_string(), id);
        Ok(id)
    }

    /// Attach a command under `parent`.
    ///
    /// Terminal parents (`$` or `^`) cannot be extended.
    pub fn add_child(&mut self, parent: CommandId, raw_name: &str) -> ChainResult<CommandId> {
        let (kind, name) = CommandKind::parse_validated(raw_name)?;

        let parent_node = self.node(parent).ok_or_else(|| ConstructionError::InvalidEntry {
            parent: format!("#{}", parent.index()),
            reason: "parent command does not belong to this grammar".to_string(),
        })?;
        parent_node.check_extendable(name)?;
        if parent_node.has_child(name) {
            return Err(ConstructionError::DuplicateCommand {
                name: name.to_string(),
                parent: parent_node.name().to_string(),
            }
            .into());
        }

        let id = self.push_node(name, kind, Some(parent));
        self.nodes[parent.0].attach(name, id);
        Ok(id)
    }

    fn push_node(&mut self, name: &str, kind: CommandKind, parent: Option<CommandId>) -> CommandId {
        let id = CommandId(self.nodes.len());
        self.nodes.push(CommandNode::new(id, name, kind, parent));
        id
    }

    /// Find the command `name` reachable from the cursor, bubbling up to the root
    pub fn find_next(&self, name: &str) -> Option<&CommandNode> {
        let mut current = self.cursor.and_then(|id| self.node(id));

        while let Some(node) = current {
            if let Some(id) = node.child(name) {
                trace!("Found {}() under {}", name, node.name());
                return self.node(id);
            }
            trace!("{}() not under {}, bubbling up", name, node.name());
            current = node.parent().and_then(|id| self.node(id));
        }

        self.root(name)
    }

    /// Replace the cursor; `None` returns the chain to the root
    pub fn set_cursor(&mut self, cursor: Option<CommandId>) {
        self.cursor = cursor;
    }

    pub fn cursor(&self) -> Option<CommandId> {
        self.cursor
    }

    /// Command at the cursor, if any
    pub fn current(&self) -> Option<&CommandNode> {
        self.cursor.and_then(|id| self.node(id))
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    pub fn is_at_root(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn node(&self, id: CommandId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Top-level command by bare name
    pub fn root(&self, name: &str) -> Option<&CommandNode> {
        self.roots.get(name).and_then(|id| self.node(*id))
    }

    pub fn roots(&self) -> impl Iterator<Item = &CommandNode> + '_ {
        self.roots.values().filter_map(|id| self.node(*id))
    }

    /// Walk from `id` up to its top-level command, `id` included
    pub fn ancestors(&self, id: CommandId) -> impl Iterator<Item = &CommandNode> + '_ {
        std::iter::successors(self.node(id), move |node| {
            node.parent().and_then(|parent| self.node(parent))
        })
    }

    /// Names callable from the cursor, sorted and deduplicated
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cursor
            .into_iter()
            .flat_map(|id| self.ancestors(id))
            .flat_map(|node| node.children().map(|(name, _)| name.to_string()))
            .chain(self.roots.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Export the tree back to its declarative form, names sorted per level
    pub fn to_spec(&self) -> GrammarSpec {
        let mut roots: Vec<&CommandNode> = self.roots().collect();
        roots.sort_by(|a, b| a.name().cmp(b.name()));
        roots.into_iter().map(|node| self.spec_of(node)).collect()
    }

    fn spec_of(&self, node: &CommandNode) -> CommandSpec {
        let mut children: Vec<&CommandNode> = node
            .children()
            .filter_map(|(_, id)| self.node(id))
            .collect();
        children.sort_by(|a, b| a.name().cmp(b.name()));

        CommandSpec::branch(
            node.spec_name(),
            children.into_iter().map(|child| self.spec_of(child)),
        )
    }
}

impl TryFrom<&GrammarSpec> for CommandGrammar {
    type Error = crate::error::ChainError;

    fn try_from(spec: &GrammarSpec) -> ChainResult<Self> {
        Self::from_spec(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, LogicError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn grammar(value: serde_json::Value) -> CommandGrammar {
        let spec = GrammarSpec::from_json_value(&value).unwrap();
        CommandGrammar::from_spec(&spec).unwrap()
    }

    fn step(grammar: &mut CommandGrammar, name: &str) {
        let id = grammar.find_next(name).map(CommandNode::id);
        assert!(id.is_some(), "{} should be reachable", name);
        grammar.set_cursor(id);
    }

    #[test]
    fn test_create_from_map() {
        let mut grammar = grammar(json!([
            { "methodOne": ["childOne"] },
            "methodTwo",
            "methodThree"
        ]));

        assert!(grammar.find_next("methodOne").is_some());
        assert!(grammar.find_next("methodTwo").is_some());
        assert!(grammar.find_next("methodThree").is_some());

        assert!(grammar.find_next("childOne").is_none());
        step(&mut grammar, "methodOne");
        assert!(grammar.find_next("childOne").is_some());

        assert!(grammar.find_next("methodNull").is_none());
    }

    #[test]
    fn test_bubble_up_and_branch_isolation() {
        let mut grammar = grammar(json!({
            "methodOne": { "childOne": { "subOne": ["subSubOne"] } },
            "methodTwo": { "childTwo": { "subTwo": ["subSubTwo"] } }
        }));

        step(&mut grammar, "methodOne");
        step(&mut grammar, "childOne");
        step(&mut grammar, "subOne");
        step(&mut grammar, "subSubOne");

        step(&mut grammar, "methodTwo");
        step(&mut grammar, "childTwo");
        step(&mut grammar, "subTwo");
        step(&mut grammar, "subSubTwo");

        // Another root command's descendants are out of reach
        assert!(grammar.find_next("childOne").is_none());
        assert!(grammar.find_next("subOne").is_none());
        assert!(grammar.find_next("subSubOne").is_none());

        // Bubbling up through the current branch
        assert!(grammar.find_next("methodTwo").is_some());
        assert!(grammar.find_next("childTwo").is_some());
        assert!(grammar.find_next("subTwo").is_some());
        assert!(grammar.find_next("methodOne").is_some());
    }

    #[test]
    fn test_find_next_prefers_deepest_match() {
        let mut grammar = grammar(json!({
            "select": ["from"],
            "from": null
        }));

        let root_from = grammar.root("from").map(CommandNode::id);
        assert_eq!(grammar.find_next("from").map(CommandNode::id), root_from);

        step(&mut grammar, "select");
        let nested = grammar.find_next("from").unwrap();
        assert_ne!(Some(nested.id()), root_from);
        assert!(nested.has_parent());
    }

    #[test]
    fn test_terminal_commands_reject_children() {
        for raw in ["$eq", "^clear"] {
            let spec = GrammarSpec::new().command(CommandSpec::branch(raw, ["add"]));
            let err = CommandGrammar::from_spec(&spec).unwrap_err();
            assert!(matches!(err, ChainError::Logic(_)), "{} accepted children", raw);
        }

        let mut grammar = CommandGrammar::new();
        let eq = grammar.add_root("$eq").unwrap();
        assert!(matches!(
            grammar.add_child(eq, "add"),
            Err(ChainError::Logic(LogicError::ExtendEndChain { .. }))
        ));
    }

    #[test]
    fn test_duplicate_roots_rejected() {
        let mut grammar = CommandGrammar::new();
        grammar.add_root("add").unwrap();
        assert!(matches!(
            grammar.add_root("^add"),
            Err(ChainError::Construction(ConstructionError::DuplicateCommand { .. }))
        ));
    }

    #[test]
    fn test_available_from_cursor() {
        let mut grammar = grammar(json!([
            { "select": ["from", "^where"] },
            { "insert": ["into"] },
            "$query"
        ]));

        assert_eq!(grammar.available(), vec!["insert", "query", "select"]);

        step(&mut grammar, "select");
        step(&mut grammar, "from");
        assert_eq!(
            grammar.available(),
            vec!["from", "insert", "query", "select", "where"]
        );
        assert_eq!(grammar.current().map(CommandNode::name), Some("from"));

        let chain: Vec<&str> = grammar
            .ancestors(grammar.cursor().unwrap())
            .map(CommandNode::name)
            .collect();
        assert_eq!(chain, vec!["from", "select"]);

        grammar.reset();
        assert!(grammar.is_at_root());
    }

    #[test]
    fn test_to_spec_round_trip() {
        let spec = GrammarSpec::new()
            .command("$query")
            .command(CommandSpec::branch("select", ["^where", "from"]));
        let grammar = CommandGrammar::from_spec(&spec).unwrap();

        assert_eq!(
            grammar.to_spec(),
            GrammarSpec::new()
                .command("$query")
                .command(CommandSpec::branch("select", ["from", "^where"]))
        );
        assert_eq!(grammar.len(), 4);
    }
}
