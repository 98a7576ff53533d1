//! Grammar file loader
//!
//! Loads grammar specifications from YAML (`.yaml`, `.yml`) or JSON (`.json`)
//! files. The file stem names the grammar: `grammars/sql.yaml` is `sql`.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::grammar::CommandGrammar;
use crate::spec::GrammarSpec;

/// Environment variable overriding the grammar directory
pub const GRAMMAR_DIR_ENV: &str = "CHAIN_GRAMMAR_DIR";

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

pub struct GrammarLoader {
    grammar_dir: PathBuf,
}

impl GrammarLoader {
    pub fn new(grammar_dir: impl Into<PathBuf>) -> Self {
        Self {
            grammar_dir: grammar_dir.into(),
        }
    }

    /// Create loader from CHAIN_GRAMMAR_DIR or default to "grammars"
    ///
    /// Path resolution order:
    /// 1. CHAIN_GRAMMAR_DIR environment variable (explicit override)
    /// 2. Relative "grammars" path (works when running from the repository root)
    /// 3. CARGO_MANIFEST_DIR/grammars (compile-time crate directory)
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(GRAMMAR_DIR_ENV) {
            return Self::new(dir);
        }

        if Path::new("grammars").is_dir() {
            return Self::new("grammars");
        }

        let compile_time = concat!(env!("CARGO_MANIFEST_DIR"), "/grammars");
        if Path::new(compile_time).is_dir() {
            return Self::new(compile_time);
        }

        // Last resort - let the first load fail with a clear error
        Self::new("grammars")
    }

    pub fn grammar_dir(&self) -> &Path {
        &self.grammar_dir
    }

    /// Load the grammar named `name` from the grammar directory
    pub fn load(&self, name: &str) -> Result<GrammarSpec> {
        let path = EXTENSIONS
            .iter()
            .map(|ext| self.grammar_dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                anyhow!(
                    "No grammar '{}' in {} (looked for .yaml, .yml, .json)",
                    name,
                    self.grammar_dir.display()
                )
            })?;

        Self::load_file(&path)
    }

    /// Load and build the grammar named `name`
    pub fn load_grammar(&self, name: &str) -> Result<CommandGrammar> {
        let spec = self.load(name)?;
        CommandGrammar::from_spec(&spec)
            .with_context(|| format!("Failed to build grammar '{}'", name))
    }

    /// Load a single specification file; the format follows the extension
    pub fn load_file(path: &Path) -> Result<GrammarSpec> {
        info!("Loading grammar from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let spec = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => GrammarSpec::from_json_str(&content),
            _ => GrammarSpec::from_yaml_str(&content),
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(
            "Loaded {} root commands ({} total) from {}",
            spec.len(),
            spec.count(),
            path.display()
        );

        Ok(spec)
    }

    /// Load every grammar file in the directory, keyed by file stem.
    ///
    /// Files starting with `_` are skipped. Files that fail to load are logged
    /// and skipped.
    pub fn load_all(&self) -> Result<BTreeMap<String, GrammarSpec>> {
        let mut specs = BTreeMap::new();

        if !self.grammar_dir.exists() {
            warn!(
                "Grammar directory does not exist: {}",
                self.grammar_dir.display()
            );
            return Ok(specs);
        }

        let entries = std::fs::read_dir(&self.grammar_dir)
            .with_context(|| format!("Failed to read {}", self.grammar_dir.display()))?;

        for entry in entries {
            let path = entry?.path();

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| EXTENSIONS.contains(&e))
                .unwrap_or(false);

            if !path.is_file() || !supported || stem.starts_with('_') {
                continue;
            }

            match Self::load_file(&path) {
                Ok(spec) => {
                    specs.insert(stem.to_string(), spec);
                }
                Err(e) => warn!("Failed to load grammar from {}: {:#}", path.display(), e),
            }
        }

        info!(
            "Loaded {} grammars from {}",
            specs.len(),
            self.grammar_dir.display()
        );

        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "calc.yaml", "[add, sub, ^clear, $eq]");
        write(dir.path(), "sql.json", r#"[{"select": ["from", "^where"]}, "$query"]"#);

        let loader = GrammarLoader::new(dir.path());
        assert_eq!(loader.load("calc").unwrap().len(), 4);
        assert_eq!(loader.load("sql").unwrap().count(), 4);
        assert!(loader.load("missing").is_err());

        let grammar = loader.load_grammar("sql").unwrap();
        assert!(grammar.root("query").unwrap().ends_chain());
    }

    #[test]
    fn test_load_all_skips_private_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "calc.yml", "- add\n- $eq\n");
        write(dir.path(), "_meta.yaml", "version: 1\n");
        write(dir.path(), "broken.yaml", "42");
        write(dir.path(), "notes.txt", "add");

        let specs = GrammarLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(specs.keys().collect::<Vec<_>>(), vec!["calc"]);
    }

    #[test]
    fn test_terminal_with_children_fails_to_build() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.yaml", "$eq: [add]\n");

        let loader = GrammarLoader::new(dir.path());
        assert!(loader.load("bad").is_ok());
        assert!(loader.load_grammar("bad").is_err());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let loader = GrammarLoader::new("/nonexistent/grammar/dir");
        assert!(loader.load_all().unwrap().is_empty());
    }
}
