//! Known header aliases for destination columns.
//!
//! The table maps a canonical alias to a canonical destination key. It is
//! consulted only after an exact canonical match fails, and an alias only
//! applies when its target actually exists in the destination table.
//!
//! Every alias carries a rank: the order it was registered in. When several
//! headers of one file reach the same column through aliases, the lowest rank
//! wins. The built-in groups are registered first, so `title` outranks
//! `subject`, which outranks `name`.
//!
//! Extra aliases can be loaded from YAML shaped as `target: [alias, ...]`:
//!
//! ```yaml
//! title: [headline, summary]
//! reported_by: [reporter, analyst]
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::mapping::canonical_key;

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("incident_type", &["type", "incident_type"]),
    ("date", &["date", "date_reported", "created_date"]),
    ("title", &["title", "subject", "name"]),
    ("description", &["description"]),
];

/// On-disk synonym file: destination column to the aliases that reach it.
/// Groups are registered in target name order.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct SynonymFile {
    groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Alias {
    target: String,
    rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    aliases: BTreeMap<String, Alias>,
    next_rank: usize,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (target, aliases) in DEFAULT_SYNONYMS {
            for alias in *aliases {
                table.insert(alias, target);
            }
        }
        table
    }
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
            next_rank: 0,
        }
    }

    /// Registers `alias` for `target`. Both are stored as canonical keys; a
    /// later registration of the same alias replaces the earlier target and
    /// takes the next rank.
    pub fn insert(&mut self, alias: &str, target: &str) {
        let rank = self.next_rank;
        self.next_rank += 1;
        self.aliases.insert(
            canonical_key(alias),
            Alias {
                target: canonical_key(target),
                rank,
            },
        );
    }

    pub fn target_for(&self, alias_key: &str) -> Option<&str> {
        self.aliases.get(alias_key).map(|a| a.target.as_str())
    }

    /// Target and rank of `alias_key`; lower ranks take precedence.
    pub fn lookup(&self, alias_key: &str) -> Option<(&str, usize)> {
        self.aliases
            .get(alias_key)
            .map(|a| (a.target.as_str(), a.rank))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// `(alias, target)` pairs in rank order.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries = self
            .aliases
            .iter()
            .map(|(alias, a)| (a.rank, alias.as_str(), a.target.as_str()))
            .collect::<Vec<_>>();
        entries.sort_unstable_by_key(|(rank, _, _)| *rank);
        entries
            .into_iter()
            .map(|(_, alias, target)| (alias, target))
            .collect()
    }

    pub fn extend_from_yaml(&mut self, input: &str) -> Result<()> {
        let file: SynonymFile = serde_yaml::from_str(input).context("Parsing synonym YAML")?;
        for (target, aliases) in &file.groups {
            ensure!(
                !canonical_key(target).is_empty(),
                "Synonym target names must not be blank"
            );
            for alias in aliases {
                ensure!(
                    !canonical_key(alias).is_empty(),
                    "Blank alias listed for target '{target}'"
                );
                self.insert(alias, target);
            }
        }
        Ok(())
    }

    /// Loads the built-in aliases extended with those in `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Reading synonym file {path:?}"))?;
        let mut table = Self::default();
        table
            .extend_from_yaml(&contents)
            .with_context(|| format!("Loading synonyms from {path:?}"))?;
        Ok(table)
    }
}
