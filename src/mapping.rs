//! Header-to-column reconciliation.
//!
//! Source headers and destination columns are compared through their
//! canonical keys. Resolution per header, in priority order:
//!
//! 1. exact canonical match against a destination column
//! 2. a synonym whose canonical target exists in the destination
//! 3. otherwise the header is dropped
//!
//! A destination column is claimed at most once, and the winner never
//! depends on where a header sits in the file. Exact matches are settled
//! before synonym matches. Among synonym matches the alias with the lowest
//! rank wins; remaining ties go to the smallest canonical key, then to the
//! smallest header text.

use std::{collections::HashMap, fmt};

use log::debug;

use crate::synonyms::SynonymTable;

/// Lowercase, trim, and replace spaces and hyphens with underscores.
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Ordered by precedence: exact matches are settled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Synonym,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => f.write_str("exact"),
            MatchKind::Synonym => f.write_str("synonym"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub source_index: usize,
    pub source: String,
    pub target: String,
    pub kind: MatchKind,
}

struct Candidate<'a> {
    index: usize,
    column: &'a str,
    kind: MatchKind,
    rank: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<MappedColumn>,
    dropped: Vec<String>,
}

impl ColumnMapping {
    pub fn resolve(
        headers: &[String],
        target_columns: &[String],
        synonyms: &SynonymTable,
    ) -> Self {
        let mut lookup: HashMap<String, &str> = HashMap::with_capacity(target_columns.len());
        for column in target_columns {
            lookup
                .entry(canonical_key(column))
                .or_insert(column.as_str());
        }

        let keys = headers.iter().map(|h| canonical_key(h)).collect::<Vec<_>>();
        let mut candidates = keys
            .iter()
            .enumerate()
            .filter_map(|(index, key)| {
                if let Some(column) = lookup.get(key) {
                    return Some(Candidate {
                        index,
                        column: *column,
                        kind: MatchKind::Exact,
                        rank: 0,
                    });
                }
                let (target, rank) = synonyms.lookup(key)?;
                lookup.get(target).map(|column| Candidate {
                    index,
                    column: *column,
                    kind: MatchKind::Synonym,
                    rank,
                })
            })
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| {
            (a.kind, a.rank, &keys[a.index], &headers[a.index], a.index).cmp(&(
                b.kind,
                b.rank,
                &keys[b.index],
                &headers[b.index],
                b.index,
            ))
        });

        let mut claimed: HashMap<&str, usize> = HashMap::new();
        let mut accepted: Vec<Option<(&str, MatchKind)>> = vec![None; headers.len()];
        for candidate in &candidates {
            if let Some(owner) = claimed.get(candidate.column) {
                debug!(
                    "Header '{}' also resolves to '{}', already claimed by '{}'; dropping it",
                    headers[candidate.index], candidate.column, headers[*owner]
                );
                continue;
            }
            claimed.insert(candidate.column, candidate.index);
            accepted[candidate.index] = Some((candidate.column, candidate.kind));
        }

        let mut columns = Vec::new();
        let mut dropped = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            match accepted[idx] {
                Some((column, kind)) => columns.push(MappedColumn {
                    source_index: idx,
                    source: header.clone(),
                    target: column.to_string(),
                    kind,
                }),
                None => dropped.push(header.clone()),
            }
        }

        Self { columns, dropped }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[MappedColumn] {
        &self.columns
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn target_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.target.as_str()).collect()
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.source == source)
            .map(|c| c.target.as_str())
    }

    /// Builds the value tuple for one record in mapping order. Fields the
    /// record does not carry become null.
    pub fn project(&self, record: &[Option<String>]) -> Vec<Option<String>> {
        self.columns
            .iter()
            .map(|c| record.get(c.source_index).cloned().flatten())
            .collect()
    }
}
