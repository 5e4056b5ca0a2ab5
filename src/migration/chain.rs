//! Revision graph over the embedded migration units.
//!
//! Each revision names its predecessors. The graph must have one root and
//! one head, and every predecessor must sort before its child so that the
//! runner's version order is also a valid chain order. Branches are allowed
//! as long as a merge revision joins them again.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Deserialize;

use crate::error::ChainError;

/// The manifest compiled into the binary.
pub const EMBEDDED_MANIFEST: &str = include_str!("../../revisions.toml");

/// One node of the revision graph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Revision {
    /// Version of the migration unit, e.g. `20250701000000`.
    pub id: String,
    pub message: String,
    /// Predecessors. Empty for the root, two or more for a merge.
    #[serde(default)]
    pub down_revisions: Vec<String>,
}

impl Revision {
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.down_revisions.len() > 1
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "revision")]
    revisions: Vec<Revision>,
}

/// A validated revision graph, ordered by id.
#[derive(Debug, Clone)]
pub struct Chain {
    revisions: Vec<Revision>,
    index: HashMap<String, usize>,
    head: usize,
}

impl Chain {
    /// Parse and validate a manifest.
    ///
    /// # Errors
    /// Returns [`ChainError::Manifest`] for malformed TOML, otherwise any
    /// error from [`Chain::new`].
    pub fn parse(text: &str) -> Result<Self, ChainError> {
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| ChainError::Manifest(e.to_string()))?;
        Self::new(manifest.revisions)
    }

    /// The chain described by the compiled-in manifest.
    ///
    /// # Errors
    /// See [`Chain::parse`].
    pub fn embedded() -> Result<Self, ChainError> {
        Self::parse(EMBEDDED_MANIFEST)
    }

    /// Validate a set of revisions.
    ///
    /// # Errors
    /// Returns the first inconsistency found: an empty set, a duplicate id,
    /// an unknown or out-of-order predecessor, several roots, or branches
    /// that never merge.
    pub fn new(mut revisions: Vec<Revision>) -> Result<Self, ChainError> {
        if revisions.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut seen = HashSet::new();
        for revision in &revisions {
            if !seen.insert(revision.id.as_str()) {
                return Err(ChainError::Duplicate(revision.id.clone()));
            }
        }

        for revision in &revisions {
            for predecessor in &revision.down_revisions {
                if !seen.contains(predecessor.as_str()) {
                    return Err(ChainError::MissingPredecessor {
                        revision: revision.id.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
                if predecessor >= &revision.id {
                    return Err(ChainError::PredecessorOrder {
                        revision: revision.id.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
            }
        }

        revisions.sort_by(|a, b| a.id.cmp(&b.id));
        let index: HashMap<String, usize> = revisions
            .iter()
            .enumerate()
            .map(|(n, r)| (r.id.clone(), n))
            .collect();

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for revision in &revisions {
            for predecessor in &revision.down_revisions {
                children
                    .entry(predecessor.clone())
                    .or_default()
                    .push(revision.id.clone());
            }
        }

        let roots: Vec<usize> = (0..revisions.len())
            .filter(|&n| revisions[n].down_revisions.is_empty())
            .collect();
        if roots.len() != 1 {
            return Err(ChainError::MultipleRoots(
                roots.iter().map(|&n| revisions[n].id.clone()).collect(),
            ));
        }

        let heads: Vec<usize> = (0..revisions.len())
            .filter(|&n| !children.contains_key(&revisions[n].id))
            .collect();
        if heads.len() > 1 {
            return Err(divergence(&revisions, &children, &heads));
        }
        // The highest id can never have children, so there is always a head.
        let head = heads[0];

        Ok(Self {
            revisions,
            index,
            head,
        })
    }

    /// Check that the manifest and the migration units name the same ids.
    ///
    /// # Errors
    /// Returns [`ChainError::UnitWithoutRevision`] or
    /// [`ChainError::RevisionWithoutUnit`] for the first mismatch.
    pub fn verify_units<'a, I>(&self, units: I) -> Result<(), ChainError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let units: BTreeSet<&str> = units.into_iter().collect();
        if let Some(unit) = units.iter().find(|u| !self.contains(u)) {
            return Err(ChainError::UnitWithoutRevision((*unit).to_string()));
        }
        if let Some(revision) = self.iter().find(|r| !units.contains(r.id.as_str())) {
            return Err(ChainError::RevisionWithoutUnit(revision.id.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn head(&self) -> &Revision {
        &self.revisions[self.head]
    }

    pub fn get(&self, id: &str) -> Option<&Revision> {
        self.index.get(id).map(|&n| &self.revisions[n])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Revisions in application order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Revision> {
        self.revisions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// `id` and every revision it transitively depends on.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(next) = stack.pop() {
            if let Some(revision) = self.get(&next) {
                if found.insert(next) {
                    stack.extend(revision.down_revisions.iter().cloned());
                }
            }
        }
        found
    }
}

/// Describe the latest fork that leads to more than one head.
fn divergence(
    revisions: &[Revision],
    children: &HashMap<String, Vec<String>>,
    heads: &[usize],
) -> ChainError {
    let head_ids: Vec<String> = heads.iter().map(|&n| revisions[n].id.clone()).collect();

    // Revisions are sorted, so walking backwards sees children first.
    let mut reach: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for revision in revisions.iter().rev() {
        let mut heads_reached = BTreeSet::new();
        match children.get(&revision.id) {
            None => {
                heads_reached.insert(revision.id.as_str());
            }
            Some(kids) => {
                for kid in kids {
                    if let Some(set) = reach.get(kid.as_str()) {
                        heads_reached.extend(set.iter().copied());
                    }
                }
            }
        }
        reach.insert(revision.id.as_str(), heads_reached);
    }

    let fork = revisions.iter().rev().find(|r| {
        children.get(&r.id).is_some_and(|kids| kids.len() > 1)
            && reach.get(r.id.as_str()).is_some_and(|set| set.len() > 1)
    });

    match fork {
        Some(fork) => ChainError::Divergent {
            predecessor: fork.id.clone(),
            children: children.get(&fork.id).cloned().unwrap_or_default(),
            heads: head_ids,
        },
        None => ChainError::Divergent {
            predecessor: revisions[0].id.clone(),
            children: Vec::new(),
            heads: head_ids,
        },
    }
}
