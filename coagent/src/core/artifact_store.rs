//! Content-addressed store of finalized artifacts.

use crate::core::types::Artifact;
use crate::core::view::ArtifactCard;

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new entry was appended at `index`.
    Inserted { index: usize },
    /// An equal entry already existed at `index` and was replaced in place.
    Replaced { index: usize },
}

/// Insertion-ordered artifacts, deduplicated by deep equality.
///
/// The same action event may fire any number of times; the store holds one
/// entry per distinct artifact regardless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactStore {
    entries: Vec<Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an equal entry in place, or append.
    pub fn upsert(&mut self, artifact: Artifact) -> Upsert {
        match self.entries.iter().position(|existing| *existing == artifact) {
            Some(index) => {
                self.entries[index] = artifact;
                Upsert::Replaced { index }
            }
            None => {
                self.entries.push(artifact);
                Upsert::Inserted {
                    index: self.entries.len() - 1,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter()
    }

    /// Most recently inserted artifact.
    pub fn latest(&self) -> Option<&Artifact> {
        self.entries.last()
    }

    /// One card per stored artifact, in insertion order.
    pub fn cards(&self) -> Vec<ArtifactCard> {
        self.entries.iter().map(ArtifactCard::from_artifact).collect()
    }
}
