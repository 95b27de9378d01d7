//! Kinship derivation over the parent-child graph.
//!
//! Computes parents, grandparents, aunts/uncles and first cousins for a
//! subject from parent-child edges alone. Pure read-compute pipeline;
//! nothing here mutates the store.

mod resolver;

pub use resolver::resolve_kinship;

use serde::{Deserialize, Serialize};

/// Display subset of a person used in kinship results.
/// Date of birth and gender are not part of the kinship summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// The four generation sets derived for a subject, each deduplicated by id
/// and ordered by ascending id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KinshipReport {
    pub parents: Vec<PersonSummary>,
    pub grandparents: Vec<PersonSummary>,
    pub aunts_and_uncles: Vec<PersonSummary>,
    pub cousins: Vec<PersonSummary>,
}
