//! Four-stage kinship traversal.
//!
//! Each stage derives one generation set from the previous stage's id set:
//! parents, then grandparents, then aunts/uncles, then cousins. The
//! traversal is a fixed number of bounded adjacency lookups, never a
//! recursive ancestor walk, so cyclic edge sets cannot cause
//! non-termination.

use std::collections::BTreeSet;

use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::kinship::{KinshipReport, PersonSummary};
use crate::store;

/// Resolve the kinship report for a subject.
///
/// Fails fast with `PersonNotFound` if the subject has no record; any store
/// failure aborts the remaining stages. Ids referenced by an edge but
/// missing a person record are dropped at summary resolution.
pub async fn resolve_kinship(db: &Db, subject_id: i64) -> Result<KinshipReport> {
    if store::person_by_id(db, subject_id).await?.is_none() {
        return Err(KintreeError::PersonNotFound(subject_id));
    }

    // Stage 1: parents. BTreeSet both dedups and fixes ascending-id order.
    let parents: BTreeSet<i64> = store::parents_of(db, subject_id).await?.into_iter().collect();

    // Stage 2: grandparents = union of each parent's parents.
    let mut grandparents = BTreeSet::new();
    for &parent_id in &parents {
        grandparents.extend(store::parents_of(db, parent_id).await?);
    }

    // Stage 3: aunts/uncles = children of grandparents, minus the subject's
    // own parents. Siblings of a parent only, never the parent itself.
    let mut aunts_and_uncles = BTreeSet::new();
    for &grandparent_id in &grandparents {
        aunts_and_uncles.extend(store::children_of(db, grandparent_id).await?);
    }
    for parent_id in &parents {
        aunts_and_uncles.remove(parent_id);
    }

    // Stage 4: cousins = children of aunts/uncles. The subject can only end
    // up here through a malformed edge set, so remove it regardless.
    let mut cousins = BTreeSet::new();
    for &aunt_uncle_id in &aunts_and_uncles {
        cousins.extend(store::children_of(db, aunt_uncle_id).await?);
    }
    cousins.remove(&subject_id);

    Ok(KinshipReport {
        parents: summaries(db, &parents).await?,
        grandparents: summaries(db, &grandparents).await?,
        aunts_and_uncles: summaries(db, &aunts_and_uncles).await?,
        cousins: summaries(db, &cousins).await?,
    })
}

/// Resolve an id set to display summaries. Dangling ids (no person record)
/// are silently skipped.
async fn summaries(db: &Db, ids: &BTreeSet<i64>) -> Result<Vec<PersonSummary>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = ids.iter().copied().collect();
    let persons = store::persons_by_ids(db, &ids).await?;
    Ok(persons
        .into_iter()
        .map(|p| PersonSummary {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
        })
        .collect())
}
