//! Persistence layer over the persons and relationships tables.
//!
//! Everything here is a thin, explicit query; graph semantics (dedup,
//! generation algebra, dangling-edge policy) live in the kinship module.

mod persons;
mod relations;

pub use persons::{
    delete_person, insert_person, list_persons, person_by_id, persons_by_ids, update_person,
};
pub use relations::{
    children_of, delete_relation, find_relation, insert_relation, list_relations, parents_of,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A person record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    /// Serialized as `YYYY-MM-DD`.
    pub dob: NaiveDate,
}

/// Validated payload for creating a person. Id assignment is the store's job.
#[derive(Debug, Clone)]
pub struct PersonInput {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub dob: NaiveDate,
}

/// Partial update for a person; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// A directed parent-child edge (parent is a parent of child).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
}
