//! Conflict resolution for pushed records.
//!
//! Policy is whole-record last-writer-wins: an incoming record replaces every
//! field of the stored record with the same identity. There is no field-level
//! diffing and no causality tracking; the push that lands last wins.
//!
//! The server owns the bookkeeping timestamps:
//!
//! - `createdDate` is kept from the stored record on overwrite
//! - `updatedDate` becomes the time of the push, never moving backwards
//! - `deletedAt` is taken from the incoming record, so a push can both
//!   tombstone and restore a record

use crate::error::{Error, Result};
use crate::{Entity, Reference, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with a live record whose reference points nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferencePolicy {
    /// Reject the push (default)
    #[default]
    Strict,
    /// Accept dangling references silently
    Lenient,
}

impl FromStr for ReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ReferencePolicy::Strict),
            "lenient" => Ok(ReferencePolicy::Lenient),
            other => Err(format!("unknown reference policy: {other}")),
        }
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePolicy::Strict => f.write_str("strict"),
            ReferencePolicy::Lenient => f.write_str("lenient"),
        }
    }
}

/// Merges incoming records over stored ones for a single push.
///
/// One resolver is created per push so that every record in the batch gets
/// the same write time.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    policy: ReferencePolicy,
    now: Timestamp,
}

impl ConflictResolver {
    pub fn new(policy: ReferencePolicy, now: Timestamp) -> Self {
        Self { policy, now }
    }

    pub fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    /// Write time applied to every record merged by this resolver.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Produce the record to store for `incoming`, given what is stored under
    /// the same identity. Records without an identity get a fresh one.
    pub fn merge<T: Entity>(&self, existing: Option<&T>, mut incoming: T) -> Result<(T::Id, T)> {
        incoming.validate()?;

        let id = match incoming.id() {
            Some(id) => id.clone(),
            None => {
                let id = T::Id::from(uuid::Uuid::new_v4().to_string());
                incoming.set_id(id.clone());
                id
            }
        };

        let metadata = incoming.metadata_mut();
        match existing {
            Some(stored) => {
                metadata.created_date = stored.metadata().created_date;
                metadata.updated_date = self.now.max(stored.metadata().updated_date);
            }
            None => metadata.updated_date = self.now,
        }
        incoming.normalize();

        Ok((id, incoming))
    }

    /// The reference that must resolve before `record` can be written.
    ///
    /// Tombstones and lenient pushes need no check.
    pub fn required_reference<T: Entity>(&self, record: &T) -> Option<Reference> {
        if self.policy == ReferencePolicy::Lenient || record.is_deleted() {
            return None;
        }
        record.reference()
    }

    /// Fail with [`Error::DanglingReference`] unless the target exists.
    pub fn check_reference<T: Entity>(
        &self,
        record: &T,
        reference: &Reference,
        target_exists: bool,
    ) -> Result<()> {
        if target_exists {
            return Ok(());
        }
        Err(Error::DanglingReference {
            kind: T::KIND,
            id: record.id().map(|id| id.to_string()).unwrap_or_default(),
            target: reference.target,
            target_id: reference.id.clone(),
        })
    }
}
