//! Change detection for incremental pulls.
//!
//! A pull carries an optional cutoff date. Without one the client gets a full
//! snapshot of every live record; with one it gets every record written on or
//! after that day, tombstones included, so deletions reach the client.

use crate::error::{Error, Result};
use crate::{Entity, Metadata, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Wire format of a cutoff marker.
pub const CUTOFF_FORMAT: &str = "%Y-%m-%d";

/// A day-resolution synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cutoff(NaiveDate);

impl Cutoff {
    /// Parse a `YYYY-MM-DD` marker.
    pub fn parse(marker: &str) -> Result<Self> {
        NaiveDate::parse_from_str(marker.trim(), CUTOFF_FORMAT)
            .map(Self)
            .map_err(|_| Error::MalformedCutoff(marker.to_string()))
    }

    /// The cutoff day containing `timestamp` (UTC).
    pub fn containing(timestamp: Timestamp) -> Self {
        Self(timestamp.date_naive())
    }

    /// Midnight UTC at the start of the cutoff day.
    pub fn instant(&self) -> Timestamp {
        DateTime::<Utc>::from_naive_utc_and_offset(self.0.and_time(NaiveTime::MIN), Utc)
    }
}

impl FromStr for Cutoff {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CUTOFF_FORMAT))
    }
}

/// Selects the records a pull returns.
///
/// Full and incremental pulls go through the same selection; only the
/// predicate differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    since: Option<Timestamp>,
}

impl ChangeFilter {
    /// Every live record.
    pub fn full() -> Self {
        Self { since: None }
    }

    /// Every record written at or after the start of `cutoff`.
    pub fn since(cutoff: Cutoff) -> Self {
        Self::written_since(cutoff.instant())
    }

    /// Every record written at or after `instant`, tombstones included.
    pub fn written_since(instant: Timestamp) -> Self {
        Self {
            since: Some(instant),
        }
    }

    /// Build a filter from an optional client marker.
    ///
    /// A missing or blank marker means a full snapshot.
    pub fn from_marker(marker: Option<&str>) -> Result<Self> {
        match marker.map(str::trim) {
            None | Some("") => Ok(Self::full()),
            Some(value) => Cutoff::parse(value).map(Self::since),
        }
    }

    /// Lower bound on `updatedDate`, if incremental.
    pub fn cutoff(&self) -> Option<Timestamp> {
        self.since
    }

    pub fn is_incremental(&self) -> bool {
        self.since.is_some()
    }

    /// Check whether a record with this metadata belongs in the result.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self.since {
            None => !metadata.is_deleted(),
            Some(since) => metadata.updated_date >= since,
        }
    }

    /// Apply the filter to records of one kind, ordered by `(updatedDate, id)`.
    pub fn select<'a, T, I>(&self, records: I) -> Vec<T>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        let mut selected: Vec<T> = records
            .into_iter()
            .filter(|r| self.matches(r.metadata()))
            .cloned()
            .collect();
        selected.sort_by(|a, b| {
            a.metadata()
                .updated_date
                .cmp(&b.metadata().updated_date)
                .then_with(|| a.id().cmp(&b.id()))
        });
        selected
    }
}
