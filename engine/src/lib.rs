//! # Memverse Engine
//!
//! The sync core for the memverse flashcard backend.
//!
//! Clients work offline against a local copy of their collections, cards and
//! card-verse links, then reconcile with the server: a **push** uploads their
//! changes, a **pull** downloads what changed since their last sync. This
//! crate holds the rules both paths share, independent of any transport or
//! database.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches the network or a database
//! - **Deterministic**: write times are passed in, never read from a clock
//! - **Shared rules**: the Postgres store and the in-memory store merge and
//!   filter with the same code
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! Three kinds are synced, each with an identity, `createdDate`,
//! `updatedDate` and a soft-delete marker (`deletedAt`):
//! - [`Collection`] - a uniquely named group of cards
//! - [`Card`] - a flashcard plus its spaced-repetition state, which the
//!   server stores verbatim
//! - [`CardVerse`] - links a card to the verse it displays
//!
//! ### Conflict resolution
//!
//! [`ConflictResolver`] applies whole-record last-writer-wins: a pushed record
//! replaces every field of the stored one. Dangling references are rejected
//! or accepted according to [`ReferencePolicy`].
//!
//! ### Change detection
//!
//! [`ChangeFilter`] picks what a pull returns: every live record when no
//! [`Cutoff`] is given, otherwise every record written on or after the cutoff
//! day, tombstones included.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use memverse_engine::{
//!     Card, ChangeFilter, Collection, ConflictResolver, MemoryStore, ReferencePolicy, SyncBatch,
//! };
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
//! let mut store = MemoryStore::new();
//!
//! // 1. Push a collection and a card that references it
//! let batch = SyncBatch::new()
//!     .with_collection(Collection::new("Psalms", now).with_id("psalms"))
//!     .with_card(Card::new("psalms", "PSA.23.1", now).with_id("card-1"));
//! let resolver = ConflictResolver::new(ReferencePolicy::Strict, now);
//! let summary = store.apply(batch, &resolver).unwrap();
//! assert_eq!(summary.total(), 2);
//!
//! // 2. Pull everything
//! let snapshot = store.select(&ChangeFilter::full());
//! assert_eq!(snapshot.collections.len(), 1);
//! assert_eq!(snapshot.cards[0].ease_factor, 2.5);
//!
//! // 3. Pull only what changed since a given day
//! let delta = store.select(&ChangeFilter::from_marker(Some("2024-01-16")).unwrap());
//! assert!(delta.is_empty());
//! ```

pub mod batch;
pub mod error;
pub mod filter;
pub mod record;
pub mod resolve;
pub mod store;

// Re-export main types at crate root
pub use batch::{PushSummary, SyncBatch};
pub use error::Error;
pub use filter::{ChangeFilter, Cutoff, CUTOFF_FORMAT};
pub use record::{
    Card, CardId, CardVerse, CardVerseId, Collection, CollectionId, Entity, EntityKind, Metadata,
    Reference, DEFAULT_EASE_FACTOR,
};
pub use resolve::{ConflictResolver, ReferencePolicy};
pub use store::{MemoryStore, Stored, Table};

/// Wall-clock instant used for all record timestamps.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
