//! MemoryStore - the in-memory entity store.
//!
//! Holds every record of each kind keyed by identity, tombstones included.
//! A push writes in place and keeps the prior version of every record it
//! touched; if any record fails, those versions are put back, so a failed
//! push leaves the store untouched.

use crate::error::{Error, Result};
use crate::{
    Card, CardId, CardVerse, CardVerseId, ChangeFilter, Collection, CollectionId,
    ConflictResolver, Entity, EntityKind, PushSummary, Reference, SyncBatch, Timestamp,
};
use std::collections::BTreeMap;

/// All records of one kind.
#[derive(Debug, Clone)]
pub struct Table<T: Entity> {
    records: BTreeMap<T::Id, T>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Table<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Get a record by ID (including deleted).
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    /// Check if a live record exists.
    pub fn contains_active(&self, id: &str) -> bool {
        self.get(id).is_some_and(|r| !r.is_deleted())
    }

    fn insert(&mut self, id: T::Id, record: T) -> Option<T> {
        self.records.insert(id, record)
    }

    /// Put back what was stored under `id` before a write.
    fn restore(&mut self, id: T::Id, previous: Option<T>) {
        match previous {
            Some(record) => {
                self.records.insert(id, record);
            }
            None => {
                self.records.remove::<T::Id>(&id);
            }
        }
    }

    /// Get all active (non-deleted) records.
    pub fn active_records(&self) -> impl Iterator<Item = &T> {
        self.records.values().filter(|r| !r.is_deleted())
    }

    /// Get all records including deleted.
    pub fn all_records(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }

    /// Count of active records.
    pub fn len(&self) -> usize {
        self.active_records().count()
    }

    /// Check if the table has no active records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Access to a kind's table plus the constraints the store enforces for it.
pub trait Stored: Entity {
    fn table(store: &MemoryStore) -> &Table<Self>;

    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self>;

    /// Store-level uniqueness checks, run after merge.
    fn check_constraints(&self, _store: &MemoryStore) -> Result<()> {
        Ok(())
    }
}

impl Stored for Collection {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.collections
    }

    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self> {
        &mut store.collections
    }

    fn check_constraints(&self, store: &MemoryStore) -> Result<()> {
        if self.is_deleted() {
            return Ok(());
        }
        let taken = store
            .collections
            .active_records()
            .any(|other| other.name == self.name && other.id != self.id);
        if taken {
            return Err(Error::DuplicateName(self.name.clone()));
        }
        Ok(())
    }
}

impl Stored for Card {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.cards
    }

    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self> {
        &mut store.cards
    }
}

impl Stored for CardVerse {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.card_verses
    }

    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self> {
        &mut store.card_verses
    }
}

/// The in-memory store holding all three record kinds.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Table<Collection>,
    cards: Table<Card>,
    card_verses: Table<CardVerse>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> &Table<Collection> {
        &self.collections
    }

    pub fn cards(&self) -> &Table<Card> {
        &self.cards
    }

    pub fn card_verses(&self) -> &Table<CardVerse> {
        &self.card_verses
    }

    /// Apply a pushed batch atomically.
    ///
    /// Collections are merged before cards and cards before card verses so
    /// that references within one batch resolve. Cost is proportional to the
    /// batch, not to the store.
    pub fn apply(
        &mut self,
        batch: SyncBatch,
        resolver: &ConflictResolver,
    ) -> Result<PushSummary> {
        if batch.is_empty() {
            return Ok(PushSummary::default());
        }

        let mut undo = Undo::default();
        let result = self.apply_logged(batch, resolver, &mut undo);
        if result.is_err() {
            undo.rollback(self);
        }
        result
    }

    fn apply_logged(
        &mut self,
        batch: SyncBatch,
        resolver: &ConflictResolver,
        undo: &mut Undo,
    ) -> Result<PushSummary> {
        Ok(PushSummary {
            collections: self.upsert_all(batch.collections, resolver, &mut undo.collections)?,
            cards: self.upsert_all(batch.cards, resolver, &mut undo.cards)?,
            card_verses: self.upsert_all(batch.card_verses, resolver, &mut undo.card_verses)?,
        })
    }

    fn upsert_all<T: Stored>(
        &mut self,
        records: Vec<T>,
        resolver: &ConflictResolver,
        undo: &mut Vec<(T::Id, Option<T>)>,
    ) -> Result<usize> {
        let count = records.len();
        for record in records {
            undo.push(self.write(record, resolver)?);
        }
        Ok(count)
    }

    /// Insert or overwrite one record by identity.
    ///
    /// Not atomic across calls; use [`MemoryStore::apply`] for batches.
    pub fn upsert<T: Stored>(&mut self, record: T, resolver: &ConflictResolver) -> Result<T::Id> {
        self.write(record, resolver).map(|(id, _)| id)
    }

    /// Merge and store one record, returning its id and the version it replaced.
    fn write<T: Stored>(
        &mut self,
        record: T,
        resolver: &ConflictResolver,
    ) -> Result<(T::Id, Option<T>)> {
        let existing = record.id().and_then(|id| T::table(self).get(id.as_ref()));
        let (id, merged) = resolver.merge(existing, record)?;

        if let Some(reference) = resolver.required_reference(&merged) {
            let exists = self.target_exists(&reference);
            resolver.check_reference(&merged, &reference, exists)?;
        }
        merged.check_constraints(self)?;

        let previous = T::table_mut(self).insert(id.clone(), merged);
        Ok((id, previous))
    }

    fn target_exists(&self, reference: &Reference) -> bool {
        match reference.target {
            EntityKind::Collection => self.collections.contains_active(&reference.id),
            EntityKind::Card => self.cards.contains_active(&reference.id),
            EntityKind::CardVerse => self.card_verses.contains_active(&reference.id),
        }
    }

    /// Every live record of one kind, ordered by `(updatedDate, id)`.
    pub fn find_all<T: Stored>(&self) -> Vec<T> {
        ChangeFilter::full().select(T::table(self).all_records())
    }

    /// Every record of one kind written at or after `since`, tombstones
    /// included, ordered by `(updatedDate, id)`.
    pub fn find_where<T: Stored>(&self, since: Timestamp) -> Vec<T> {
        ChangeFilter::written_since(since).select(T::table(self).all_records())
    }

    /// Run a pull: the same filter over all three kinds.
    pub fn select(&self, filter: &ChangeFilter) -> SyncBatch {
        SyncBatch {
            collections: self.find(filter),
            cards: self.find(filter),
            card_verses: self.find(filter),
        }
    }

    fn find<T: Stored>(&self, filter: &ChangeFilter) -> Vec<T> {
        match filter.cutoff() {
            None => self.find_all(),
            Some(since) => self.find_where(since),
        }
    }
}

/// Versions replaced during a push, in write order.
#[derive(Default)]
struct Undo {
    collections: Vec<(CollectionId, Option<Collection>)>,
    cards: Vec<(CardId, Option<Card>)>,
    card_verses: Vec<(CardVerseId, Option<CardVerse>)>,
}

impl Undo {
    fn rollback(self, store: &mut MemoryStore) {
        for (id, previous) in self.card_verses.into_iter().rev() {
            store.card_verses.restore(id, previous);
        }
        for (id, previous) in self.cards.into_iter().rev() {
            store.cards.restore(id, previous);
        }
        for (id, previous) in self.collections.into_iter().rev() {
            store.collections.restore(id, previous);
        }
    }
}
