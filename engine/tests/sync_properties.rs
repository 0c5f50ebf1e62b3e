//! Property tests for push/pull consistency.

use chrono::{DateTime, Duration, TimeZone, Utc};
use memverse_engine::{
    Card, CardVerse, ChangeFilter, Collection, ConflictResolver, Cutoff, Entity, MemoryStore,
    ReferencePolicy, SyncBatch,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 6, 0, 0).unwrap()
}

/// Which kind of record a step writes.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Collection,
    Card,
    CardVerse,
}

/// One client edit: which slot, which kind, the card interval, and whether
/// it tombstones the record.
type Step = (usize, Kind, i64, bool);

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Collection), Just(Kind::Card), Just(Kind::CardVerse)]
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec((0usize..4, arb_kind(), 0i64..60, any::<bool>()), 1..40)
}

fn step_batch(step: &Step, now: DateTime<Utc>) -> SyncBatch {
    let (slot, kind, interval, delete) = *step;
    let deleted_at = delete.then_some(now);
    match kind {
        Kind::Collection => {
            let mut collection =
                Collection::new(format!("Book {slot}"), base()).with_id(format!("col-{slot}"));
            collection.metadata.deleted_at = deleted_at;
            SyncBatch::new().with_collection(collection)
        }
        Kind::Card => {
            let mut card = Card::new(format!("col-{slot}"), format!("PSA.{slot}.1"), base())
                .with_id(format!("card-{slot}"))
                .with_schedule(2.5, interval, interval / 3);
            card.metadata.deleted_at = deleted_at;
            SyncBatch::new().with_card(card)
        }
        Kind::CardVerse => {
            let verse = format!("PSA.{slot}.{interval}");
            let mut link =
                CardVerse::new(format!("card-{slot}"), verse, base()).with_id(format!("link-{slot}"));
            link.metadata.deleted_at = deleted_at;
            SyncBatch::new().with_card_verse(link)
        }
    }
}

/// A client's local copy, keyed by identity.
#[derive(Debug, Default, PartialEq)]
struct Replica {
    collections: BTreeMap<String, Collection>,
    cards: BTreeMap<String, Card>,
    card_verses: BTreeMap<String, CardVerse>,
}

impl Replica {
    fn apply(&mut self, batch: SyncBatch) {
        absorb(&mut self.collections, batch.collections);
        absorb(&mut self.cards, batch.cards);
        absorb(&mut self.card_verses, batch.card_verses);
    }
}

fn absorb<T: Entity>(local: &mut BTreeMap<String, T>, records: Vec<T>) {
    for record in records {
        let id = record.id().map(|id| id.to_string()).unwrap_or_default();
        if record.is_deleted() {
            local.remove(&id);
        } else {
            local.insert(id, record);
        }
    }
}

fn without_write_times(mut batch: SyncBatch) -> SyncBatch {
    for c in &mut batch.collections {
        c.metadata.updated_date = base();
    }
    for c in &mut batch.cards {
        c.metadata.updated_date = base();
    }
    for c in &mut batch.card_verses {
        c.metadata.updated_date = base();
    }
    batch
}

proptest! {
    #[test]
    fn prop_incremental_pull_matches_full_snapshot(
        steps in arb_steps(),
        snapshot_at in 0usize..40,
    ) {
        let lenient = |now| ConflictResolver::new(ReferencePolicy::Lenient, now);
        let snapshot_at = snapshot_at % steps.len();

        let mut store = MemoryStore::new();
        let mut replica = Replica::default();
        let mut synced_at = base();

        for (i, step) in steps.iter().enumerate() {
            let now = base() + Duration::hours(5 * i as i64);
            store.apply(step_batch(step, now), &lenient(now)).unwrap();

            if i == snapshot_at {
                replica.apply(store.select(&ChangeFilter::full()));
                synced_at = now;
            }
        }

        let delta = store.select(&ChangeFilter::since(Cutoff::containing(synced_at)));
        replica.apply(delta);

        let mut fresh = Replica::default();
        fresh.apply(store.select(&ChangeFilter::full()));
        prop_assert_eq!(replica, fresh);
    }

    #[test]
    fn prop_push_is_idempotent(steps in arb_steps()) {
        let mut store = MemoryStore::new();
        let now = base();
        let lenient = ConflictResolver::new(ReferencePolicy::Lenient, now);

        let mut batch = SyncBatch::new();
        for step in &steps {
            let next = step_batch(step, now);
            batch.collections.extend(next.collections);
            batch.cards.extend(next.cards);
            batch.card_verses.extend(next.card_verses);
        }

        store.apply(batch.clone(), &lenient).unwrap();
        let once = without_write_times(store.select(&ChangeFilter::full()));

        let later = ConflictResolver::new(ReferencePolicy::Lenient, now + Duration::days(3));
        store.apply(batch, &later).unwrap();
        let twice = without_write_times(store.select(&ChangeFilter::full()));

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_cutoff_selects_exactly_records_on_or_after_day(
        days in prop::collection::vec(0i64..20, 1..20),
        cutoff_day in 0i64..20,
    ) {
        let mut store = MemoryStore::new();
        for (i, day) in days.iter().enumerate() {
            let now = base() + Duration::days(*day);
            let collection = Collection::new(format!("Book {i}"), now).with_id(format!("c{i}"));
            store
                .upsert(collection, &ConflictResolver::new(ReferencePolicy::Strict, now))
                .unwrap();
        }

        let cutoff = Cutoff::containing(base() + Duration::days(cutoff_day));
        let selected = store.select(&ChangeFilter::since(cutoff));
        let expected = days.iter().filter(|d| **d >= cutoff_day).count();
        prop_assert_eq!(selected.collections.len(), expected);
    }
}
