//! Record types for the three synced entity kinds.

use crate::error::{Error, Result};
use crate::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// The kinds of records the engine synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Collection,
    Card,
    CardVerse,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Collection => "collection",
            EntityKind::Card => "card",
            EntityKind::CardVerse => "card verse",
        };
        f.write_str(name)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Collection`].
    CollectionId
);
entity_id!(
    /// Identifier of a [`Card`].
    CardId
);
entity_id!(
    /// Identifier of a [`CardVerse`] link.
    CardVerseId
);

/// Bookkeeping timestamps shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// When the record was first created
    #[serde(default = "Utc::now", deserialize_with = "now_if_null")]
    pub created_date: Timestamp,
    /// Last successful write on the server; client values are overwritten
    #[serde(default = "Utc::now", deserialize_with = "now_if_null")]
    pub updated_date: Timestamp,
    /// Soft-delete marker (tombstone)
    #[serde(default, alias = "deleted_at")]
    pub deleted_at: Option<Timestamp>,
}

impl Metadata {
    /// Metadata for a record created at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            created_date: timestamp,
            updated_date: timestamp,
            deleted_at: None,
        }
    }

    /// Check if the record is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Clients may send `null` for a timestamp they never set.
fn now_if_null<'de, D>(deserializer: D) -> std::result::Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Timestamp>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

/// A reference from one record to another, checked at merge time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: EntityKind,
    pub id: String,
}

/// Behaviour shared by every synced record kind.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    type Id: Clone
        + fmt::Debug
        + Eq
        + Ord
        + Hash
        + fmt::Display
        + From<String>
        + AsRef<str>
        + Borrow<str>
        + Send
        + Sync;

    const KIND: EntityKind;

    fn id(&self) -> Option<&Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Check the record's own fields.
    fn validate(&self) -> Result<()>;

    /// The record this one points at, if any.
    fn reference(&self) -> Option<Reference> {
        None
    }

    /// Fill derived defaults once the metadata is final.
    fn normalize(&mut self) {}

    fn is_deleted(&self) -> bool {
        self.metadata().is_deleted()
    }
}

fn check_id(kind: EntityKind, id: Option<&impl AsRef<str>>) -> Result<()> {
    match id {
        Some(id) if id.as_ref().trim().is_empty() => {
            Err(Error::invalid(kind, "id must not be empty"))
        }
        _ => Ok(()),
    }
}

fn require(kind: EntityKind, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(kind, format!("{field} must not be empty")));
    }
    Ok(())
}

/// A named grouping of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CollectionId>,
    pub name: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Collection {
    pub fn new(name: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: None,
            name: name.into(),
            metadata: Metadata::new(timestamp),
        }
    }

    pub fn with_id(mut self, id: impl Into<CollectionId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Entity for Collection {
    type Id = CollectionId;

    const KIND: EntityKind = EntityKind::Collection;

    fn id(&self) -> Option<&CollectionId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: CollectionId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn validate(&self) -> Result<()> {
        check_id(Self::KIND, self.id.as_ref())?;
        require(Self::KIND, "name", &self.name)
    }
}

/// Default ease factor for a card that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

/// A flashcard with its spaced-repetition state.
///
/// The scheduling fields are computed by the client and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    #[serde(alias = "collection_id")]
    pub collection_id: CollectionId,
    #[serde(alias = "verse_id")]
    pub verse_id: String,
    /// Defaults to the creation date when absent
    #[serde(default, alias = "last_review_date")]
    pub last_review_date: Option<Timestamp>,
    #[serde(default = "default_ease_factor", alias = "ease_factor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub interval: i64,
    #[serde(default, alias = "repetition_number")]
    pub repetition_number: i64,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Card {
    pub fn new(
        collection_id: impl Into<CollectionId>,
        verse_id: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: None,
            collection_id: collection_id.into(),
            verse_id: verse_id.into(),
            last_review_date: None,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetition_number: 0,
            metadata: Metadata::new(timestamp),
        }
    }

    pub fn with_id(mut self, id: impl Into<CardId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replace the scheduling state.
    pub fn with_schedule(mut self, ease_factor: f64, interval: i64, repetition_number: i64) -> Self {
        self.ease_factor = ease_factor;
        self.interval = interval;
        self.repetition_number = repetition_number;
        self
    }
}

impl Entity for Card {
    type Id = CardId;

    const KIND: EntityKind = EntityKind::Card;

    fn id(&self) -> Option<&CardId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: CardId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn validate(&self) -> Result<()> {
        check_id(Self::KIND, self.id.as_ref())?;
        require(Self::KIND, "collectionId", self.collection_id.as_str())?;
        require(Self::KIND, "verseId", &self.verse_id)
    }

    fn reference(&self) -> Option<Reference> {
        Some(Reference {
            target: EntityKind::Collection,
            id: self.collection_id.to_string(),
        })
    }

    fn normalize(&mut self) {
        if self.last_review_date.is_none() {
            self.last_review_date = Some(self.metadata.created_date);
        }
    }
}

/// Links a card to the verse it currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardVerse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardVerseId>,
    #[serde(alias = "card_id")]
    pub card_id: CardId,
    #[serde(alias = "verse_id")]
    pub verse_id: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl CardVerse {
    pub fn new(
        card_id: impl Into<CardId>,
        verse_id: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: None,
            card_id: card_id.into(),
            verse_id: verse_id.into(),
            metadata: Metadata::new(timestamp),
        }
    }

    pub fn with_id(mut self, id: impl Into<CardVerseId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Entity for CardVerse {
    type Id = CardVerseId;

    const KIND: EntityKind = EntityKind::CardVerse;

    fn id(&self) -> Option<&CardVerseId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: CardVerseId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn validate(&self) -> Result<()> {
        check_id(Self::KIND, self.id.as_ref())?;
        require(Self::KIND, "cardId", self.card_id.as_str())?;
        require(Self::KIND, "verseId", &self.verse_id)
    }

    fn reference(&self) -> Option<Reference> {
        Some(Reference {
            target: EntityKind::Card,
            id: self.card_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
    }

    #[test]
    fn card_defaults_from_minimal_json() {
        let card: Card = serde_json::from_value(json!({
            "collectionId": "col-1",
            "verseId": "PSA.23.1"
        }))
        .unwrap();

        assert!(card.id.is_none());
        assert_eq!(card.ease_factor, 2.5);
        assert_eq!(card.interval, 0);
        assert_eq!(card.repetition_number, 0);
        assert!(card.last_review_date.is_none());
        assert!(card.metadata.deleted_at.is_none());
    }

    #[test]
    fn legacy_snake_case_fields_accepted() {
        let card: Card = serde_json::from_value(json!({
            "id": "card-1",
            "collection_id": "col-1",
            "verse_id": "PSA.23.1",
            "ease_factor": 1.3,
            "interval": 6,
            "repetition_number": 2,
            "createdDate": "2024-03-01T09:30:00Z",
            "deleted_at": null
        }))
        .unwrap();

        assert_eq!(card.id, Some(CardId::new("card-1")));
        assert_eq!(card.collection_id.as_str(), "col-1");
        assert_eq!(card.ease_factor, 1.3);
        assert_eq!(card.interval, 6);
        assert_eq!(card.repetition_number, 2);
        assert_eq!(card.metadata.created_date, at(1));
    }

    #[test]
    fn serialization_format() {
        let collection = Collection::new("Psalms", at(1)).with_id("col-1");
        let value = serde_json::to_value(&collection).unwrap();

        assert_eq!(value["id"], "col-1");
        assert_eq!(value["name"], "Psalms");
        assert!(value.get("createdDate").is_some());
        assert!(value.get("updatedDate").is_some());
        assert_eq!(value["deletedAt"], serde_json::Value::Null);
    }

    #[test]
    fn normalize_fills_last_review_date() {
        let mut card = Card::new("col-1", "PSA.23.1", at(2));
        card.normalize();
        assert_eq!(card.last_review_date, Some(at(2)));

        let mut reviewed = Card::new("col-1", "PSA.23.1", at(2));
        reviewed.last_review_date = Some(at(5));
        reviewed.normalize();
        assert_eq!(reviewed.last_review_date, Some(at(5)));
    }

    #[test]
    fn validation() {
        assert!(Collection::new("Psalms", at(1)).validate().is_ok());
        assert!(Collection::new("   ", at(1)).validate().is_err());
        assert!(Collection::new("Psalms", at(1)).with_id("").validate().is_err());

        assert!(Card::new("col-1", "PSA.23.1", at(1)).validate().is_ok());
        assert!(Card::new("", "PSA.23.1", at(1)).validate().is_err());
        assert!(Card::new("col-1", "", at(1)).validate().is_err());

        assert!(CardVerse::new("card-1", "PSA.23.2", at(1)).validate().is_ok());
        assert!(CardVerse::new("", "PSA.23.2", at(1)).validate().is_err());
    }

    #[test]
    fn references() {
        let card = Card::new("col-1", "PSA.23.1", at(1));
        assert_eq!(
            card.reference(),
            Some(Reference {
                target: EntityKind::Collection,
                id: "col-1".into()
            })
        );

        let link = CardVerse::new("card-1", "PSA.23.2", at(1));
        assert_eq!(link.reference().unwrap().target, EntityKind::Card);

        assert!(Collection::new("Psalms", at(1)).reference().is_none());
    }
}
