//! Transport envelope for push and pull.

use crate::{Card, CardVerse, Collection};
use serde::{Deserialize, Deserializer, Serialize};

/// Zero or more records of each kind, exchanged in a single push or pull.
///
/// Not persisted. Lists missing from an incoming body, or sent as `null`,
/// are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub collections: Vec<Collection>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cards: Vec<Card>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub card_verses: Vec<CardVerse>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SyncBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn with_card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    pub fn with_card_verse(mut self, card_verse: CardVerse) -> Self {
        self.card_verses.push(card_verse);
        self
    }

    /// Check if all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.cards.is_empty() && self.card_verses.is_empty()
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.collections.len() + self.cards.len() + self.card_verses.len()
    }
}

/// Number of records written per kind by a push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSummary {
    pub collections: usize,
    pub cards: usize,
    pub card_verses: usize,
}

impl PushSummary {
    pub fn total(&self) -> usize {
        self.collections + self.cards + self.card_verses
    }
}
