use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EntryId = Uuid;

/// Required length of `primary_embedding`.
pub const PRIMARY_EMBEDDING_DIM: usize = 768;
/// Required length of `lightweight_embedding` when one is supplied.
pub const LIGHTWEIGHT_EMBEDDING_DIM: usize = 384;

pub const MAX_TITLE_CHARS: usize = 1000;
pub const MAX_CONTENT_CHARS: usize = 50_000;
pub const MAX_CONTENT_TYPE_CHARS: usize = 100;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_CHARS: usize = 100;
pub const MAX_LINKED_ENTITIES: usize = 100;
pub const MAX_LINKED_ENTITY_CHARS: usize = 200;
pub const MAX_EMOTION_LABEL_CHARS: usize = 50;

/// Inclusive upper bound of `SearchMetadata::boost_factor`.
pub const MAX_BOOST_FACTOR: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub owner: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub primary_embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightweight_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub linked_entities: LinkedEntities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_context: Option<EmotionalContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_context: Option<TemporalContext>,
    #[serde(default)]
    pub search_metadata: SearchMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Materializes a validated draft into a stored record.
    pub fn from_draft(id: EntryId, draft: EntryDraft, now: DateTime<Utc>) -> Self {
        Self::with_timestamps(id, draft, now, now)
    }

    /// Builds the record that fully replaces `self`: every field comes from
    /// `draft` except the identity and the creation time.
    pub fn replaced_by(&self, draft: EntryDraft, now: DateTime<Utc>) -> Self {
        Self::with_timestamps(self.id, draft, self.created_at, now.max(self.created_at))
    }

    fn with_timestamps(
        id: EntryId,
        draft: EntryDraft,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let EntryDraft {
            owner,
            session_id,
            content_type,
            title,
            content,
            primary_embedding,
            lightweight_embedding,
            tags,
            linked_entities,
            emotional_context,
            temporal_context,
            search_metadata,
        } = draft;

        Self {
            id,
            owner,
            session_id,
            content_type,
            title,
            content,
            primary_embedding,
            lightweight_embedding,
            tags,
            linked_entities,
            emotional_context,
            temporal_context,
            search_metadata,
            created_at,
            updated_at,
        }
    }
}

/// Canonical, validated entry body without server-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub owner: Uuid,
    pub session_id: Option<Uuid>,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub primary_embedding: Vec<f32>,
    pub lightweight_embedding: Option<Vec<f32>>,
    pub tags: Vec<String>,
    pub linked_entities: LinkedEntities,
    pub emotional_context: Option<EmotionalContext>,
    pub temporal_context: Option<TemporalContext>,
    pub search_metadata: SearchMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEntities {
    pub people: Vec<String>,
    pub locations: Vec<String>,
    pub events: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_emotion: Option<String>,
    #[serde(default)]
    pub intensities: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub hour_of_day: u8,
    pub day_of_week: u8,
}

/// Secondary ranking signals carried by every entry.
///
/// `Default` is the single source of default values for both validation and
/// ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    #[serde(default = "default_boost_factor")]
    pub boost_factor: f32,
    #[serde(default = "default_weight")]
    pub recency_weight: f32,
    #[serde(default = "default_weight")]
    pub user_preference_alignment: f32,
}

const DEFAULT_BOOST_FACTOR: f32 = 1.0;
const DEFAULT_WEIGHT: f32 = 0.5;

fn default_boost_factor() -> f32 {
    DEFAULT_BOOST_FACTOR
}

fn default_weight() -> f32 {
    DEFAULT_WEIGHT
}

impl Default for SearchMetadata {
    fn default() -> Self {
        Self {
            boost_factor: DEFAULT_BOOST_FACTOR,
            recency_weight: DEFAULT_WEIGHT,
            user_preference_alignment: DEFAULT_WEIGHT,
        }
    }
}
