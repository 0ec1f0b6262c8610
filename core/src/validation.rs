//! Payload validation for entries and search queries.
//!
//! Payloads arrive as untyped JSON so that every field can be checked
//! independently. Validation never stops at the first problem: the result is
//! either a canonical record with defaults applied or the full list of
//! violations found in the payload. Fields the schema does not name are
//! dropped.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entry::{
    EmotionalContext, EntryDraft, LinkedEntities, SearchMetadata, TemporalContext,
    LIGHTWEIGHT_EMBEDDING_DIM, MAX_BOOST_FACTOR, MAX_CONTENT_CHARS, MAX_CONTENT_TYPE_CHARS,
    MAX_EMOTION_LABEL_CHARS, MAX_LINKED_ENTITIES, MAX_LINKED_ENTITY_CHARS, MAX_TAGS,
    MAX_TAG_CHARS, MAX_TITLE_CHARS, PRIMARY_EMBEDDING_DIM,
};
use crate::ranking::{BoostOptions, DEFAULT_THRESHOLD};
use crate::store::SearchFilter;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 100;

// Longer strings are reported without echoing the value back.
const MAX_ECHOED_CHARS: usize = 200;

/// Target schema of a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Create,
    /// Full substitution; the mandatory set is identical to `Create`.
    Replace,
    SearchQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A non-empty, ordered list of violations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Returns true when some violation is reported against `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.field == field)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} violation(s)", self.violations.len())?;
        for (index, violation) in self.violations.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{} {}", violation.field, violation.reason)?;
        }
        Ok(())
    }
}

impl Error for ValidationFailure {}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query_embedding: Vec<f32>,
    pub filter: SearchFilter,
    pub limit: usize,
    pub threshold: f32,
    pub boost: BoostOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Entry(EntryDraft),
    SearchQuery(SearchQuery),
}

pub fn validate(payload: &Value, schema: Schema) -> Result<Validated, ValidationFailure> {
    match schema {
        Schema::Create | Schema::Replace => validate_entry(payload).map(Validated::Entry),
        Schema::SearchQuery => validate_search_query(payload).map(Validated::SearchQuery),
    }
}

/// Validates a create or replace payload.
pub fn validate_entry(payload: &Value) -> Result<EntryDraft, ValidationFailure> {
    let mut checker = Checker::default();
    let Some(object) = checker.root(payload) else {
        return checker.finish(None);
    };

    let owner = checker
        .required(object, "owner", "owner")
        .and_then(|value| checker.uuid("owner", value));
    let session_id = checker.optional(object, "session_id", |checker, value| {
        checker.uuid("session_id", value)
    });
    let content_type = checker
        .required(object, "content_type", "content_type")
        .and_then(|value| checker.text("content_type", value, MAX_CONTENT_TYPE_CHARS));
    let title = checker
        .required(object, "title", "title")
        .and_then(|value| checker.text("title", value, MAX_TITLE_CHARS));
    let content = checker
        .required(object, "content", "content")
        .and_then(|value| checker.text("content", value, MAX_CONTENT_CHARS));
    let primary_embedding = checker
        .required(object, "primary_embedding", "primary_embedding")
        .and_then(|value| checker.vector("primary_embedding", value, PRIMARY_EMBEDDING_DIM));
    let lightweight_embedding = checker.optional(object, "lightweight_embedding", |checker, value| {
        checker.vector("lightweight_embedding", value, LIGHTWEIGHT_EMBEDDING_DIM)
    });
    let tags = checker.optional(object, "tags", |checker, value| checker.tags("tags", value));
    let linked_entities = checker
        .required(object, "linked_entities", "linked_entities")
        .and_then(|value| checker.linked_entities(value));
    let emotional_context = checker.optional(object, "emotional_context", |checker, value| {
        checker.emotional_context(value)
    });
    let temporal_context = checker.optional(object, "temporal_context", |checker, value| {
        checker.temporal_context(value)
    });
    let search_metadata = checker.optional(object, "search_metadata", |checker, value| {
        checker.search_metadata(value)
    });

    if !checker.is_clean() {
        return checker.finish(None);
    }

    let draft = match (
        owner,
        content_type,
        title,
        content,
        primary_embedding,
        linked_entities,
    ) {
        (
            Some(owner),
            Some(content_type),
            Some(title),
            Some(content),
            Some(primary_embedding),
            Some(linked_entities),
        ) => Some(EntryDraft {
            owner,
            session_id: session_id.flatten(),
            content_type,
            title,
            content,
            primary_embedding,
            lightweight_embedding: lightweight_embedding.flatten(),
            tags: tags.flatten().unwrap_or_default(),
            linked_entities,
            emotional_context: emotional_context.flatten(),
            temporal_context: temporal_context.flatten(),
            search_metadata: search_metadata.flatten().unwrap_or_default(),
        }),
        _ => None,
    };
    checker.finish(draft)
}

pub fn validate_search_query(payload: &Value) -> Result<SearchQuery, ValidationFailure> {
    let mut checker = Checker::default();
    let Some(object) = checker.root(payload) else {
        return checker.finish(None);
    };

    let query_embedding = checker
        .required(object, "query_embedding", "query_embedding")
        .and_then(|value| checker.vector("query_embedding", value, PRIMARY_EMBEDDING_DIM));
    let owner = checker.optional(object, "owner", |checker, value| checker.uuid("owner", value));
    let content_type = checker.optional(object, "content_type", |checker, value| {
        checker.text("content_type", value, MAX_CONTENT_TYPE_CHARS)
    });
    let tags = checker.optional(object, "tags", |checker, value| checker.tags("tags", value));
    let limit = checker.optional(object, "limit", |checker, value| {
        checker.integer("limit", value, 1, MAX_SEARCH_LIMIT as i64)
    });
    let threshold = checker.optional(object, "threshold", |checker, value| {
        checker.bounded("threshold", value, 0.0, 1.0)
    });
    let boost_recent = checker.optional(object, "boost_recent", |checker, value| {
        checker.boolean("boost_recent", value)
    });
    let boost_preferences = checker.optional(object, "boost_preferences", |checker, value| {
        checker.boolean("boost_preferences", value)
    });

    if !checker.is_clean() {
        return checker.finish(None);
    }

    let query = query_embedding.map(|query_embedding| SearchQuery {
        query_embedding,
        filter: SearchFilter {
            owner: owner.flatten(),
            content_type: content_type.flatten(),
            tags: tags.flatten().unwrap_or_default(),
        },
        limit: limit
            .flatten()
            .map_or(DEFAULT_SEARCH_LIMIT, |limit| limit as usize),
        threshold: threshold.flatten().unwrap_or(DEFAULT_THRESHOLD),
        boost: BoostOptions {
            boost_recent: boost_recent.flatten().unwrap_or(false),
            boost_preferences: boost_preferences.flatten().unwrap_or(false),
        },
    });
    checker.finish(query)
}

/// Collects violations while extracting typed values. Every extractor
/// returns `None` after recording a violation, so callers keep going.
#[derive(Debug, Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationFailure> {
        match value {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ => {
                let mut violations = self.violations;
                if violations.is_empty() {
                    violations.push(Violation {
                        field: "$".to_string(),
                        reason: "payload could not be validated".to_string(),
                        value: None,
                    });
                }
                Err(ValidationFailure { violations })
            }
        }
    }

    fn report(&mut self, field: impl Into<String>, reason: impl Into<String>, value: Option<&Value>) {
        self.violations.push(Violation {
            field: field.into(),
            reason: reason.into(),
            value: value.and_then(echo),
        });
    }

    fn root<'v>(&mut self, payload: &'v Value) -> Option<&'v Map<String, Value>> {
        match payload {
            Value::Object(object) => Some(object),
            other => {
                self.report("$", "payload must be a JSON object", Some(other));
                None
            }
        }
    }

    fn required<'v>(
        &mut self,
        object: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v Value> {
        match object.get(key) {
            Some(Value::Null) | None => {
                self.report(path, "is required", None);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// Runs `extract` when `key` is present and non-null. The outer `Option`
    /// is `None` when the field was absent; the inner one is `None` when it
    /// was present but invalid.
    fn optional<T>(
        &mut self,
        object: &Map<String, Value>,
        key: &str,
        extract: impl FnOnce(&mut Self, &Value) -> Option<T>,
    ) -> Option<Option<T>> {
        match object.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(extract(self, value)),
        }
    }

    fn object<'v>(&mut self, path: &str, value: &'v Value) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(object) => Some(object),
            other => {
                self.report(path, "must be an object", Some(other));
                None
            }
        }
    }

    fn uuid(&mut self, path: &str, value: &Value) -> Option<Uuid> {
        let parsed = value.as_str().and_then(|raw| Uuid::parse_str(raw).ok());
        if parsed.is_none() {
            self.report(path, "must be a valid UUID", Some(value));
        }
        parsed
    }

    fn text(&mut self, path: &str, value: &Value, max_chars: usize) -> Option<String> {
        let Some(raw) = value.as_str() else {
            self.report(path, "must be a string", Some(value));
            return None;
        };
        if raw.trim().is_empty() {
            self.report(path, "must not be empty", Some(value));
            return None;
        }
        let chars = raw.chars().count();
        if chars > max_chars {
            self.report(
                path,
                format!("must be at most {max_chars} characters, got {chars}"),
                Some(value),
            );
            return None;
        }
        Some(raw.to_string())
    }

    fn vector(&mut self, path: &str, value: &Value, dimension: usize) -> Option<Vec<f32>> {
        let Some(items) = value.as_array() else {
            self.report(
                path,
                format!("must be an array of {dimension} numbers"),
                Some(value),
            );
            return None;
        };

        let mut valid = true;
        if items.len() != dimension {
            self.report(
                path,
                format!("expected {dimension} elements, got {}", items.len()),
                None,
            );
            valid = false;
        }

        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item.as_f64().map(|number| number as f32) {
                Some(number) if number.is_finite() => values.push(number),
                _ => {
                    self.report(
                        format!("{path}[{index}]"),
                        format!("must be a finite number (vector of {dimension} elements)"),
                        Some(item),
                    );
                    valid = false;
                }
            }
        }

        valid.then_some(values)
    }

    fn strings(
        &mut self,
        path: &str,
        value: &Value,
        max_items: usize,
        max_chars: usize,
    ) -> Option<Vec<String>> {
        let Some(items) = value.as_array() else {
            self.report(path, "must be an array of strings", Some(value));
            return None;
        };

        let mut valid = true;
        if items.len() > max_items {
            self.report(
                path,
                format!("must contain at most {max_items} entries, got {}", items.len()),
                None,
            );
            valid = false;
        }

        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.text(&format!("{path}[{index}]"), item, max_chars) {
                Some(text) => values.push(text),
                None => valid = false,
            }
        }

        valid.then_some(values)
    }

    fn tags(&mut self, path: &str, value: &Value) -> Option<Vec<String>> {
        self.strings(path, value, MAX_TAGS, MAX_TAG_CHARS)
    }

    fn bounded(&mut self, path: &str, value: &Value, min: f32, max: f32) -> Option<f32> {
        let Some(raw) = value.as_f64() else {
            self.report(path, "must be a number", Some(value));
            return None;
        };
        // Range check before narrowing so values just past a bound cannot
        // round onto it.
        if !(f64::from(min)..=f64::from(max)).contains(&raw) {
            self.report(
                path,
                format!("must be between {min} and {max} inclusive"),
                Some(value),
            );
            return None;
        }
        Some(raw as f32)
    }

    fn integer(&mut self, path: &str, value: &Value, min: i64, max: i64) -> Option<i64> {
        let number = match value {
            Value::Number(number) if number.is_i64() || number.is_u64() => number,
            other => {
                self.report(path, "must be an integer", Some(other));
                return None;
            }
        };
        let integer = number
            .as_i64()
            .filter(|integer| (min..=max).contains(integer));
        if integer.is_none() {
            self.report(
                path,
                format!("must be between {min} and {max} inclusive"),
                Some(value),
            );
        }
        integer
    }

    fn boolean(&mut self, path: &str, value: &Value) -> Option<bool> {
        let parsed = value.as_bool();
        if parsed.is_none() {
            self.report(path, "must be a boolean", Some(value));
        }
        parsed
    }

    fn linked_entities(&mut self, value: &Value) -> Option<LinkedEntities> {
        let object = self.object("linked_entities", value)?;

        let people = self.entity_list(object, "people");
        let locations = self.entity_list(object, "locations");
        let events = self.entity_list(object, "events");
        let topics = self.entity_list(object, "topics");

        Some(LinkedEntities {
            people: people?,
            locations: locations?,
            events: events?,
            topics: topics?,
        })
    }

    fn entity_list(&mut self, object: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
        let path = format!("linked_entities.{key}");
        let value = self.required(object, key, &path)?;
        self.strings(&path, value, MAX_LINKED_ENTITIES, MAX_LINKED_ENTITY_CHARS)
    }

    fn emotional_context(&mut self, value: &Value) -> Option<EmotionalContext> {
        let object = self.object("emotional_context", value)?;

        let primary_emotion = self.optional(object, "primary_emotion", |checker, value| {
            checker.text(
                "emotional_context.primary_emotion",
                value,
                MAX_EMOTION_LABEL_CHARS,
            )
        });
        let intensities = self.optional(object, "intensities", |checker, value| {
            let intensities = checker.object("emotional_context.intensities", value)?;
            let mut parsed = BTreeMap::new();
            let mut valid = true;
            for (label, intensity) in intensities {
                let path = format!("emotional_context.intensities.{label}");
                if label.trim().is_empty() || label.chars().count() > MAX_EMOTION_LABEL_CHARS {
                    checker.report(
                        &path,
                        format!("label must be 1 to {MAX_EMOTION_LABEL_CHARS} characters"),
                        None,
                    );
                    valid = false;
                    continue;
                }
                match checker.bounded(&path, intensity, 0.0, 1.0) {
                    Some(intensity) => {
                        parsed.insert(label.clone(), intensity);
                    }
                    None => valid = false,
                }
            }
            valid.then_some(parsed)
        });

        Some(EmotionalContext {
            primary_emotion: present_or_absent(primary_emotion)?,
            intensities: present_or_absent(intensities)?.unwrap_or_default(),
        })
    }

    fn temporal_context(&mut self, value: &Value) -> Option<TemporalContext> {
        let object = self.object("temporal_context", value)?;

        let hour_of_day = self
            .required(object, "hour_of_day", "temporal_context.hour_of_day")
            .and_then(|value| self.integer("temporal_context.hour_of_day", value, 0, 23));
        let day_of_week = self
            .required(object, "day_of_week", "temporal_context.day_of_week")
            .and_then(|value| self.integer("temporal_context.day_of_week", value, 0, 6));

        Some(TemporalContext {
            hour_of_day: u8::try_from(hour_of_day?).ok()?,
            day_of_week: u8::try_from(day_of_week?).ok()?,
        })
    }

    fn search_metadata(&mut self, value: &Value) -> Option<SearchMetadata> {
        let object = self.object("search_metadata", value)?;
        let defaults = SearchMetadata::default();

        let boost_factor =
            self.metadata_knob(object, "boost_factor", MAX_BOOST_FACTOR, defaults.boost_factor);
        let recency_weight =
            self.metadata_knob(object, "recency_weight", 1.0, defaults.recency_weight);
        let user_preference_alignment = self.metadata_knob(
            object,
            "user_preference_alignment",
            1.0,
            defaults.user_preference_alignment,
        );

        Some(SearchMetadata {
            boost_factor: boost_factor?,
            recency_weight: recency_weight?,
            user_preference_alignment: user_preference_alignment?,
        })
    }

    fn metadata_knob(
        &mut self,
        object: &Map<String, Value>,
        key: &str,
        max: f32,
        default: f32,
    ) -> Option<f32> {
        let path = format!("search_metadata.{key}");
        self.optional(object, key, |checker, value| {
            checker.bounded(&path, value, 0.0, max)
        })
        .unwrap_or(Some(default))
    }
}

/// Absent becomes `Some(None)`; present-but-invalid stays `None`.
fn present_or_absent<T>(field: Option<Option<T>>) -> Option<Option<T>> {
    match field {
        None => Some(None),
        Some(parsed) => parsed.map(Some),
    }
}

fn echo(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        Value::String(text) if text.chars().count() > MAX_ECHOED_CHARS => None,
        other => Some(other.clone()),
    }
}
