//! CRUD orchestration over an [`EventStore`].
//!
//! Identity is immutable once assigned: `update` ignores any uid in the patch and
//! `duplicate` always mints a fresh one. Lookups of unknown uids are an ordinary
//! outcome and come back as `None`/`false`/`0` rather than errors.

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::event::{Event, EventInput, PRIORITY_RANGE};
use crate::store::EventStore;

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check an input for a title, a start, parseable timestamps, `end >= start`, and
/// a priority in 1..=9.
pub fn validate(input: &EventInput) -> ValidationResult {
    let mut errors = Vec::new();

    if input.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        errors.push("title is required".to_string());
    }

    let start = match &input.start {
        None => {
            errors.push("start is required".to_string());
            None
        }
        Some(start) => match start.resolve() {
            Ok((at, _, _)) => Some(at),
            Err(e) => {
                errors.push(format!("start is not a valid timestamp: {e}"));
                None
            }
        },
    };

    let end = match &input.end {
        Some(Some(end)) => match end.resolve() {
            Ok((at, _, _)) => Some(at),
            Err(e) => {
                errors.push(format!("end is not a valid timestamp: {e}"));
                None
            }
        },
        _ => None,
    };

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.push("end must not be before start".to_string());
        }
    }

    if let Some(priority) = input.priority.filter(|p| !PRIORITY_RANGE.contains(p)) {
        errors.push(format!("priority must be between 1 and 9, got {priority}"));
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventManager {
    store: EventStore,
    config: EngineConfig,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: EventStore::new(),
            config,
        }
    }

    pub fn from_store(store: EventStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        self.store.as_slice()
    }

    pub fn get(&self, uid: &str) -> Option<&Event> {
        self.store.get(uid)
    }

    /// Like [`get`](Self::get) but with a `NotFound` error for callers that want one.
    pub fn require(&self, uid: &str) -> Result<&Event> {
        self.store
            .get(uid)
            .ok_or_else(|| EngineError::NotFound(uid.to_string()))
    }

    /// Bulk insert of already-normalized events (e.g. from an adapter).
    pub fn import(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        self.store.insert(events)
    }

    /// `<millis>-<random>@<uid_domain>`.
    pub fn generate_uid(&self) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}@{}",
            Utc::now().timestamp_millis(),
            &random[..9],
            self.config.uid_domain
        )
    }

    /// Validate `input`, assign a uid if it has none, and store the event.
    ///
    /// # Errors
    /// `EngineError::Validation` when [`validate`] fails or an explicit uid is
    /// already taken.
    pub fn create(&mut self, input: EventInput) -> Result<Event> {
        let report = validate(&input);
        if !report.valid {
            return Err(EngineError::Validation(report.errors.join("; ")));
        }

        let uid = match input.uid.as_deref().map(str::trim) {
            Some(uid) if !uid.is_empty() => {
                if self.store.get(uid).is_some() {
                    return Err(EngineError::Validation(format!("uid already exists: {uid}")));
                }
                uid.to_string()
            }
            _ => self.generate_uid(),
        };

        let mut event = Event::new(uid, String::new(), NaiveDateTime::MIN);
        input.apply_to(&mut event)?;
        debug!(uid = %event.uid, "event created");
        self.store.insert([event.clone()]);
        Ok(event)
    }

    /// Merge `patch` over the stored event. `Ok(None)` when the uid is unknown.
    ///
    /// # Errors
    /// `EngineError::Format` when a timestamp in the patch cannot be parsed; the
    /// stored event is left unchanged in that case.
    pub fn update(&mut self, uid: &str, patch: &EventInput) -> Result<Option<Event>> {
        let Some(event) = self.store.get_mut(uid) else {
            return Ok(None);
        };
        let mut updated = event.clone();
        patch.apply_to(&mut updated)?;
        *event = updated.clone();
        Ok(Some(updated))
    }

    pub fn delete(&mut self, uid: &str) -> bool {
        self.store.remove(uid)
    }

    pub fn delete_many(&mut self, uids: &[&str]) -> usize {
        self.store.remove_many(uids)
    }

    /// Clone an event under a fresh uid, apply `overrides`, and store the copy.
    pub fn duplicate(&mut self, uid: &str, overrides: &EventInput) -> Result<Option<Event>> {
        let Some(source) = self.store.get(uid) else {
            return Ok(None);
        };
        let mut copy = source.clone();
        copy.uid = self.generate_uid();
        overrides.apply_to(&mut copy)?;
        self.store.insert([copy.clone()]);
        Ok(Some(copy))
    }

    /// Shift an event to `new_start`.
    ///
    /// With `keep_duration` and an existing end, the end moves by the same amount;
    /// otherwise the end is cleared.
    pub fn move_event(
        &mut self,
        uid: &str,
        new_start: NaiveDateTime,
        keep_duration: bool,
    ) -> Option<Event> {
        let event = self.store.get_mut(uid)?;
        let duration: Option<Duration> = event.duration();
        event.start = new_start;
        event.end = match (keep_duration, duration) {
            (true, Some(d)) => Some(new_start + d),
            _ => None,
        };
        Some(event.clone())
    }
}
