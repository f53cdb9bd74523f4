//! # Events Module
//!
//! Company event announcements.

use crate::storage::{Document, Store};
use crate::validate::{Required, clean};
use crate::{HrError, HrResult};
use chrono::{DateTime, NaiveDate, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub location: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Event {
    const KIND: &'static str = "event";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("events");

    fn key(&self) -> &str {
        &self.id
    }
}

impl Event {
    /// Last day the event runs.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.ends_on.unwrap_or(self.starts_on)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub location: Option<String>,
}

fn check_dates(starts_on: NaiveDate, ends_on: Option<NaiveDate>) -> HrResult<()> {
    if ends_on.is_some_and(|end| end < starts_on) {
        return Err(HrError::Validation(
            "Event cannot end before it starts".into(),
        ));
    }
    Ok(())
}

pub fn create(
    store: &Store,
    draft: NewEvent,
    created_by: &str,
    now: DateTime<Utc>,
) -> HrResult<Event> {
    let mut req = Required::default();
    let title = req.text("title", draft.title);
    let starts_on = req.value("starts_on", draft.starts_on);
    req.finish()?;
    check_dates(starts_on, draft.ends_on)?;

    let event = Event {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        description: clean(draft.description),
        starts_on,
        ends_on: draft.ends_on,
        location: clean(draft.location),
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    };
    store.write(|tx| tx.put(&event))?;
    Ok(event)
}

pub fn get(store: &Store, id: &str) -> HrResult<Event> {
    store.require(id)
}

/// Events by start date. With `upcoming_from`, only those still running on
/// or after that day.
pub fn list(store: &Store, upcoming_from: Option<NaiveDate>) -> HrResult<Vec<Event>> {
    let mut events: Vec<Event> = store
        .all::<Event>()?
        .into_iter()
        .filter(|e| upcoming_from.is_none_or(|today| e.last_day() >= today))
        .collect();
    events.sort_by(|a, b| a.starts_on.cmp(&b.starts_on).then_with(|| a.title.cmp(&b.title)));
    Ok(events)
}

pub fn update(store: &Store, id: &str, patch: EventPatch, now: DateTime<Utc>) -> HrResult<Event> {
    store.write(|tx| {
        let mut event: Event = tx.require(id)?;
        if let Some(title) = patch.title {
            event.title = clean(Some(title))
                .ok_or_else(|| HrError::Validation("Event title cannot be blank".into()))?;
        }
        if patch.description.is_some() {
            event.description = clean(patch.description);
        }
        if let Some(starts_on) = patch.starts_on {
            event.starts_on = starts_on;
        }
        if patch.ends_on.is_some() {
            event.ends_on = patch.ends_on;
        }
        if patch.location.is_some() {
            event.location = clean(patch.location);
        }
        check_dates(event.starts_on, event.ends_on)?;
        event.updated_at = now;
        tx.put(&event)?;
        Ok(event)
    })
}

pub fn delete(store: &Store, id: &str) -> HrResult<Event> {
    store.write(|tx| {
        let event: Event = tx.require(id)?;
        tx.delete::<Event>(id)?;
        Ok(event)
    })
}
