//! # Attendance Module
//!
//! Daily attendance records.
//!
//! A record is keyed `"{employee_id}:{date}"`, so there is at most one per
//! employee per day. Employees create records by checking in and out;
//! administrators can record, correct or remove any record.

use crate::directory::User;
use crate::leave;
use crate::storage::{Document, Store};
use crate::validate::{Required, clean};
use crate::{HrError, HrResult};
use chrono::{DateTime, NaiveDate, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    HalfDay,
    OnLeave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for AttendanceRecord {
    const KIND: &'static str = "attendance record";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("attendance");

    fn key(&self) -> &str {
        &self.id
    }
}

impl AttendanceRecord {
    /// Minutes between check-in and check-out, when both are present.
    #[must_use]
    pub fn worked_minutes(&self) -> Option<i64> {
        match (self.check_in, self.check_out) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }
}

/// Client-facing record: the stored fields plus worked minutes.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub worked_minutes: Option<i64>,
}

impl From<AttendanceRecord> for AttendanceView {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            worked_minutes: record.worked_minutes(),
            record,
        }
    }
}

/// Record key for one employee on one day.
#[must_use]
pub fn record_id(employee_id: &str, date: NaiveDate) -> String {
    format!("{employee_id}:{date}")
}

/// Administrator-entered record. Replaces any record for the same day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualRecord {
    pub employee_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<AttendanceStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendancePatch {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<AttendanceStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFilter {
    pub employee: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn check_times(check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> HrResult<()> {
    match (check_in, check_out) {
        (Some(start), Some(end)) if end < start => Err(HrError::Validation(
            "Check-out cannot be earlier than check-in".into(),
        )),
        (None, Some(_)) => Err(HrError::Validation(
            "Check-out requires a check-in".into(),
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// SELF SERVICE
// =============================================================================

pub fn check_in(store: &Store, employee_id: &str, now: DateTime<Utc>) -> HrResult<AttendanceRecord> {
    let today = now.date_naive();
    let id = record_id(employee_id, today);
    store.write(|tx| {
        tx.require::<User>(employee_id)?;
        if let Some(on_leave) = leave::approved_on(tx, employee_id, today)? {
            return Err(HrError::Conflict(format!(
                "You are on approved leave today ({})",
                on_leave.id
            )));
        }
        if tx
            .get::<AttendanceRecord>(&id)?
            .is_some_and(|existing| existing.check_in.is_some())
        {
            return Err(HrError::Conflict("Already checked in today".into()));
        }
        let record = AttendanceRecord {
            id: id.clone(),
            employee_id: employee_id.to_string(),
            date: today,
            check_in: Some(now),
            check_out: None,
            status: AttendanceStatus::Present,
            note: None,
            created_at: now,
            updated_at: now,
        };
        tx.put(&record)?;
        Ok(record)
    })
}

pub fn check_out(store: &Store, employee_id: &str, now: DateTime<Utc>) -> HrResult<AttendanceRecord> {
    let id = record_id(employee_id, now.date_naive());
    store.write(|tx| {
        let mut record = match tx.get::<AttendanceRecord>(&id)? {
            Some(record) if record.check_in.is_some() => record,
            _ => return Err(HrError::Conflict("You have not checked in today".into())),
        };
        if record.check_out.is_some() {
            return Err(HrError::Conflict("Already checked out today".into()));
        }
        record.check_out = Some(now);
        record.updated_at = now;
        tx.put(&record)?;
        Ok(record)
    })
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

pub fn record(store: &Store, manual: ManualRecord, now: DateTime<Utc>) -> HrResult<AttendanceRecord> {
    let mut req = Required::default();
    let employee_id = req.text("employee_id", manual.employee_id);
    let date = req.value("date", manual.date);
    let status = req.value("status", manual.status);
    req.finish()?;
    check_times(manual.check_in, manual.check_out)?;

    store.write(|tx| {
        tx.require::<User>(&employee_id)?;
        let id = record_id(&employee_id, date);
        let created_at = tx
            .get::<AttendanceRecord>(&id)?
            .map(|r| r.created_at)
            .unwrap_or(now);
        let record = AttendanceRecord {
            id,
            employee_id,
            date,
            check_in: manual.check_in,
            check_out: manual.check_out,
            status,
            note: clean(manual.note),
            created_at,
            updated_at: now,
        };
        tx.put(&record)?;
        Ok(record)
    })
}

pub fn update(
    store: &Store,
    id: &str,
    patch: AttendancePatch,
    now: DateTime<Utc>,
) -> HrResult<AttendanceRecord> {
    store.write(|tx| {
        let mut record: AttendanceRecord = tx.require(id)?;
        if patch.check_in.is_some() {
            record.check_in = patch.check_in;
        }
        if patch.check_out.is_some() {
            record.check_out = patch.check_out;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        if patch.note.is_some() {
            record.note = clean(patch.note);
        }
        check_times(record.check_in, record.check_out)?;
        record.updated_at = now;
        tx.put(&record)?;
        Ok(record)
    })
}

pub fn delete(store: &Store, id: &str) -> HrResult<AttendanceRecord> {
    store.write(|tx| {
        let record: AttendanceRecord = tx.require(id)?;
        tx.delete::<AttendanceRecord>(id)?;
        Ok(record)
    })
}

pub fn get(store: &Store, id: &str) -> HrResult<AttendanceRecord> {
    store.require(id)
}

/// Records matching `filter`, ordered by date then employee.
pub fn list(store: &Store, filter: &AttendanceFilter) -> HrResult<Vec<AttendanceRecord>> {
    let mut records: Vec<AttendanceRecord> = store
        .all::<AttendanceRecord>()?
        .into_iter()
        .filter(|r| {
            filter.employee.as_deref().is_none_or(|e| r.employee_id == e)
                && filter.from.is_none_or(|from| r.date >= from)
                && filter.to.is_none_or(|to| r.date <= to)
        })
        .collect();
    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.employee_id.cmp(&b.employee_id)));
    Ok(records)
}

// =============================================================================
// TESTS
// =============================================================================
