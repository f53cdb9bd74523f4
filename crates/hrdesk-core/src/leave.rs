//! # Leave Module
//!
//! Leave applications and their approval workflow.
//!
//! ```text
//!            decide(approved)
//!          ┌──────────────────► Approved
//! Pending ─┼──────────────────► Rejected
//!          │  decide(rejected)
//!          └──────────────────► Cancelled
//!               cancel (owner)
//! ```
//!
//! Only `Pending` applications can be edited or change state. An employee
//! cannot hold two pending/approved applications with overlapping dates.

use crate::directory::User;
use crate::sequence::Sequence;
use crate::storage::{Document, Store, WriteTx};
use crate::validate::{Required, clean};
use crate::{HrError, HrResult};
use chrono::{DateTime, NaiveDate, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    #[default]
    Casual,
    Sick,
    Annual,
    Unpaid,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an application in this state blocks its dates.
    #[must_use]
    pub const fn holds_dates(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

/// Outcome recorded when an administrator decides an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer_id: String,
    pub remark: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub id: String,
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub review: Option<Review>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Leave {
    const KIND: &'static str = "leave application";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("leaves");

    fn key(&self) -> &str {
        &self.id
    }
}

impl Leave {
    /// Calendar days covered, both ends inclusive.
    #[must_use]
    pub fn days(&self) -> i64 {
        span_days(self.from, self.to)
    }

    #[must_use]
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }

    fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.from <= to && from <= self.to
    }
}

/// Client-facing application: the stored fields plus the day count.
#[derive(Debug, Clone, Serialize)]
pub struct LeaveView {
    #[serde(flatten)]
    pub leave: Leave,
    pub days: i64,
}

impl From<Leave> for LeaveView {
    fn from(leave: Leave) -> Self {
        Self {
            days: leave.days(),
            leave,
        }
    }
}

/// Inclusive day count between two dates.
#[must_use]
pub fn span_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().saturating_add(1)
}

/// Body of a leave application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLeave {
    pub leave_type: Option<LeaveType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Owner edit of a pending application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeavePatch {
    pub leave_type: Option<LeaveType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Administrator decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Decision {
    pub status: Option<LeaveStatus>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveFilter {
    pub employee: Option<String>,
    pub status: Option<LeaveStatus>,
}

// =============================================================================
// RULES
// =============================================================================

fn check_range(from: NaiveDate, to: NaiveDate) -> HrResult<()> {
    if to < from {
        return Err(HrError::Validation(
            "Leave end date cannot be before its start date".into(),
        ));
    }
    Ok(())
}

fn ensure_no_overlap(
    tx: &WriteTx,
    employee_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    except: Option<&str>,
) -> HrResult<()> {
    let clash = tx.all::<Leave>()?.into_iter().find(|l| {
        l.employee_id == employee_id
            && l.status.holds_dates()
            && Some(l.id.as_str()) != except
            && l.overlaps(from, to)
    });
    match clash {
        Some(other) => Err(HrError::Conflict(format!(
            "Dates overlap with leave application {} ({} to {})",
            other.id, other.from, other.to
        ))),
        None => Ok(()),
    }
}

fn ensure_pending(leave: &Leave) -> HrResult<()> {
    if leave.status != LeaveStatus::Pending {
        return Err(HrError::Conflict(format!(
            "Leave application {} is already {}",
            leave.id,
            leave.status.as_str()
        )));
    }
    Ok(())
}

fn ensure_owner(leave: &Leave, employee_id: &str) -> HrResult<()> {
    if leave.employee_id != employee_id {
        return Err(HrError::Forbidden(
            "You can only modify your own leave applications".into(),
        ));
    }
    Ok(())
}

// =============================================================================
// OPERATIONS
// =============================================================================

pub fn apply(
    store: &Store,
    employee_id: &str,
    draft: NewLeave,
    now: DateTime<Utc>,
) -> HrResult<Leave> {
    let mut req = Required::default();
    let leave_type = req.value("leave_type", draft.leave_type);
    let from = req.value("from", draft.from);
    let to = req.value("to", draft.to);
    let reason = req.text("reason", draft.reason);
    req.finish()?;
    check_range(from, to)?;

    store.write(|tx| {
        tx.require::<User>(employee_id)?;
        ensure_no_overlap(tx, employee_id, from, to, None)?;
        let leave = Leave {
            id: Sequence::Leave.next(tx)?,
            employee_id: employee_id.to_string(),
            leave_type,
            from,
            to,
            reason,
            status: LeaveStatus::Pending,
            review: None,
            applied_at: now,
            updated_at: now,
        };
        tx.put(&leave)?;
        Ok(leave)
    })
}

pub fn get(store: &Store, id: &str) -> HrResult<Leave> {
    store.require(id)
}

/// Applications matching `filter`, newest first.
pub fn list(store: &Store, filter: &LeaveFilter) -> HrResult<Vec<Leave>> {
    let mut leaves: Vec<Leave> = store
        .all::<Leave>()?
        .into_iter()
        .filter(|l| {
            filter.employee.as_deref().is_none_or(|e| l.employee_id == e)
                && filter.status.is_none_or(|s| l.status == s)
        })
        .collect();
    leaves.sort_by(|a, b| {
        b.applied_at
            .cmp(&a.applied_at)
            .then_with(|| Sequence::Leave.compare(&b.id, &a.id))
    });
    Ok(leaves)
}

/// Owner edit while the application is pending.
pub fn update(
    store: &Store,
    id: &str,
    employee_id: &str,
    patch: LeavePatch,
    now: DateTime<Utc>,
) -> HrResult<Leave> {
    store.write(|tx| {
        let mut leave: Leave = tx.require(id)?;
        ensure_owner(&leave, employee_id)?;
        ensure_pending(&leave)?;

        if let Some(kind) = patch.leave_type {
            leave.leave_type = kind;
        }
        leave.from = patch.from.unwrap_or(leave.from);
        leave.to = patch.to.unwrap_or(leave.to);
        if let Some(reason) = patch.reason {
            leave.reason = clean(Some(reason))
                .ok_or_else(|| HrError::Validation("Reason cannot be blank".into()))?;
        }
        check_range(leave.from, leave.to)?;
        ensure_no_overlap(tx, employee_id, leave.from, leave.to, Some(id))?;

        leave.updated_at = now;
        tx.put(&leave)?;
        Ok(leave)
    })
}

/// Approve or reject a pending application.
pub fn decide(
    store: &Store,
    id: &str,
    reviewer_id: &str,
    decision: Decision,
    now: DateTime<Utc>,
) -> HrResult<Leave> {
    let mut req = Required::default();
    let status = req.value("status", decision.status);
    req.finish()?;
    if !matches!(status, LeaveStatus::Approved | LeaveStatus::Rejected) {
        return Err(HrError::Validation(
            "Decision status must be 'approved' or 'rejected'".into(),
        ));
    }

    store.write(|tx| {
        let mut leave: Leave = tx.require(id)?;
        ensure_pending(&leave)?;
        leave.status = status;
        leave.review = Some(Review {
            reviewer_id: reviewer_id.to_string(),
            remark: clean(decision.remark),
            reviewed_at: now,
        });
        leave.updated_at = now;
        tx.put(&leave)?;
        Ok(leave)
    })
}

/// Withdraw a pending application. Owner only.
pub fn cancel(store: &Store, id: &str, employee_id: &str, now: DateTime<Utc>) -> HrResult<Leave> {
    store.write(|tx| {
        let mut leave: Leave = tx.require(id)?;
        ensure_owner(&leave, employee_id)?;
        ensure_pending(&leave)?;
        leave.status = LeaveStatus::Cancelled;
        leave.updated_at = now;
        tx.put(&leave)?;
        Ok(leave)
    })
}

/// Remove an application.
///
/// Administrators may remove any application; owners only pending ones.
pub fn delete(store: &Store, id: &str, actor: &User) -> HrResult<Leave> {
    store.write(|tx| {
        let leave: Leave = tx.require(id)?;
        if !actor.is_admin() {
            ensure_owner(&leave, &actor.id)?;
            ensure_pending(&leave)?;
        }
        tx.delete::<Leave>(id)?;
        Ok(leave)
    })
}

/// Approved application of `employee_id` covering `day`, if any.
pub fn approved_on(tx: &WriteTx, employee_id: &str, day: NaiveDate) -> HrResult<Option<Leave>> {
    Ok(tx.all::<Leave>()?.into_iter().find(|l| {
        l.employee_id == employee_id && l.status == LeaveStatus::Approved && l.covers(day)
    }))
}

// =============================================================================
// TESTS
// =============================================================================
