//! # Dashboard Module
//!
//! Headline numbers for the administrator landing page, read from one
//! snapshot so they agree with each other.

use crate::HrResult;
use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::directory::User;
use crate::events::Event;
use crate::leave::{Leave, LeaveStatus};
use crate::org::{Department, Position};
use crate::storage::Store;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub employees: usize,
    pub active_employees: usize,
    pub departments: usize,
    pub positions: usize,
    pub pending_leaves: usize,
    pub on_leave_today: usize,
    pub present_today: usize,
    pub upcoming_events: usize,
}

pub fn summary(store: &Store, today: NaiveDate) -> HrResult<Summary> {
    store.read(|tx| {
        let users: Vec<User> = tx.all()?;
        let leaves: Vec<Leave> = tx.all()?;
        let attendance: Vec<AttendanceRecord> = tx.all()?;
        let events: Vec<Event> = tx.all()?;

        Ok(Summary {
            employees: users.len(),
            active_employees: users.iter().filter(|u| u.active).count(),
            departments: tx.all::<Department>()?.len(),
            positions: tx.all::<Position>()?.len(),
            pending_leaves: leaves
                .iter()
                .filter(|l| l.status == LeaveStatus::Pending)
                .count(),
            on_leave_today: leaves
                .iter()
                .filter(|l| l.status == LeaveStatus::Approved && l.covers(today))
                .count(),
            present_today: attendance
                .iter()
                .filter(|r| {
                    r.date == today
                        && matches!(r.status, AttendanceStatus::Present | AttendanceStatus::HalfDay)
                })
                .count(),
            upcoming_events: events.iter().filter(|e| e.last_day() >= today).count(),
        })
    })
}
