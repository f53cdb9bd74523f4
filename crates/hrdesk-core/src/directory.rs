//! # Directory Module
//!
//! The employee directory: user accounts and their placement in the org.
//!
//! User ids come from [`Sequence::Employee`]. Emails are normalized and
//! indexed so that login and uniqueness checks are single lookups. Placement
//! follows one rule: a position implies its department, and an explicit
//! department must agree with the position.

use crate::account::{ResetTicket, drop_sessions_of};
use crate::attendance::AttendanceRecord;
use crate::credentials::{check_password_policy, hash_password};
use crate::leave::Leave;
use crate::org::{Department, Position};
use crate::sequence::Sequence;
use crate::storage::{Document, Store, WriteTx};
use crate::validate::{Required, check_email, clean, normalize_email};
use crate::{HrError, HrResult};
use chrono::{DateTime, NaiveDate, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Access level of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user document. Never serialize this to clients; use [`UserView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_joining: NaiveDate,
    pub active: bool,
    /// Embedded in every issued JWT; bumping it revokes them all.
    pub token_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for User {
    const KIND: &'static str = "user";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("users");

    fn key(&self) -> &str {
        &self.id
    }
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_joining: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            department_id: user.department_id.clone(),
            position_id: user.position_id.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            date_of_birth: user.date_of_birth,
            date_of_joining: user.date_of_joining,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Body of a create-user request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_joining: Option<NaiveDate>,
}

/// Administrative update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_joining: Option<NaiveDate>,
    pub active: Option<bool>,
}

/// The subset a user may change on their own record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Directory listing filter. Every present criterion must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    /// Case-insensitive substring of name, email or id.
    pub search: Option<String>,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        let needle = self.search.as_deref().map(|s| s.trim().to_lowercase());
        self.department
            .as_deref()
            .is_none_or(|d| user.department_id.as_deref() == Some(d))
            && self
                .position
                .as_deref()
                .is_none_or(|p| user.position_id.as_deref() == Some(p))
            && self.role.is_none_or(|r| user.role == r)
            && self.active.is_none_or(|a| user.active == a)
            && needle.is_none_or(|n| {
                user.name.to_lowercase().contains(&n)
                    || user.email.contains(&n)
                    || user.id.to_lowercase().contains(&n)
            })
    }
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Resolve department/position references into a consistent pair.
fn resolve_placement(
    tx: &WriteTx,
    department_id: Option<String>,
    position_id: Option<String>,
) -> HrResult<(Option<String>, Option<String>)> {
    let position = match &position_id {
        Some(id) => Some(
            tx.get::<Position>(id)?
                .ok_or_else(|| HrError::Validation(format!("Unknown position: {id}")))?,
        ),
        None => None,
    };
    if let Some(id) = &department_id
        && tx.get::<Department>(id)?.is_none()
    {
        return Err(HrError::Validation(format!("Unknown department: {id}")));
    }
    match (department_id, position) {
        (Some(dept), Some(pos)) if pos.department_id != dept => Err(HrError::Validation(
            format!("Position '{}' does not belong to department {dept}", pos.title),
        )),
        (dept, Some(pos)) => Ok((dept.or(Some(pos.department_id)), Some(pos.id))),
        (dept, None) => Ok((dept, None)),
    }
}

fn ensure_email_free(tx: &WriteTx, email: &str) -> HrResult<()> {
    if tx.user_id_by_email(email)?.is_some() {
        return Err(HrError::Conflict(format!(
            "A user with email {email} already exists"
        )));
    }
    Ok(())
}

// =============================================================================
// OPERATIONS
// =============================================================================

pub fn create_user(store: &Store, draft: NewUser, now: DateTime<Utc>) -> HrResult<User> {
    let mut req = Required::default();
    let name = req.text("name", draft.name);
    let email = req.text("email", draft.email);
    let password = req.value("password", draft.password.filter(|p| !p.is_empty()));
    req.finish()?;

    let email = normalize_email(&email);
    check_email(&email)?;
    check_password_policy(&password)?;
    let password_hash = hash_password(&password)?;

    store.write(|tx| {
        ensure_email_free(tx, &email)?;
        let (department_id, position_id) =
            resolve_placement(tx, clean(draft.department_id), clean(draft.position_id))?;

        let user = User {
            id: Sequence::Employee.next(tx)?,
            name,
            email,
            password_hash,
            role: draft.role.unwrap_or_default(),
            department_id,
            position_id,
            phone: clean(draft.phone),
            address: clean(draft.address),
            date_of_birth: draft.date_of_birth,
            date_of_joining: draft.date_of_joining.unwrap_or_else(|| now.date_naive()),
            active: true,
            token_version: 0,
            created_at: now,
            updated_at: now,
        };
        tx.index_email(&user.email, &user.id)?;
        tx.put(&user)?;
        Ok(user)
    })
}

pub fn get_user(store: &Store, id: &str) -> HrResult<User> {
    store.require(id)
}

/// Look a user up by email (any casing).
pub fn find_by_email(store: &Store, email: &str) -> HrResult<Option<User>> {
    let email = normalize_email(email);
    store.read(|tx| match tx.user_id_by_email(&email)? {
        Some(id) => tx.get(&id),
        None => Ok(None),
    })
}

/// Users matching `filter`, ordered by id.
pub fn list_users(store: &Store, filter: &UserFilter) -> HrResult<Vec<User>> {
    let mut users: Vec<User> = store
        .all::<User>()?
        .into_iter()
        .filter(|u| filter.matches(u))
        .collect();
    users.sort_by(|a, b| Sequence::Employee.compare(&a.id, &b.id));
    Ok(users)
}

pub fn update_user(
    store: &Store,
    id: &str,
    patch: UserPatch,
    now: DateTime<Utc>,
) -> HrResult<User> {
    store.write(|tx| {
        let mut user: User = tx.require(id)?;

        if let Some(name) = patch.name {
            user.name = clean(Some(name))
                .ok_or_else(|| HrError::Validation("Name cannot be blank".into()))?;
        }
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != user.email {
                check_email(&email)?;
                ensure_email_free(tx, &email)?;
                tx.unindex_email(&user.email)?;
                tx.index_email(&email, &user.id)?;
                user.email = email;
            }
        }
        if patch.department_id.is_some() || patch.position_id.is_some() {
            // Outer None: untouched. Inner None: cleared.
            let dept_patch = patch.department_id.map(|d| clean(Some(d)));
            let pos_patch = patch.position_id.map(|p| clean(Some(p)));
            // A new department alone drops a position from the old one.
            let position = match (&pos_patch, &dept_patch) {
                (Some(pos), _) => pos.clone(),
                (None, Some(dept)) => user
                    .position_id
                    .clone()
                    .filter(|_| user.department_id == *dept),
                (None, None) => user.position_id.clone(),
            };
            let department = match dept_patch {
                Some(dept) => dept,
                None if position.is_some() => None,
                None => user.department_id.clone(),
            };
            let (department_id, position_id) = resolve_placement(tx, department, position)?;
            user.department_id = department_id;
            user.position_id = position_id;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if patch.phone.is_some() {
            user.phone = clean(patch.phone);
        }
        if patch.address.is_some() {
            user.address = clean(patch.address);
        }
        if patch.date_of_birth.is_some() {
            user.date_of_birth = patch.date_of_birth;
        }
        if let Some(joined) = patch.date_of_joining {
            user.date_of_joining = joined;
        }
        if let Some(active) = patch.active {
            if !active && user.active {
                // Deactivation ends every outstanding session.
                user.token_version = user.token_version.wrapping_add(1);
                drop_sessions_of(tx, &user.id, None)?;
            }
            user.active = active;
        }

        user.updated_at = now;
        tx.put(&user)?;
        Ok(user)
    })
}

pub fn update_profile(
    store: &Store,
    id: &str,
    patch: ProfilePatch,
    now: DateTime<Utc>,
) -> HrResult<User> {
    update_user(
        store,
        id,
        UserPatch {
            name: patch.name,
            phone: patch.phone,
            address: patch.address,
            date_of_birth: patch.date_of_birth,
            ..UserPatch::default()
        },
        now,
    )
}

/// Delete a user together with everything keyed to them.
pub fn delete_user(store: &Store, id: &str) -> HrResult<User> {
    store.write(|tx| {
        let user: User = tx.require(id)?;
        tx.unindex_email(&user.email)?;

        for ticket in tx.all::<ResetTicket>()? {
            if ticket.user_id == user.id {
                tx.delete::<ResetTicket>(&ticket.token_hash)?;
            }
        }
        drop_sessions_of(tx, &user.id, None)?;
        for leave in tx.all::<Leave>()? {
            if leave.employee_id == user.id {
                tx.delete::<Leave>(&leave.id)?;
            }
        }
        for record in tx.all::<AttendanceRecord>()? {
            if record.employee_id == user.id {
                tx.delete::<AttendanceRecord>(&record.id)?;
            }
        }

        tx.delete::<User>(&user.id)?;
        Ok(user)
    })
}

#[cfg(test)]
impl NewUser {
    /// Minimal valid draft for tests.
    pub(crate) fn sample(name: &str, email: &str) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some("password123".into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
