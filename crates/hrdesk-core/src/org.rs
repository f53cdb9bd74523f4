//! # Org Module
//!
//! Department and position master data.
//!
//! Departments have case-insensitively unique names. Positions belong to
//! exactly one department and their titles are unique within it. Neither
//! can be deleted while something still points at it.

use crate::directory::User;
use crate::storage::{Document, Store, WriteTx};
use crate::validate::{Required, clean, same_name};
use crate::{HrError, HrResult};
use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

// =============================================================================
// DEPARTMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Department {
    const KIND: &'static str = "department";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("departments");

    fn key(&self) -> &str {
        &self.id
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentDraft {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn ensure_department_name_free(tx: &WriteTx, name: &str, except: Option<&str>) -> HrResult<()> {
    let taken = tx
        .all::<Department>()?
        .into_iter()
        .any(|d| same_name(&d.name, name) && Some(d.id.as_str()) != except);
    if taken {
        return Err(HrError::Conflict(format!(
            "Department '{name}' already exists"
        )));
    }
    Ok(())
}

pub fn create_department(
    store: &Store,
    draft: DepartmentDraft,
    now: DateTime<Utc>,
) -> HrResult<Department> {
    let mut req = Required::default();
    let name = req.text("name", draft.name);
    req.finish()?;

    store.write(|tx| {
        ensure_department_name_free(tx, &name, None)?;
        let dept = Department {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: clean(draft.description),
            created_at: now,
            updated_at: now,
        };
        tx.put(&dept)?;
        Ok(dept)
    })
}

/// All departments, alphabetical.
pub fn list_departments(store: &Store) -> HrResult<Vec<Department>> {
    let mut depts: Vec<Department> = store.all()?;
    depts.sort_by_key(|d| d.name.to_lowercase());
    Ok(depts)
}

pub fn get_department(store: &Store, id: &str) -> HrResult<Department> {
    store.require(id)
}

pub fn update_department(
    store: &Store,
    id: &str,
    patch: DepartmentPatch,
    now: DateTime<Utc>,
) -> HrResult<Department> {
    store.write(|tx| {
        let mut dept: Department = tx.require(id)?;
        if let Some(name) = patch.name {
            let name = clean(Some(name))
                .ok_or_else(|| HrError::Validation("Department name cannot be blank".into()))?;
            ensure_department_name_free(tx, &name, Some(id))?;
            dept.name = name;
        }
        if patch.description.is_some() {
            dept.description = clean(patch.description);
        }
        dept.updated_at = now;
        tx.put(&dept)?;
        Ok(dept)
    })
}

pub fn delete_department(store: &Store, id: &str) -> HrResult<Department> {
    store.write(|tx| {
        let dept: Department = tx.require(id)?;
        let positions = tx
            .all::<Position>()?
            .into_iter()
            .filter(|p| p.department_id == id)
            .count();
        if positions > 0 {
            return Err(HrError::Conflict(format!(
                "Department '{}' still has {positions} position(s)",
                dept.name
            )));
        }
        let members = tx
            .all::<User>()?
            .into_iter()
            .filter(|u| u.department_id.as_deref() == Some(id))
            .count();
        if members > 0 {
            return Err(HrError::Conflict(format!(
                "Department '{}' still has {members} employee(s)",
                dept.name
            )));
        }
        tx.delete::<Department>(id)?;
        Ok(dept)
    })
}

// =============================================================================
// POSITIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub title: String,
    pub department_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Position {
    const KIND: &'static str = "position";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("positions");

    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionDraft {
    pub title: Option<String>,
    pub department_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionPatch {
    pub title: Option<String>,
    pub department_id: Option<String>,
    pub description: Option<String>,
}

fn ensure_title_free(
    tx: &WriteTx,
    department_id: &str,
    title: &str,
    except: Option<&str>,
) -> HrResult<()> {
    let taken = tx.all::<Position>()?.into_iter().any(|p| {
        p.department_id == department_id
            && same_name(&p.title, title)
            && Some(p.id.as_str()) != except
    });
    if taken {
        return Err(HrError::Conflict(format!(
            "Position '{title}' already exists in this department"
        )));
    }
    Ok(())
}

fn ensure_department(tx: &WriteTx, id: &str) -> HrResult<()> {
    if tx.get::<Department>(id)?.is_none() {
        return Err(HrError::Validation(format!("Unknown department: {id}")));
    }
    Ok(())
}

pub fn create_position(
    store: &Store,
    draft: PositionDraft,
    now: DateTime<Utc>,
) -> HrResult<Position> {
    let mut req = Required::default();
    let title = req.text("title", draft.title);
    let department_id = req.text("department_id", draft.department_id);
    req.finish()?;

    store.write(|tx| {
        ensure_department(tx, &department_id)?;
        ensure_title_free(tx, &department_id, &title, None)?;
        let position = Position {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            department_id,
            description: clean(draft.description),
            created_at: now,
            updated_at: now,
        };
        tx.put(&position)?;
        Ok(position)
    })
}

/// Positions sorted by title, optionally restricted to one department.
pub fn list_positions(store: &Store, department_id: Option<&str>) -> HrResult<Vec<Position>> {
    let mut positions: Vec<Position> = store
        .all::<Position>()?
        .into_iter()
        .filter(|p| department_id.is_none_or(|d| p.department_id == d))
        .collect();
    positions.sort_by_key(|p| p.title.to_lowercase());
    Ok(positions)
}

pub fn get_position(store: &Store, id: &str) -> HrResult<Position> {
    store.require(id)
}

/// Moving a position to another department moves its holders along.
pub fn update_position(
    store: &Store,
    id: &str,
    patch: PositionPatch,
    now: DateTime<Utc>,
) -> HrResult<Position> {
    store.write(|tx| {
        let mut position: Position = tx.require(id)?;
        if let Some(department_id) = clean(patch.department_id) {
            ensure_department(tx, &department_id)?;
            position.department_id = department_id;
        }
        if let Some(title) = patch.title {
            position.title = clean(Some(title))
                .ok_or_else(|| HrError::Validation("Position title cannot be blank".into()))?;
        }
        ensure_title_free(tx, &position.department_id, &position.title, Some(id))?;
        if patch.description.is_some() {
            position.description = clean(patch.description);
        }
        position.updated_at = now;
        tx.put(&position)?;

        for mut user in tx.all::<User>()? {
            if user.position_id.as_deref() == Some(id)
                && user.department_id.as_deref() != Some(position.department_id.as_str())
            {
                user.department_id = Some(position.department_id.clone());
                user.updated_at = now;
                tx.put(&user)?;
            }
        }
        Ok(position)
    })
}

pub fn delete_position(store: &Store, id: &str) -> HrResult<Position> {
    store.write(|tx| {
        let position: Position = tx.require(id)?;
        let holders = tx
            .all::<User>()?
            .into_iter()
            .filter(|u| u.position_id.as_deref() == Some(id))
            .count();
        if holders > 0 {
            return Err(HrError::Conflict(format!(
                "Position '{}' is held by {holders} employee(s)",
                position.title
            )));
        }
        tx.delete::<Position>(id)?;
        Ok(position)
    })
}

// =============================================================================
// TESTS
// =============================================================================
