//! Organizational scope resolution.
//!
//! A user sees departments according to the role they hold in each
//! department they are attached to:
//!
//! | Role                 | Reach                                        |
//! |----------------------|----------------------------------------------|
//! | ADMIN (primary only) | every department                             |
//! | CHIEF                | every department in the mission group        |
//! | LEADER               | every department in the division             |
//! | HEAD / MEMBER / USER | the department itself                        |
//!
//! The primary `(department, role)` pair and every entry of the user's
//! `additional_roles` object are resolved independently and unioned.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::roles::Role;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// A live division and the mission group it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct DivisionNode {
    pub id: DbId,
    pub mission_group_id: DbId,
}

/// A live department and the division it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct DepartmentNode {
    pub id: DbId,
    pub division_id: DbId,
}

/// In-memory lookup tables over the mission group -> division -> department
/// tree. Built once per request from non-deleted rows.
#[derive(Debug, Default, Clone)]
pub struct OrgHierarchy {
    mission_groups: BTreeSet<DbId>,
    division_mission_group: HashMap<DbId, DbId>,
    department_division: HashMap<DbId, DbId>,
    mission_group_divisions: HashMap<DbId, Vec<DbId>>,
    division_departments: HashMap<DbId, Vec<DbId>>,
}

impl OrgHierarchy {
    pub fn new(
        mission_group_ids: impl IntoIterator<Item = DbId>,
        divisions: &[DivisionNode],
        departments: &[DepartmentNode],
    ) -> Self {
        let mut h = OrgHierarchy {
            mission_groups: mission_group_ids.into_iter().collect(),
            ..Default::default()
        };

        for div in divisions {
            h.mission_groups.insert(div.mission_group_id);
            h.division_mission_group.insert(div.id, div.mission_group_id);
            h.mission_group_divisions
                .entry(div.mission_group_id)
                .or_default()
                .push(div.id);
        }

        for dept in departments {
            // Departments under a deleted division are unreachable.
            if !h.division_mission_group.contains_key(&dept.division_id) {
                continue;
            }
            h.department_division.insert(dept.id, dept.division_id);
            h.division_departments
                .entry(dept.division_id)
                .or_default()
                .push(dept.id);
        }

        h
    }

    pub fn contains_department(&self, department_id: DbId) -> bool {
        self.department_division.contains_key(&department_id)
    }

    pub fn division_of(&self, department_id: DbId) -> Option<DbId> {
        self.department_division.get(&department_id).copied()
    }

    pub fn mission_group_of(&self, department_id: DbId) -> Option<DbId> {
        self.division_of(department_id)
            .and_then(|div| self.division_mission_group.get(&div).copied())
    }

    pub fn divisions_in(&self, mission_group_id: DbId) -> &[DbId] {
        self.mission_group_divisions
            .get(&mission_group_id)
            .map_or(&[], Vec::as_slice)
    }

    pub fn departments_in(&self, division_id: DbId) -> &[DbId] {
        self.division_departments
            .get(&division_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `role` held in `entry_department` reaches `target_department`.
    pub fn reaches(&self, role: Role, entry_department: DbId, target_department: DbId) -> bool {
        if !self.contains_department(entry_department) || !self.contains_department(target_department)
        {
            return false;
        }
        match role {
            Role::Admin => true,
            Role::Chief => {
                self.mission_group_of(entry_department) == self.mission_group_of(target_department)
            }
            Role::Leader => self.division_of(entry_department) == self.division_of(target_department),
            Role::Head | Role::Member | Role::User => entry_department == target_department,
        }
    }
}

// ---------------------------------------------------------------------------
// Role assignments
// ---------------------------------------------------------------------------

/// Department -> role map combining a user's primary role with their
/// per-department overrides. When a department appears twice the higher
/// role wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignments {
    entries: BTreeMap<DbId, Role>,
}

impl RoleAssignments {
    /// Build from the primary pair plus the raw `additional_roles` JSON.
    pub fn new(
        primary_department: Option<DbId>,
        primary_role: Role,
        additional_roles: Option<&serde_json::Value>,
    ) -> Self {
        let mut assignments = RoleAssignments::default();
        if let Some(dept) = primary_department {
            assignments.insert(dept, primary_role);
        }
        if let Some(value) = additional_roles {
            for (dept, role) in parse_additional_roles(value) {
                assignments.insert(dept, role);
            }
        }
        assignments
    }

    pub fn insert(&mut self, department_id: DbId, role: Role) {
        self.entries
            .entry(department_id)
            .and_modify(|existing| *existing = (*existing).max(role))
            .or_insert(role);
    }

    /// The role recorded for exactly this department, if any.
    pub fn role_in(&self, department_id: DbId) -> Option<Role> {
        self.entries.get(&department_id).copied()
    }

    pub fn highest(&self) -> Option<Role> {
        self.entries.values().copied().max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DbId, Role)> + '_ {
        self.entries.iter().map(|(d, r)| (*d, *r))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize back to the canonical `{ "<dept id>": "ROLE" }` layout.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(dept, role)| (dept.to_string(), serde_json::Value::from(role.as_str())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Parse the `additional_roles` column.
///
/// Two layouts are accepted:
/// - canonical: `{ "12": "CHIEF" }` (department id -> role)
/// - legacy:    `{ "CHIEF": "12" }` (role -> department id)
///
/// A key that parses as an integer is read as canonical. Entries naming an
/// unknown role, an unparseable id, or `ADMIN` are skipped; admin is only
/// ever granted through the primary role.
pub fn parse_additional_roles(value: &serde_json::Value) -> Vec<(DbId, Role)> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .filter_map(|(key, val)| {
            let val = json_scalar_to_string(val)?;
            let (dept, role) = match key.trim().parse::<DbId>() {
                Ok(dept) => (dept, Role::parse(&val)?),
                Err(_) => (val.trim().parse::<DbId>().ok()?, Role::parse(key)?),
            };
            (role != Role::Admin).then_some((dept, role))
        })
        .collect()
}

fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The authenticated user as the permission layer sees them.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub assignments: RoleAssignments,
}

impl Actor {
    pub fn new(
        user_id: DbId,
        role: Role,
        department_id: Option<DbId>,
        additional_roles: Option<&serde_json::Value>,
    ) -> Self {
        Actor {
            user_id,
            role,
            department_id,
            assignments: RoleAssignments::new(department_id, role, additional_roles),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Highest role held anywhere (primary or override).
    pub fn effective_role(&self) -> Role {
        self.assignments.highest().map_or(self.role, |r| r.max(self.role))
    }
}

/// The higher of the primary role and the override recorded for `department_id`.
pub fn effective_role_in(actor: &Actor, department_id: DbId) -> Role {
    actor
        .assignments
        .role_in(department_id)
        .map_or(actor.role, |r| r.max(actor.role))
}

/// The highest role among the actor's entries whose reach covers
/// `department_id`. `None` when the department is outside the actor's scope.
pub fn role_for_department(
    actor: &Actor,
    hierarchy: &OrgHierarchy,
    department_id: DbId,
) -> Option<Role> {
    if actor.is_admin() {
        return Some(Role::Admin);
    }
    actor
        .assignments
        .iter()
        .filter(|(entry_dept, role)| hierarchy.reaches(*role, *entry_dept, department_id))
        .map(|(_, role)| role)
        .max()
}

// ---------------------------------------------------------------------------
// Accessible scope
// ---------------------------------------------------------------------------

/// Most specific hierarchy level in a scope. Every non-admin scope that
/// resolves at least one department is `Department`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeKind {
    All,
    MissionGroup,
    Division,
    Department,
}

/// Ids a user may see, with parents included for hierarchical display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessibleScope {
    pub is_admin: bool,
    pub kind: ScopeKind,
    pub mission_group_ids: BTreeSet<DbId>,
    pub division_ids: BTreeSet<DbId>,
    pub department_ids: BTreeSet<DbId>,
}

impl AccessibleScope {
    /// Scope of a user that could not be found.
    pub fn empty() -> Self {
        AccessibleScope {
            is_admin: false,
            kind: ScopeKind::Department,
            mission_group_ids: BTreeSet::new(),
            division_ids: BTreeSet::new(),
            department_ids: BTreeSet::new(),
        }
    }

    pub fn contains_department(&self, department_id: DbId) -> bool {
        self.is_admin || self.department_ids.contains(&department_id)
    }

    pub fn contains_division(&self, division_id: DbId) -> bool {
        self.is_admin || self.division_ids.contains(&division_id)
    }

    pub fn contains_mission_group(&self, mission_group_id: DbId) -> bool {
        self.is_admin || self.mission_group_ids.contains(&mission_group_id)
    }

    /// Department ids as a vector, for `= ANY($n)` binds.
    pub fn department_list(&self) -> Vec<DbId> {
        self.department_ids.iter().copied().collect()
    }
}

/// Resolve the departments, divisions and mission groups a user may see.
pub fn resolve_accessible_scope(actor: Option<&Actor>, hierarchy: &OrgHierarchy) -> AccessibleScope {
    let Some(actor) = actor else {
        return AccessibleScope::empty();
    };

    if actor.is_admin() {
        return AccessibleScope {
            is_admin: true,
            kind: ScopeKind::All,
            mission_group_ids: hierarchy.mission_groups.clone(),
            division_ids: hierarchy.division_mission_group.keys().copied().collect(),
            department_ids: hierarchy.department_division.keys().copied().collect(),
        };
    }

    let mut scope = AccessibleScope::empty();

    for (dept, role) in actor.assignments.iter() {
        let (Some(div), Some(mg)) = (hierarchy.division_of(dept), hierarchy.mission_group_of(dept))
        else {
            continue;
        };

        match role {
            Role::Chief => {
                scope.mission_group_ids.insert(mg);
                for &d in hierarchy.divisions_in(mg) {
                    scope.division_ids.insert(d);
                    scope
                        .department_ids
                        .extend(hierarchy.departments_in(d).iter().copied());
                }
            }
            Role::Leader => {
                scope.mission_group_ids.insert(mg);
                scope.division_ids.insert(div);
                scope
                    .department_ids
                    .extend(hierarchy.departments_in(div).iter().copied());
            }
            Role::Admin | Role::Head | Role::Member | Role::User => {
                scope.mission_group_ids.insert(mg);
                scope.division_ids.insert(div);
                scope.department_ids.insert(dept);
            }
        }
    }

    // Most specific level that has any entry.
    scope.kind = if !scope.department_ids.is_empty() {
        ScopeKind::Department
    } else if !scope.division_ids.is_empty() {
        ScopeKind::Division
    } else if !scope.mission_group_ids.is_empty() {
        ScopeKind::MissionGroup
    } else {
        ScopeKind::Department
    };

    scope
}

// ---------------------------------------------------------------------------
// Management scope
// ---------------------------------------------------------------------------

/// The user being managed.
#[derive(Debug, Clone, Copy)]
pub struct ManagedUser {
    pub user_id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
}

/// Whether `manager` may edit, suspend or delete `target`.
///
/// Nobody manages themselves; ADMIN manages every non-admin; nobody else
/// manages an ADMIN; a HEAD-or-above manages users whose department is
/// reached by one of their HEAD-or-above entries.
pub fn is_in_management_scope(
    manager: &Actor,
    target: &ManagedUser,
    hierarchy: &OrgHierarchy,
) -> bool {
    if manager.user_id == target.user_id {
        return false;
    }
    if manager.is_admin() {
        return target.role != Role::Admin;
    }
    if target.role == Role::Admin || !manager.role.is_management() {
        return false;
    }
    let Some(target_dept) = target.department_id else {
        return false;
    };
    manager
        .assignments
        .iter()
        .any(|(dept, role)| role.is_management() && hierarchy.reaches(role, dept, target_dept))
}
