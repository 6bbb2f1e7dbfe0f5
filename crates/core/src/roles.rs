//! Organizational roles and the role -> permission table.
//!
//! Role names are stored upper-case in `users.role` and must match the
//! `ck_users_role` check constraint in the initial migration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's role. Variants are declared lowest to highest so the derived
/// `Ord` follows the role level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Role {
    User,
    Member,
    Head,
    Leader,
    Chief,
    Admin,
}

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_CHIEF: &str = "CHIEF";
pub const ROLE_LEADER: &str = "LEADER";
pub const ROLE_HEAD: &str = "HEAD";
pub const ROLE_MEMBER: &str = "MEMBER";
pub const ROLE_USER: &str = "USER";

impl Role {
    /// All roles, lowest level first.
    pub const ALL: [Role; 6] = [
        Role::User,
        Role::Member,
        Role::Head,
        Role::Leader,
        Role::Chief,
        Role::Admin,
    ];

    /// Numeric level: USER=1 .. ADMIN=6.
    pub fn level(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Member => 2,
            Role::Head => 3,
            Role::Leader => 4,
            Role::Chief => 5,
            Role::Admin => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => ROLE_USER,
            Role::Member => ROLE_MEMBER,
            Role::Head => ROLE_HEAD,
            Role::Leader => ROLE_LEADER,
            Role::Chief => ROLE_CHIEF,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// Case-insensitive parse. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Role> {
        let name = name.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
    }

    /// HEAD and above. These roles act on other users' tasks and projects.
    pub fn is_management(self) -> bool {
        self >= Role::Head
    }

    /// Permissions granted by this role.
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => Permission::ALL,
            Role::Chief => &[
                ViewProjects,
                CreateProjects,
                EditProjects,
                DeleteProjects,
                ViewTasks,
                CreateTasks,
                EditTasks,
                DeleteTasks,
                CloseTasks,
                ViewUsers,
                CreateUsers,
                EditUsers,
                DeleteUsers,
                ViewReports,
                ManageDepartments,
                ManageStatuses,
                ViewAllProjects,
                ApproveServiceRequests,
            ],
            Role::Leader => &[
                ViewProjects,
                CreateProjects,
                EditProjects,
                DeleteProjects,
                ViewTasks,
                CreateTasks,
                EditTasks,
                CloseTasks,
                ViewUsers,
                ViewReports,
                ManageStatuses,
                ApproveServiceRequests,
            ],
            Role::Head => &[
                ViewProjects,
                CreateProjects,
                EditProjects,
                DeleteProjects,
                ViewTasks,
                CreateTasks,
                EditTasks,
                CloseTasks,
                ViewReports,
                ApproveServiceRequests,
            ],
            Role::Member => &[
                ViewProjects,
                ViewTasks,
                CreateTasks,
                EditOwnTasks,
                CloseOwnTasks,
            ],
            Role::User => &[ViewProjects, ViewTasks],
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Level of a raw role name, `0` when the name is unknown.
pub fn role_level(name: &str) -> u8 {
    Role::parse(name).map_or(0, Role::level)
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| {
            format!(
                "Invalid role '{s}'. Must be one of: {}",
                Role::ALL.map(Role::as_str).join(", ")
            )
        })
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for &'static str {
    fn from(role: Role) -> Self {
        role.as_str()
    }
}

/// A single capability checked by the permission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProjects,
    CreateProjects,
    EditProjects,
    DeleteProjects,
    ViewTasks,
    CreateTasks,
    EditTasks,
    EditOwnTasks,
    DeleteTasks,
    CloseTasks,
    CloseOwnTasks,
    ViewUsers,
    CreateUsers,
    EditUsers,
    DeleteUsers,
    ViewReports,
    ManageDepartments,
    ManageStatuses,
    ViewAllProjects,
    ApproveServiceRequests,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::ViewProjects,
        Permission::CreateProjects,
        Permission::EditProjects,
        Permission::DeleteProjects,
        Permission::ViewTasks,
        Permission::CreateTasks,
        Permission::EditTasks,
        Permission::EditOwnTasks,
        Permission::DeleteTasks,
        Permission::CloseTasks,
        Permission::CloseOwnTasks,
        Permission::ViewUsers,
        Permission::CreateUsers,
        Permission::EditUsers,
        Permission::DeleteUsers,
        Permission::ViewReports,
        Permission::ManageDepartments,
        Permission::ManageStatuses,
        Permission::ViewAllProjects,
        Permission::ApproveServiceRequests,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_ascend() {
        let levels: Vec<u8> = Role::ALL.iter().map(|r| r.level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6]);
        assert!(Role::Admin > Role::Chief);
        assert!(Role::Member < Role::Head);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Role::parse("member"), Some(Role::Member));
        assert_eq!(Role::parse(" Chief "), Some(Role::Chief));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_unknown_role_level_is_zero() {
        assert_eq!(role_level("superuser"), 0);
        assert_eq!(role_level("head"), 3);
    }

    #[test]
    fn test_admin_has_every_permission() {
        for p in Permission::ALL {
            assert!(Role::Admin.has_permission(*p), "admin lacks {p:?}");
        }
    }

    #[test]
    fn test_member_only_edits_own_tasks() {
        assert!(Role::Member.has_permission(Permission::EditOwnTasks));
        assert!(!Role::Member.has_permission(Permission::EditTasks));
        assert!(Role::Member.has_permission(Permission::CloseOwnTasks));
        assert!(!Role::Member.has_permission(Permission::CloseTasks));
    }

    #[test]
    fn test_user_is_read_only() {
        assert_eq!(
            Role::User.permissions(),
            &[Permission::ViewProjects, Permission::ViewTasks]
        );
    }

    #[test]
    fn test_only_chief_and_admin_delete_tasks() {
        let deleters: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.has_permission(Permission::DeleteTasks))
            .collect();
        assert_eq!(deleters, vec![Role::Chief, Role::Admin]);
    }

    #[test]
    fn test_management_roles() {
        assert!(Role::Head.is_management());
        assert!(!Role::Member.is_management());
    }

    #[test]
    fn test_serde_round_trips_upper_case() {
        let json = serde_json::to_string(&Role::Leader).unwrap();
        assert_eq!(json, "\"LEADER\"");
        let parsed: Role = serde_json::from_str("\"leader\"").unwrap();
        assert_eq!(parsed, Role::Leader);
        assert!(serde_json::from_str::<Role>("\"boss\"").is_err());
    }
}
