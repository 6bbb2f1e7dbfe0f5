//! Access decisions for projects, tasks and service requests.
//!
//! Every check that concerns a department resolves the role the actor holds
//! *for that department* through [`role_for_department`], so a MEMBER with a
//! HEAD override in another department acts as HEAD there and nowhere else.

use crate::roles::{Permission, Role};
use crate::scope::{role_for_department, AccessibleScope, Actor, OrgHierarchy};
use crate::types::DbId;

/// The project facts permission checks need.
#[derive(Debug, Clone, Copy)]
pub struct ProjectRef {
    pub department_id: DbId,
    pub owner_user_id: DbId,
}

/// The task facts permission checks need.
#[derive(Debug, Clone)]
pub struct TaskRef {
    pub project: ProjectRef,
    pub creator_user_id: DbId,
    pub assignee_user_ids: Vec<DbId>,
}

impl TaskRef {
    /// Creator or current assignee.
    pub fn is_involved(&self, user_id: DbId) -> bool {
        self.creator_user_id == user_id || self.assignee_user_ids.contains(&user_id)
    }
}

/// Permission check bound to one actor and one resolved hierarchy.
pub struct Access<'a> {
    pub actor: &'a Actor,
    pub hierarchy: &'a OrgHierarchy,
    pub scope: &'a AccessibleScope,
}

impl<'a> Access<'a> {
    pub fn new(actor: &'a Actor, hierarchy: &'a OrgHierarchy, scope: &'a AccessibleScope) -> Self {
        Access {
            actor,
            hierarchy,
            scope,
        }
    }

    /// Whether the role held for `department_id` grants `permission`.
    pub fn has_in_department(&self, permission: Permission, department_id: DbId) -> bool {
        role_for_department(self.actor, self.hierarchy, department_id)
            .is_some_and(|role| role.has_permission(permission))
    }

    /// Whether the primary role grants `permission`, regardless of department.
    pub fn has_global(&self, permission: Permission) -> bool {
        self.actor.role.has_permission(permission)
    }

    // -- Projects ----------------------------------------------------------

    pub fn can_view_project(&self, project: &ProjectRef) -> bool {
        project.owner_user_id == self.actor.user_id
            || self.scope.contains_department(project.department_id)
    }

    pub fn can_create_project(&self, department_id: DbId) -> bool {
        self.has_in_department(Permission::CreateProjects, department_id)
    }

    pub fn can_edit_project(&self, project: &ProjectRef) -> bool {
        project.owner_user_id == self.actor.user_id
            || self.has_in_department(Permission::EditProjects, project.department_id)
    }

    pub fn can_delete_project(&self, project: &ProjectRef) -> bool {
        self.has_in_department(Permission::DeleteProjects, project.department_id)
    }

    pub fn can_manage_statuses(&self, project: &ProjectRef) -> bool {
        project.owner_user_id == self.actor.user_id
            || self.has_in_department(Permission::ManageStatuses, project.department_id)
    }

    // -- Tasks -------------------------------------------------------------

    pub fn can_view_task(&self, task: &TaskRef) -> bool {
        self.can_view_project(&task.project) || task.is_involved(self.actor.user_id)
    }

    pub fn can_create_task(&self, project: &ProjectRef) -> bool {
        project.owner_user_id == self.actor.user_id
            || self.has_in_department(Permission::CreateTasks, project.department_id)
    }

    pub fn can_edit_task(&self, task: &TaskRef) -> bool {
        self.any_or_own(task, Permission::EditTasks, Permission::EditOwnTasks)
    }

    pub fn can_close_task(&self, task: &TaskRef) -> bool {
        self.any_or_own(task, Permission::CloseTasks, Permission::CloseOwnTasks)
    }

    pub fn can_delete_task(&self, task: &TaskRef) -> bool {
        self.has_in_department(Permission::DeleteTasks, task.project.department_id)
    }

    /// Changing assignees needs more than edit rights: the creator, a
    /// management role, or someone already assigned.
    pub fn can_assign_task(&self, task: &TaskRef) -> bool {
        task.is_involved(self.actor.user_id)
            || role_for_department(self.actor, self.hierarchy, task.project.department_id)
                .is_some_and(Role::is_management)
    }

    fn any_or_own(&self, task: &TaskRef, any: Permission, own: Permission) -> bool {
        if self.has_in_department(any, task.project.department_id) {
            return true;
        }
        task.is_involved(self.actor.user_id) && (self.has_global(own) || self.has_global(any))
    }

    // -- Service requests --------------------------------------------------

    pub fn can_approve_service_requests(&self) -> bool {
        self.has_global(Permission::ApproveServiceRequests)
    }

    pub fn can_view_reports(&self) -> bool {
        self.has_global(Permission::ViewReports)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scope::{resolve_accessible_scope, DepartmentNode, DivisionNode};

    fn hierarchy() -> OrgHierarchy {
        OrgHierarchy::new(
            [1],
            &[
                DivisionNode { id: 10, mission_group_id: 1 },
                DivisionNode { id: 11, mission_group_id: 1 },
            ],
            &[
                DepartmentNode { id: 100, division_id: 10 },
                DepartmentNode { id: 101, division_id: 10 },
                DepartmentNode { id: 110, division_id: 11 },
            ],
        )
    }

    fn task_in(dept: DbId, creator: DbId, assignees: Vec<DbId>) -> TaskRef {
        TaskRef {
            project: ProjectRef { department_id: dept, owner_user_id: 900 },
            creator_user_id: creator,
            assignee_user_ids: assignees,
        }
    }

    fn check<F: Fn(&Access) -> bool>(actor: &Actor, f: F) -> bool {
        let h = hierarchy();
        let scope = resolve_accessible_scope(Some(actor), &h);
        f(&Access::new(actor, &h, &scope))
    }

    #[test]
    fn test_head_cannot_close_task_in_other_department() {
        let head = Actor::new(1, Role::Head, Some(100), None);
        let task = task_in(101, 2, vec![3]);
        assert!(!check(&head, |a| a.can_close_task(&task)));
        let own_dept = task_in(100, 2, vec![3]);
        assert!(check(&head, |a| a.can_close_task(&own_dept)));
    }

    #[test]
    fn test_member_closes_only_own_tasks() {
        let member = Actor::new(5, Role::Member, Some(100), None);
        assert!(!check(&member, |a| a.can_close_task(&task_in(100, 2, vec![3]))));
        assert!(check(&member, |a| a.can_close_task(&task_in(100, 5, vec![]))));
        assert!(check(&member, |a| a.can_close_task(&task_in(100, 2, vec![3, 5]))));
    }

    #[test]
    fn test_user_cannot_edit_even_own_task() {
        let user = Actor::new(5, Role::User, Some(100), None);
        assert!(!check(&user, |a| a.can_edit_task(&task_in(100, 5, vec![5]))));
        assert!(check(&user, |a| a.can_view_task(&task_in(100, 2, vec![]))));
    }

    #[test]
    fn test_leader_edits_across_division_only() {
        let leader = Actor::new(1, Role::Leader, Some(100), None);
        assert!(check(&leader, |a| a.can_edit_task(&task_in(101, 2, vec![]))));
        assert!(!check(&leader, |a| a.can_edit_task(&task_in(110, 2, vec![]))));
        assert!(!check(&leader, |a| a.can_delete_task(&task_in(100, 2, vec![]))));
    }

    #[test]
    fn test_override_grants_role_in_that_department() {
        let member = Actor::new(5, Role::Member, Some(100), Some(&json!({ "110": "HEAD" })));
        assert!(check(&member, |a| a.can_close_task(&task_in(110, 2, vec![]))));
        assert!(!check(&member, |a| a.can_close_task(&task_in(101, 2, vec![]))));
    }

    #[test]
    fn test_project_owner_can_edit_outside_scope() {
        let user = Actor::new(900, Role::User, Some(110), None);
        let project = ProjectRef { department_id: 100, owner_user_id: 900 };
        assert!(check(&user, |a| a.can_edit_project(&project)));
        assert!(check(&user, |a| a.can_view_project(&project)));
        assert!(!check(&user, |a| a.can_delete_project(&project)));
    }

    #[test]
    fn test_create_project_requires_department_role() {
        let head = Actor::new(1, Role::Head, Some(100), None);
        assert!(check(&head, |a| a.can_create_project(100)));
        assert!(!check(&head, |a| a.can_create_project(101)));
        let member = Actor::new(2, Role::Member, Some(100), None);
        assert!(!check(&member, |a| a.can_create_project(100)));
    }

    #[test]
    fn test_assign_requires_involvement_or_management() {
        let member = Actor::new(5, Role::Member, Some(100), None);
        assert!(!check(&member, |a| a.can_assign_task(&task_in(100, 2, vec![3]))));
        assert!(check(&member, |a| a.can_assign_task(&task_in(100, 2, vec![5]))));
        let head = Actor::new(1, Role::Head, Some(100), None);
        assert!(check(&head, |a| a.can_assign_task(&task_in(100, 2, vec![3]))));
    }

    #[test]
    fn test_admin_can_do_everything() {
        let admin = Actor::new(1, Role::Admin, None, None);
        let task = task_in(110, 2, vec![]);
        assert!(check(&admin, |a| a.can_delete_task(&task)));
        assert!(check(&admin, |a| a.can_approve_service_requests()));
        assert!(check(&admin, |a| a.can_view_project(&task.project)));
    }
}
