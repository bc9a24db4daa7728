//! Role-based permission tables.

use std::collections::BTreeSet;

use crate::api::{Permission, Profile, Role};

const PLANNER: &[Permission] = &[
    Permission::ViewEmployees,
    Permission::ViewTrainings,
    Permission::ManageTrainings,
    Permission::ManageParticipants,
    Permission::ViewCompliance,
    Permission::ManageAvailability,
    Permission::ManagePlans,
];

const INSTRUCTOR: &[Permission] = &[
    Permission::ViewEmployees,
    Permission::ViewTrainings,
    Permission::ManageParticipants,
];

const EMPLOYEE: &[Permission] = &[Permission::ViewTrainings, Permission::ViewOwnRecords];

/// Static permission table of a role.
pub fn role_permissions(role: Role) -> BTreeSet<Permission> {
    match role {
        Role::Admin => Permission::ALL.iter().copied().collect(),
        Role::Manager => Permission::ALL
            .iter()
            .copied()
            .filter(|p| *p != Permission::ManageUsers)
            .collect(),
        Role::Planner => PLANNER.iter().copied().collect(),
        Role::Instructor => INSTRUCTOR.iter().copied().collect(),
        Role::Employee => EMPLOYEE.iter().copied().collect(),
    }
}

/// Where an effective permission set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSource {
    /// Explicit list stored on the profile.
    Profile,
    /// The role's static table.
    Role,
    /// The profile could not be loaded; derived from the session's role hint.
    RoleFallback,
}

/// Effective permissions of a loaded profile.
pub fn profile_permissions(profile: &Profile) -> (BTreeSet<Permission>, PermissionSource) {
    match &profile.permissions {
        Some(list) => (list.iter().copied().collect(), PermissionSource::Profile),
        None => (role_permissions(profile.role), PermissionSource::Role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ProfileDraft, ProfileId};
    use chrono::Utc;

    #[test]
    fn test_admin_has_everything() {
        assert_eq!(role_permissions(Role::Admin).len(), Permission::ALL.len());
    }

    #[test]
    fn test_manager_cannot_manage_users() {
        let manager = role_permissions(Role::Manager);
        assert!(!manager.contains(&Permission::ManageUsers));
        assert!(manager.contains(&Permission::ManageCatalog));
    }

    #[test]
    fn test_employee_table() {
        let employee = role_permissions(Role::Employee);
        assert_eq!(
            employee.into_iter().collect::<Vec<_>>(),
            vec![Permission::ViewTrainings, Permission::ViewOwnRecords]
        );
    }

    #[test]
    fn test_explicit_list_replaces_role_table() {
        let mut draft = ProfileDraft::new("i@example.nl", "Instructor", Role::Instructor);
        draft.permissions = Some(vec![Permission::ViewCompliance]);
        let profile = Profile::from_draft(ProfileId(1), &draft, Utc::now());

        let (permissions, source) = profile_permissions(&profile);
        assert_eq!(source, PermissionSource::Profile);
        assert!(permissions.contains(&Permission::ViewCompliance));
        assert!(!permissions.contains(&Permission::ViewTrainings));
    }
}
