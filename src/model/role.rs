use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Warden,
    Admin,
}

/// Every action the service gates on. Roles are flat: a role holds exactly
/// the capabilities listed for it in [`Role::capabilities`], nothing is
/// inherited.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
pub enum Capability {
    CheckInOut,
    ViewOwnAttendance,
    ViewAllAttendance,
    MarkAttendance,
    ManageAttendanceSettings,
    ListUsers,
    EditAnyProfile,
    ManageStudentRoles,
    ManageAllRoles,
    BookRoom,
    ReviewBookings,
    FileComplaint,
    ResolveComplaints,
    PublishNotices,
}

const STUDENT_CAPS: &[Capability] = &[
    Capability::CheckInOut,
    Capability::ViewOwnAttendance,
    Capability::BookRoom,
    Capability::FileComplaint,
];

const WARDEN_CAPS: &[Capability] = &[
    Capability::ViewOwnAttendance,
    Capability::ViewAllAttendance,
    Capability::MarkAttendance,
    Capability::ListUsers,
    Capability::ManageStudentRoles,
    Capability::ReviewBookings,
    Capability::FileComplaint,
    Capability::ResolveComplaints,
    Capability::PublishNotices,
];

const ADMIN_CAPS: &[Capability] = &[
    Capability::ViewOwnAttendance,
    Capability::ViewAllAttendance,
    Capability::MarkAttendance,
    Capability::ManageAttendanceSettings,
    Capability::ListUsers,
    Capability::EditAnyProfile,
    Capability::ManageStudentRoles,
    Capability::ManageAllRoles,
    Capability::ReviewBookings,
    Capability::FileComplaint,
    Capability::ResolveComplaints,
    Capability::PublishNotices,
];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Student => STUDENT_CAPS,
            Role::Warden => WARDEN_CAPS,
            Role::Admin => ADMIN_CAPS,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Who is performing an operation. Built from the request session and
/// handed to every service call that needs authorization.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: u64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

/// The three server-side role procedures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    PromoteToAdmin,
    PromoteToWarden { department: Option<String> },
    DemoteToStudent,
}

impl RoleChange {
    pub fn target_role(&self) -> Role {
        match self {
            RoleChange::PromoteToAdmin => Role::Admin,
            RoleChange::PromoteToWarden { .. } => Role::Warden,
            RoleChange::DemoteToStudent => Role::Student,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RoleDenial {
    #[display(fmt = "role {} cannot manage roles", _0)]
    NotPermitted(Role),
    #[display(fmt = "wardens may only manage students")]
    TargetNotStudent,
    #[display(fmt = "wardens may only assign the student role")]
    RoleNotAssignable,
    #[display(fmt = "users cannot change their own role")]
    SelfChange,
}

/// Decides whether `actor` may move a user currently holding `current` to
/// `new_role`.
pub fn authorize_role_change(
    actor: Role,
    actor_is_target: bool,
    current: Role,
    new_role: Role,
) -> Result<(), RoleDenial> {
    if actor_is_target {
        return Err(RoleDenial::SelfChange);
    }

    if actor.can(Capability::ManageAllRoles) {
        return Ok(());
    }

    if !actor.can(Capability::ManageStudentRoles) {
        return Err(RoleDenial::NotPermitted(actor));
    }

    if current != Role::Student {
        return Err(RoleDenial::TargetNotStudent);
    }

    if new_role != Role::Student {
        return Err(RoleDenial::RoleNotAssignable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_do_not_inherit_capabilities() {
        assert!(Role::Student.can(Capability::CheckInOut));
        assert!(!Role::Warden.can(Capability::CheckInOut));
        assert!(!Role::Admin.can(Capability::BookRoom));
        assert!(Role::Admin.can(Capability::ManageAttendanceSettings));
        assert!(!Role::Warden.can(Capability::ManageAttendanceSettings));
    }

    #[test]
    fn role_parses_from_lowercase() {
        assert_eq!("warden".parse::<Role>().unwrap(), Role::Warden);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn warden_cannot_promote_student_to_warden() {
        let res = authorize_role_change(Role::Warden, false, Role::Student, Role::Warden);
        assert_eq!(res, Err(RoleDenial::RoleNotAssignable));
    }

    #[test]
    fn admin_can_promote_student_to_warden() {
        assert!(authorize_role_change(Role::Admin, false, Role::Student, Role::Warden).is_ok());
        assert!(authorize_role_change(Role::Admin, false, Role::Warden, Role::Student).is_ok());
    }

    #[test]
    fn warden_cannot_touch_other_staff() {
        let res = authorize_role_change(Role::Warden, false, Role::Admin, Role::Student);
        assert_eq!(res, Err(RoleDenial::TargetNotStudent));
    }

    #[test]
    fn students_and_self_changes_are_rejected() {
        assert_eq!(
            authorize_role_change(Role::Student, false, Role::Student, Role::Student),
            Err(RoleDenial::NotPermitted(Role::Student))
        );
        assert_eq!(
            authorize_role_change(Role::Admin, true, Role::Admin, Role::Student),
            Err(RoleDenial::SelfChange)
        );
    }
}
