use std::sync::Arc;

use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::{info, warn};

use crate::model::{
    profile::Profile,
    role::{Actor, RoleChange, RoleDenial, authorize_role_change},
};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::store::{HostelStore, StoreError};

#[derive(Debug, Display)]
pub enum RoleError {
    #[display(fmt = "{}", _0)]
    Denied(RoleDenial),
    #[display(fmt = "User {} not found", _0)]
    NotFound(u64),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for RoleError {}

impl From<StoreError> for RoleError {
    fn from(e: StoreError) -> Self {
        RoleError::Store(e)
    }
}

pub struct RoleService {
    store: Arc<dyn HostelStore>,
    notifier: Arc<Notifier>,
}

impl RoleService {
    pub fn new(store: Arc<dyn HostelStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Applies `change` to `target` after checking the actor may make it.
    pub async fn change_role(
        &self,
        actor: Actor,
        target: u64,
        change: RoleChange,
        now: DateTime<Utc>,
    ) -> Result<Profile, RoleError> {
        let current = self
            .store
            .get_profile(target)
            .await?
            .ok_or(RoleError::NotFound(target))?;
        let new_role = change.target_role();

        if let Err(denial) =
            authorize_role_change(actor.role, actor.user_id == target, current.role, new_role)
        {
            warn!(actor = actor.user_id, target, %new_role, %denial, "Role change denied");
            return Err(RoleError::Denied(denial));
        }

        let department = match change {
            RoleChange::PromoteToWarden { department } => department,
            _ => None,
        };
        let updated = self
            .store
            .set_role(target, new_role, department, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => RoleError::NotFound(target),
                other => RoleError::Store(other),
            })?;

        info!(actor = actor.user_id, target, from = %current.role, to = %new_role, "Role changed");
        self.notifier.send(Notification {
            to: target,
            subject: "Your role has changed".to_string(),
            message: format!("Your role is now {new_role}."),
            kind: NotificationKind::RoleChanged,
        });
        Ok(updated)
    }

    pub async fn promote_to_admin(&self, actor: Actor, target: u64) -> Result<Profile, RoleError> {
        self.change_role(actor, target, RoleChange::PromoteToAdmin, Utc::now())
            .await
    }

    pub async fn promote_to_warden(
        &self,
        actor: Actor,
        target: u64,
        department: Option<String>,
    ) -> Result<Profile, RoleError> {
        self.change_role(
            actor,
            target,
            RoleChange::PromoteToWarden { department },
            Utc::now(),
        )
        .await
    }

    pub async fn demote_to_student(&self, actor: Actor, target: u64) -> Result<Profile, RoleError> {
        self.change_role(actor, target, RoleChange::DemoteToStudent, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::store::ProfileStore;
    use crate::store::memory::MemoryStore;

    fn profile(id: u64, role: Role) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            name: format!("user {id}"),
            roll_number: format!("R{id}"),
            phone_number: None,
            hostel_block: None,
            room_number: None,
            avatar_url: None,
            role,
            department: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (Arc<Notifier>, RoleService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_profile(profile(1, Role::Admin)).await.unwrap();
        store.insert_profile(profile(2, Role::Warden)).await.unwrap();
        store.insert_profile(profile(3, Role::Student)).await.unwrap();
        store.insert_profile(profile(4, Role::Warden)).await.unwrap();
        let notifier = Arc::new(Notifier::new());
        (notifier.clone(), RoleService::new(store, notifier))
    }

    #[actix_web::test]
    async fn warden_cannot_promote_student_to_warden() {
        let (_, roles) = setup().await;
        let err = roles
            .promote_to_warden(Actor::new(2, Role::Warden), 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::Denied(RoleDenial::RoleNotAssignable)));
    }

    #[actix_web::test]
    async fn admin_promotes_student_to_warden_with_department() {
        let (notifier, roles) = setup().await;
        let updated = roles
            .promote_to_warden(Actor::new(1, Role::Admin), 3, Some("Block C".into()))
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Warden);
        assert_eq!(updated.department.as_deref(), Some("Block C"));
        assert_eq!(notifier.sent_count(), 1);
    }

    #[actix_web::test]
    async fn warden_cannot_demote_another_warden() {
        let (_, roles) = setup().await;
        let err = roles
            .demote_to_student(Actor::new(2, Role::Warden), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::Denied(RoleDenial::TargetNotStudent)));
    }

    #[actix_web::test]
    async fn nobody_changes_their_own_role() {
        let (notifier, roles) = setup().await;
        let err = roles
            .demote_to_student(Actor::new(1, Role::Admin), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::Denied(RoleDenial::SelfChange)));
        assert_eq!(notifier.sent_count(), 0);
    }

    #[actix_web::test]
    async fn students_cannot_manage_roles() {
        let (_, roles) = setup().await;
        let err = roles
            .promote_to_admin(Actor::new(3, Role::Student), 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoleError::Denied(RoleDenial::NotPermitted(Role::Student))
        ));
    }

    #[actix_web::test]
    async fn unknown_target_is_not_found() {
        let (_, roles) = setup().await;
        let err = roles
            .promote_to_admin(Actor::new(1, Role::Admin), 404)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::NotFound(404)));
    }
}
