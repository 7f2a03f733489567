use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{ServiceError, ServiceResult, require};
use crate::model::{
    profile::{Profile, ProfileUpdate},
    role::{Actor, Capability, Role},
    user::Account,
};
use crate::store::{HostelStore, StoreError};

pub struct ProfileService {
    store: Arc<dyn HostelStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn HostelStore>) -> Self {
        Self { store }
    }

    /// A missing profile is not an error: it reads as `None`.
    pub async fn get_own(&self, actor: Actor) -> ServiceResult<Option<Profile>> {
        Ok(self.store.get_profile(actor.user_id).await?)
    }

    /// Returns the account's profile, creating a student profile from the
    /// sign-up details when there is none yet.
    pub async fn ensure_profile(&self, account: &Account, now: DateTime<Utc>) -> ServiceResult<Profile> {
        if let Some(profile) = self.store.get_profile(account.id).await? {
            return Ok(profile);
        }

        let profile = Profile {
            id: account.id,
            name: account.name.clone(),
            roll_number: account.roll_number.clone(),
            phone_number: account.phone_number.clone(),
            hostel_block: None,
            room_number: None,
            avatar_url: None,
            role: Role::Student,
            department: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_profile(profile).await {
            Ok(created) => {
                info!(user_id = account.id, "Profile created on first sign-in");
                Ok(created)
            }
            // Raced with another sign-in for the same account.
            Err(StoreError::Conflict(_)) => self
                .store
                .get_profile(account.id)
                .await?
                .ok_or(ServiceError::NotFound("profile")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_own(
        &self,
        actor: Actor,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> ServiceResult<Profile> {
        self.update(actor.user_id, update, now).await
    }

    /// All profiles, newest first.
    pub async fn list_users(&self, actor: Actor) -> ServiceResult<Vec<Profile>> {
        require(&actor, Capability::ListUsers)?;
        Ok(self.store.list_profiles().await?)
    }

    pub async fn update_user(
        &self,
        actor: Actor,
        user_id: u64,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> ServiceResult<Profile> {
        require(&actor, Capability::EditAnyProfile)?;
        debug!(admin = actor.user_id, user_id, "Editing profile");
        self.update(user_id, update, now).await
    }

    async fn update(&self, user_id: u64, update: &ProfileUpdate, now: DateTime<Utc>) -> ServiceResult<Profile> {
        if update.is_empty() {
            return Err(ServiceError::Invalid("Nothing to update".into()));
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::Invalid("Name cannot be empty".into()));
        }

        self.store
            .update_profile(user_id, update, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ServiceError::NotFound("profile"),
                other => other.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn account(id: u64) -> Account {
        Account {
            id,
            email: format!("user{id}@hostel.test"),
            password: String::new(),
            name: "Asha Rao".into(),
            roll_number: format!("CS{id}"),
            phone_number: Some("+910000000000".into()),
            last_sign_in_at: None,
        }
    }

    #[actix_web::test]
    async fn missing_profile_reads_as_none() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        let own = service.get_own(Actor::new(5, Role::Student)).await.unwrap();
        assert!(own.is_none());
    }

    #[actix_web::test]
    async fn first_sign_in_creates_a_student_profile_once() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();

        let created = service.ensure_profile(&account(5), now).await.unwrap();
        assert_eq!(created.role, Role::Student);
        assert_eq!(created.roll_number, "CS5");

        let again = service.ensure_profile(&account(5), Utc::now()).await.unwrap();
        assert_eq!(again.created_at, now);
    }

    #[actix_web::test]
    async fn own_update_changes_only_given_fields() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        service.ensure_profile(&account(5), Utc::now()).await.unwrap();

        let update = ProfileUpdate {
            room_number: Some("B-204".into()),
            ..Default::default()
        };
        let updated = service
            .update_own(Actor::new(5, Role::Student), &update, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.room_number.as_deref(), Some("B-204"));
        assert_eq!(updated.name, "Asha Rao");

        let err = service
            .update_own(Actor::new(5, Role::Student), &ProfileUpdate::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[actix_web::test]
    async fn listing_users_needs_staff() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        service.ensure_profile(&account(5), Utc::now()).await.unwrap();

        let err = service.list_users(Actor::new(5, Role::Student)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(Capability::ListUsers)));

        let users = service.list_users(Actor::new(1, Role::Warden)).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[actix_web::test]
    async fn only_admins_edit_other_profiles() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        service.ensure_profile(&account(5), Utc::now()).await.unwrap();
        let update = ProfileUpdate {
            hostel_block: Some("C".into()),
            ..Default::default()
        };

        let err = service
            .update_user(Actor::new(2, Role::Warden), 5, &update, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = service
            .update_user(Actor::new(1, Role::Admin), 5, &update, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.hostel_block.as_deref(), Some("C"));
    }
}
