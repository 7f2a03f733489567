use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::{ServiceError, ServiceResult, require};
use crate::model::{
    complaint::{Complaint, ComplaintStatus, NewComplaint},
    role::{Actor, Capability},
};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::store::{HostelStore, StoreError};

pub struct ComplaintService {
    store: Arc<dyn HostelStore>,
    notifier: Arc<Notifier>,
}

impl ComplaintService {
    pub fn new(store: Arc<dyn HostelStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Newest first. Students only see what they filed.
    pub async fn list(&self, actor: Actor) -> ServiceResult<Vec<Complaint>> {
        let scope = if actor.can(Capability::ResolveComplaints) {
            None
        } else {
            Some(actor.user_id)
        };
        Ok(self.store.list_complaints(scope).await?)
    }

    pub async fn file(
        &self,
        actor: Actor,
        complaint: &NewComplaint,
        now: DateTime<Utc>,
    ) -> ServiceResult<Complaint> {
        require(&actor, Capability::FileComplaint)?;
        if complaint.title.trim().is_empty() {
            return Err(ServiceError::Invalid("Title is required".into()));
        }
        if complaint.description.trim().is_empty() {
            return Err(ServiceError::Invalid("Description is required".into()));
        }

        let created = self
            .store
            .insert_complaint(actor.user_id, complaint, now)
            .await?;
        info!(user_id = actor.user_id, complaint_id = created.id, category = %created.category, "Complaint filed");
        Ok(created)
    }

    /// Staff status change. Resolving stamps `resolved_at`, reopening
    /// clears it.
    pub async fn set_status(
        &self,
        actor: Actor,
        complaint_id: u64,
        status: ComplaintStatus,
        now: DateTime<Utc>,
    ) -> ServiceResult<Complaint> {
        require(&actor, Capability::ResolveComplaints)?;

        let resolved_at = (status == ComplaintStatus::Resolved).then_some(now);
        let updated = self
            .store
            .set_complaint_status(complaint_id, status, resolved_at, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ServiceError::NotFound("complaint"),
                other => other.into(),
            })?;

        self.notifier.send(Notification {
            to: updated.user_id,
            subject: format!("Complaint {}", updated.status),
            message: format!("Your complaint \"{}\" is now {}.", updated.title, updated.status),
            kind: NotificationKind::ComplaintUpdated,
        });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::complaint::{ComplaintCategory, Priority};
    use crate::model::role::Role;
    use crate::store::memory::MemoryStore;

    fn leak() -> NewComplaint {
        NewComplaint {
            title: "Leaking tap".into(),
            description: "Bathroom tap on floor 2".into(),
            category: ComplaintCategory::Maintenance,
            priority: Priority::default(),
        }
    }

    fn service() -> (Arc<Notifier>, ComplaintService) {
        let notifier = Arc::new(Notifier::new());
        let service = ComplaintService::new(Arc::new(MemoryStore::new()), notifier.clone());
        (notifier, service)
    }

    #[actix_web::test]
    async fn filed_complaints_start_pending_with_medium_priority() {
        let (_, complaints) = service();
        let created = complaints
            .file(Actor::new(10, Role::Student), &leak(), Utc::now())
            .await
            .unwrap();
        assert_eq!(created.status, ComplaintStatus::Pending);
        assert_eq!(created.priority, Priority::Medium);
    }

    #[actix_web::test]
    async fn blank_title_is_rejected() {
        let (_, complaints) = service();
        let mut bad = leak();
        bad.title = "   ".into();
        let err = complaints
            .file(Actor::new(10, Role::Student), &bad, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[actix_web::test]
    async fn students_see_only_their_own() {
        let (_, complaints) = service();
        complaints.file(Actor::new(10, Role::Student), &leak(), Utc::now()).await.unwrap();
        complaints.file(Actor::new(11, Role::Student), &leak(), Utc::now()).await.unwrap();

        let own = complaints.list(Actor::new(10, Role::Student)).await.unwrap();
        assert_eq!(own.len(), 1);
        let all = complaints.list(Actor::new(1, Role::Warden)).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[actix_web::test]
    async fn resolving_stamps_time_and_notifies_owner() {
        let (notifier, complaints) = service();
        let created = complaints
            .file(Actor::new(10, Role::Student), &leak(), Utc::now())
            .await
            .unwrap();

        let now = Utc::now();
        let resolved = complaints
            .set_status(Actor::new(1, Role::Warden), created.id, ComplaintStatus::Resolved, now)
            .await
            .unwrap();
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(notifier.sent_count(), 1);

        let err = complaints
            .set_status(Actor::new(10, Role::Student), created.id, ComplaintStatus::Pending, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
