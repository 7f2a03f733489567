use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::info;

use super::{ServiceError, ServiceResult, require};
use crate::model::{
    notice::{NewNotice, Notice},
    role::{Actor, Capability},
};
use crate::store::HostelStore;

pub const ACTIVE_NOTICE_LIMIT: u32 = 10;

pub struct NoticeService {
    store: Arc<dyn HostelStore>,
    /// Last fetched active list. Entries may expire while cached, so reads
    /// filter again against the clock.
    cache: Cache<(), Arc<Vec<Notice>>>,
}

impl NoticeService {
    pub fn new(store: Arc<dyn HostelStore>) -> Self {
        Self {
            store,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    /// Unexpired notices, highest priority then newest first.
    pub async fn active(&self, now: DateTime<Utc>) -> ServiceResult<Vec<Notice>> {
        let notices = match self.cache.get(&()).await {
            Some(cached) => cached,
            None => {
                let fetched = Arc::new(
                    self.store
                        .list_active_notices(now, ACTIVE_NOTICE_LIMIT)
                        .await?,
                );
                self.cache.insert((), fetched.clone()).await;
                fetched
            }
        };

        Ok(notices.iter().filter(|n| n.is_active(now)).cloned().collect())
    }

    pub async fn publish(
        &self,
        actor: Actor,
        notice: &NewNotice,
        now: DateTime<Utc>,
    ) -> ServiceResult<Notice> {
        require(&actor, Capability::PublishNotices)?;
        if notice.title.trim().is_empty() || notice.content.trim().is_empty() {
            return Err(ServiceError::Invalid("Title and content are required".into()));
        }
        if notice.expires_at.is_some_and(|at| at <= now) {
            return Err(ServiceError::Invalid("Notice would already be expired".into()));
        }

        let created = self.store.insert_notice(notice, now).await?;
        self.cache.invalidate(&()).await;
        info!(notice_id = created.id, priority = %created.priority, "Notice published");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::complaint::Priority;
    use crate::model::role::Role;
    use crate::store::NoticeStore;
    use crate::store::memory::MemoryStore;
    use chrono::Duration as TimeDelta;

    const WARDEN: Actor = Actor {
        user_id: 1,
        role: Role::Warden,
    };

    fn notice(title: &str, priority: Priority, expires_at: Option<DateTime<Utc>>) -> NewNotice {
        NewNotice {
            title: title.into(),
            content: "details".into(),
            priority,
            expires_at,
        }
    }

    #[actix_web::test]
    async fn expired_notices_are_hidden_and_priority_orders() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let earlier = now - TimeDelta::days(2);
        store
            .insert_notice(&notice("old", Priority::High, Some(now - TimeDelta::hours(1))), earlier)
            .await
            .unwrap();
        store.insert_notice(&notice("low", Priority::Low, None), earlier).await.unwrap();
        store.insert_notice(&notice("high", Priority::High, None), earlier).await.unwrap();

        let notices = NoticeService::new(store);
        let active = notices.active(now).await.unwrap();
        let titles: Vec<_> = active.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "low"]);
    }

    #[actix_web::test]
    async fn at_most_ten_active_notices() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..12 {
            store
                .insert_notice(&notice(&format!("n{i}"), Priority::Medium, None), Utc::now())
                .await
                .unwrap();
        }
        let active = NoticeService::new(store).active(Utc::now()).await.unwrap();
        assert_eq!(active.len(), ACTIVE_NOTICE_LIMIT as usize);
    }

    #[actix_web::test]
    async fn publishing_refreshes_the_list() {
        let notices = NoticeService::new(Arc::new(MemoryStore::new()));
        assert!(notices.active(Utc::now()).await.unwrap().is_empty());

        notices
            .publish(WARDEN, &notice("water", Priority::High, None), Utc::now())
            .await
            .unwrap();
        assert_eq!(notices.active(Utc::now()).await.unwrap().len(), 1);

        let err = notices
            .publish(Actor::new(9, Role::Student), &notice("x", Priority::Low, None), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
