//! Signed-in sessions and their cached profiles.
//!
//! The auth handlers publish [`SessionEvent`]s here. Publishing keeps the
//! profile cache current and fans each event out to every subscriber;
//! subscribers detach with [`SessionStore::unsubscribe`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::future::LocalBoxFuture;
use moka::future::Cache;
use tracing::{debug, warn};

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::{profile::Profile, role::Actor};
use crate::store::{HostelStore, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { user_id: u64, profile: Profile },
    SignedOut { user_id: u64 },
    ProfileChanged(Profile),
}

impl SessionEvent {
    pub fn user_id(&self) -> u64 {
        match self {
            SessionEvent::SignedIn { user_id, .. } | SessionEvent::SignedOut { user_id } => *user_id,
            SessionEvent::ProfileChanged(profile) => profile.id,
        }
    }
}

/// A live subscription. Events arrive on `events` until the id is passed
/// to [`SessionStore::unsubscribe`].
pub struct Subscription {
    pub id: u64,
    pub events: UnboundedReceiver<SessionEvent>,
}

pub struct SessionStore {
    store: Arc<dyn HostelStore>,
    profiles: Cache<u64, Profile>,
    subscribers: Mutex<HashMap<u64, UnboundedSender<SessionEvent>>>,
    next_id: AtomicU64,
}

impl SessionStore {
    pub fn new(store: Arc<dyn HostelStore>, ttl: Duration) -> Self {
        Self {
            store,
            profiles: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        debug!(subscription = id, "Session subscriber attached");
        Subscription { id, events: rx }
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some();
        if removed {
            debug!(subscription = id, "Session subscriber detached");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub async fn publish(&self, event: SessionEvent) {
        match &event {
            SessionEvent::SignedIn { user_id, profile } => {
                self.profiles.insert(*user_id, profile.clone()).await;
            }
            SessionEvent::SignedOut { user_id } => {
                self.profiles.invalidate(user_id).await;
            }
            SessionEvent::ProfileChanged(profile) => {
                self.profiles.insert(profile.id, profile.clone()).await;
            }
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|id, tx| match tx.unbounded_send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!(subscription = id, "Dropping closed session subscriber");
                false
            }
        });
    }

    /// Cached profile, loaded from the store on a miss. `None` when the
    /// account has no profile yet.
    pub async fn profile(&self, user_id: u64) -> StoreResult<Option<Profile>> {
        if let Some(profile) = self.profiles.get(&user_id).await {
            return Ok(Some(profile));
        }

        let loaded = self.store.get_profile(user_id).await?;
        if let Some(profile) = &loaded {
            self.profiles.insert(user_id, profile.clone()).await;
        }
        Ok(loaded)
    }
}

/// The caller of a request: the verified token identity plus the current
/// profile. The profile's role wins over the role in the token, so role
/// changes apply without re-issuing tokens.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: AuthUser,
    pub profile: Option<Profile>,
}

impl Session {
    pub fn actor(&self) -> Actor {
        match &self.profile {
            Some(profile) => Actor::new(self.user.user_id, profile.role),
            None => self.user.actor(),
        }
    }
}

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = AuthUser::from_request(req, payload).into_inner();
        let sessions = req.app_data::<Data<SessionStore>>().cloned();

        Box::pin(async move {
            let user = user?;
            let sessions = sessions.ok_or_else(|| {
                tracing::error!("Session store missing from app data");
                AppError::Internal
            })?;

            let profile = sessions.profile(user.user_id).await.map_err(AppError::from)?;
            Ok(Session { user, profile })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::store::ProfileStore;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;
    use futures::StreamExt;

    fn profile(id: u64, role: Role) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            name: "Asha".into(),
            roll_number: "R1".into(),
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

    fn sessions() -> (Arc<MemoryStore>, SessionStore) {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(store.clone(), Duration::from_secs(60));
        (store, sessions)
    }

    #[actix_web::test]
    async fn subscribers_receive_events_until_unsubscribed() {
        let (_, sessions) = sessions();
        let mut sub = sessions.subscribe();
        assert_eq!(sessions.subscriber_count(), 1);

        sessions.publish(SessionEvent::SignedOut { user_id: 4 }).await;
        let event = sub.events.next().await.unwrap();
        assert_eq!(event.user_id(), 4);

        assert!(sessions.unsubscribe(sub.id));
        assert!(!sessions.unsubscribe(sub.id));
        assert_eq!(sessions.subscriber_count(), 0);

        sessions.publish(SessionEvent::SignedOut { user_id: 5 }).await;
        // The sender was dropped on unsubscribe, so the stream ends.
        assert!(sub.events.next().await.is_none());
    }

    #[actix_web::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let (_, sessions) = sessions();
        let sub = sessions.subscribe();
        drop(sub);

        sessions.publish(SessionEvent::SignedOut { user_id: 1 }).await;
        assert_eq!(sessions.subscriber_count(), 0);
    }

    #[actix_web::test]
    async fn events_keep_the_profile_cache_current() {
        let (store, sessions) = sessions();
        store.insert_profile(profile(9, Role::Student)).await.unwrap();

        let loaded = sessions.profile(9).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Student);

        sessions
            .publish(SessionEvent::ProfileChanged(profile(9, Role::Warden)))
            .await;
        assert_eq!(sessions.profile(9).await.unwrap().unwrap().role, Role::Warden);

        sessions.publish(SessionEvent::SignedOut { user_id: 9 }).await;
        // Evicted, so the next read goes back to the store.
        assert_eq!(sessions.profile(9).await.unwrap().unwrap().role, Role::Student);
    }

    #[actix_web::test]
    async fn unknown_account_has_no_profile() {
        let (_, sessions) = sessions();
        assert!(sessions.profile(77).await.unwrap().is_none());
    }

    #[test]
    fn profile_role_overrides_token_role() {
        let session = Session {
            user: AuthUser {
                user_id: 9,
                email: "a@hostel.edu".into(),
                role: Role::Student,
            },
            profile: Some(profile(9, Role::Admin)),
        };
        assert_eq!(session.actor(), Actor::new(9, Role::Admin));
    }
}
