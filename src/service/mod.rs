//! Domain services. Each wraps the store calls for one area of the hostel
//! and applies the capability checks for it.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use derive_more::Display;

use crate::config::Config;
use crate::model::role::{Actor, Capability};
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::store::{HostelStore, StoreError};

pub mod attendance;
pub mod complaints;
pub mod mess_menu;
pub mod notices;
pub mod profiles;
pub mod roles;
pub mod rooms;

#[derive(Debug, Display)]
pub enum ServiceError {
    #[display(fmt = "not allowed: {}", _0)]
    Forbidden(Capability),
    #[display(fmt = "{}", _0)]
    Invalid(String),
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn require(actor: &Actor, capability: Capability) -> ServiceResult<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(capability))
    }
}

/// Every service, wired to one store. Cloning is cheap.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn HostelStore>,
    pub notifier: Arc<Notifier>,
    pub sessions: Arc<SessionStore>,
    pub attendance: Arc<attendance::AttendanceWorkflow>,
    pub roles: Arc<roles::RoleService>,
    pub profiles: Arc<profiles::ProfileService>,
    pub rooms: Arc<rooms::RoomService>,
    pub complaints: Arc<complaints::ComplaintService>,
    pub mess_menu: Arc<mess_menu::MessMenuService>,
    pub notices: Arc<notices::NoticeService>,
}

impl Services {
    pub fn new(store: Arc<dyn HostelStore>, config: &Config) -> Self {
        let notifier = Arc::new(Notifier::new());
        let cache_ttl = Duration::from_secs(config.session_cache_ttl);

        Self {
            sessions: Arc::new(SessionStore::new(store.clone(), cache_ttl)),
            attendance: Arc::new(attendance::AttendanceWorkflow::new(
                store.clone(),
                notifier.clone(),
                config.stats_default_window_days,
            )),
            roles: Arc::new(roles::RoleService::new(store.clone(), notifier.clone())),
            profiles: Arc::new(profiles::ProfileService::new(store.clone())),
            rooms: Arc::new(rooms::RoomService::new(store.clone(), notifier.clone())),
            complaints: Arc::new(complaints::ComplaintService::new(
                store.clone(),
                notifier.clone(),
            )),
            mess_menu: Arc::new(mess_menu::MessMenuService::new(store.clone(), cache_ttl)),
            notices: Arc::new(notices::NoticeService::new(store.clone())),
            notifier,
            store,
        }
    }

    /// Registers every service as actix app data.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::from(self.sessions.clone()))
            .app_data(web::Data::from(self.attendance.clone()))
            .app_data(web::Data::from(self.roles.clone()))
            .app_data(web::Data::from(self.profiles.clone()))
            .app_data(web::Data::from(self.rooms.clone()))
            .app_data(web::Data::from(self.complaints.clone()))
            .app_data(web::Data::from(self.mess_menu.clone()))
            .app_data(web::Data::from(self.notices.clone()));
    }
}
