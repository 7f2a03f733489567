use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod notify;
mod routes;
mod service;
mod session;
mod store;
mod utils;

use crate::config::Config;
use crate::db::init_db;
use crate::docs::ApiDoc;
use crate::service::Services;
use crate::session::SessionEvent;
use crate::store::{HostelStore, memory::MemoryStore, mysql::MySqlStore};
use crate::utils::{email_cache, email_filter};

#[get("/")]
async fn index() -> impl Responder {
    "Hostel management service"
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn HostelStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            info!("Using MySQL store");
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, using seeded in-memory store");
            Ok(Arc::new(MemoryStore::seeded()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = open_store(&config).await?;
    let services = Services::new(store.clone(), &config);

    let filter_store = store.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(filter_store.as_ref(), 100).await {
            error!(error = %e, "Failed to warm up email filter");
        }
    });

    let cache_store = store.clone();
    actix_web::rt::spawn(async move {
        // Accounts seen in the last 30 days, 250 per batch
        if let Err(e) = email_cache::warmup_email_cache(cache_store.as_ref(), 30, 250).await {
            error!(error = %e, "Failed to warm up email cache");
        }
    });

    // Session audit trail
    let mut subscription = services.sessions.subscribe();
    actix_web::rt::spawn(async move {
        while let Some(event) = subscription.events.next().await {
            match &event {
                SessionEvent::SignedIn { user_id, profile } => {
                    info!(user_id, role = %profile.role, "Session started")
                }
                SessionEvent::SignedOut { user_id } => info!(user_id, "Session ended"),
                SessionEvent::ProfileChanged(profile) => {
                    debug!(user_id = profile.id, role = %profile.role, "Session profile refreshed")
                }
            }
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the UI's JS/CSS assets resolve
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .configure(|cfg| services.register(cfg))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
