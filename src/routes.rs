use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

use crate::{
    api::{attendance, complaints, mess_menu, notices, profile, rooms, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

/// Per-IP limiter allowing `requests_per_min` with a burst of the same size.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using defaults");
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/sign-up")
                            .wrap(build_limiter(config.rate_register_per_min))
                            .route(web::post().to(handlers::sign_up)),
                    )
                    .service(
                        web::resource("/sign-in")
                            .wrap(build_limiter(config.rate_login_per_min))
                            .route(web::post().to(handlers::sign_in)),
                    )
                    .service(
                        web::resource("/refresh")
                            .wrap(build_limiter(config.rate_refresh_per_min))
                            .route(web::post().to(handlers::refresh_token)),
                    )
                    .service(
                        web::resource("/sign-out")
                            .wrap(build_limiter(config.rate_login_per_min))
                            .route(web::post().to(handlers::sign_out)),
                    ),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(build_limiter(config.rate_protected_per_min))
                    .configure(protected),
            ),
    );
}

fn protected(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile")
            .route(web::get().to(profile::get_profile))
            .route(web::put().to(profile::update_profile)),
    )
    .service(
        web::scope("/users")
            // /users
            .service(web::resource("").route(web::get().to(users::list_users)))
            // /users/{id}
            .service(web::resource("/{id}").route(web::put().to(users::update_user)))
            .service(
                web::resource("/{id}/promote-admin").route(web::post().to(users::promote_admin)),
            )
            .service(
                web::resource("/{id}/promote-warden").route(web::post().to(users::promote_warden)),
            )
            .service(
                web::resource("/{id}/demote-student").route(web::post().to(users::demote_student)),
            ),
    )
    .service(
        web::scope("/attendance")
            // /attendance
            .service(web::resource("").route(web::get().to(attendance::list_records)))
            .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
            .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
            .service(web::resource("/today").route(web::get().to(attendance::today)))
            .service(web::resource("/mark").route(web::post().to(attendance::mark)))
            .service(web::resource("/stats").route(web::get().to(attendance::stats)))
            .service(
                web::resource("/settings")
                    .route(web::get().to(attendance::get_settings))
                    .route(web::put().to(attendance::update_settings)),
            )
            .service(web::resource("/sweep").route(web::post().to(attendance::sweep))),
    )
    .service(
        web::scope("/rooms")
            // /rooms
            .service(web::resource("").route(web::get().to(rooms::list_rooms)))
            // /rooms/bookings
            .service(
                web::resource("/bookings")
                    .route(web::get().to(rooms::list_bookings))
                    .route(web::post().to(rooms::book_room)),
            )
            .service(
                web::resource("/bookings/{id}/cancel").route(web::put().to(rooms::cancel_booking)),
            )
            .service(
                web::resource("/bookings/{id}/approve")
                    .route(web::put().to(rooms::approve_booking)),
            )
            .service(
                web::resource("/bookings/{id}/reject").route(web::put().to(rooms::reject_booking)),
            ),
    )
    .service(
        web::scope("/complaints")
            .service(
                web::resource("")
                    .route(web::get().to(complaints::list_complaints))
                    .route(web::post().to(complaints::create_complaint)),
            )
            .service(
                web::resource("/{id}/status").route(web::put().to(complaints::update_status)),
            ),
    )
    .service(web::resource("/mess-menu").route(web::get().to(mess_menu::get_menu)))
    .service(
        web::resource("/notices")
            .route(web::get().to(notices::list_notices))
            .route(web::post().to(notices::publish_notice)),
    );
}

/// Route table without rate limiting, for handler tests.
#[cfg(test)]
pub fn configure_unlimited(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/auth")
                    .route("/sign-up", web::post().to(handlers::sign_up))
                    .route("/sign-in", web::post().to(handlers::sign_in))
                    .route("/refresh", web::post().to(handlers::refresh_token))
                    .route("/sign-out", web::post().to(handlers::sign_out)),
            )
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .configure(protected),
            ),
    );
}
