use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::{
    error::AppError,
    model::room::{NewBooking, Room, RoomBooking},
    service::rooms::RoomService,
    session::Session,
};

/// Rooms ordered by block, then number
#[utoipa::path(
    get,
    path = "/api/rooms",
    responses((status = 200, description = "All rooms", body = Vec<Room>)),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn list_rooms(
    _session: Session,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(rooms.list_rooms().await?))
}

/// Own bookings for students, every booking for staff
#[utoipa::path(
    get,
    path = "/api/rooms/bookings",
    responses((status = 200, description = "Bookings, newest first", body = Vec<RoomBooking>)),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn list_bookings(
    session: Session,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(rooms.list_bookings(session.actor()).await?))
}

#[utoipa::path(
    post,
    path = "/api/rooms/bookings",
    request_body = NewBooking,
    responses(
        (status = 201, description = "Booking requested", body = RoomBooking),
        (status = 400, description = "End date before start date"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room full, or an active booking already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn book_room(
    session: Session,
    body: web::Json<NewBooking>,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    let booking = rooms.book(session.actor(), &body, Utc::now()).await?;
    Ok(HttpResponse::Created().json(booking))
}

#[utoipa::path(
    put,
    path = "/api/rooms/bookings/{id}/cancel",
    params(("id" = u64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Cancelled", body = RoomBooking),
        (status = 404, description = "No such booking of yours"),
        (status = 409, description = "Booking no longer active")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn cancel_booking(
    session: Session,
    path: web::Path<u64>,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    let booking = rooms.cancel(session.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[utoipa::path(
    put,
    path = "/api/rooms/bookings/{id}/approve",
    params(("id" = u64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Approved", body = RoomBooking),
        (status = 403, description = "Wardens and admins only"),
        (status = 409, description = "Not pending, or room full")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn approve_booking(
    session: Session,
    path: web::Path<u64>,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    let booking = rooms.approve(session.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[utoipa::path(
    put,
    path = "/api/rooms/bookings/{id}/reject",
    params(("id" = u64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Rejected", body = RoomBooking),
        (status = 403, description = "Wardens and admins only"),
        (status = 409, description = "Not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn reject_booking(
    session: Session,
    path: web::Path<u64>,
    rooms: web::Data<RoomService>,
) -> Result<HttpResponse, AppError> {
    let booking = rooms.reject(session.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}
