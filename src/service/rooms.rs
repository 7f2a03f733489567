use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::{ServiceError, ServiceResult, require};
use crate::model::{
    role::{Actor, Capability},
    room::{BookingStatus, NewBooking, Room, RoomBooking},
};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::store::HostelStore;

pub struct RoomService {
    store: Arc<dyn HostelStore>,
    notifier: Arc<Notifier>,
}

impl RoomService {
    pub fn new(store: Arc<dyn HostelStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn list_rooms(&self) -> ServiceResult<Vec<Room>> {
        Ok(self.store.list_rooms().await?)
    }

    /// Staff see every booking, students only their own.
    pub async fn list_bookings(&self, actor: Actor) -> ServiceResult<Vec<RoomBooking>> {
        let scope = if actor.can(Capability::ReviewBookings) {
            None
        } else {
            Some(actor.user_id)
        };
        Ok(self.store.list_bookings(scope).await?)
    }

    pub async fn book(
        &self,
        actor: Actor,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> ServiceResult<RoomBooking> {
        require(&actor, Capability::BookRoom)?;

        if booking.end_date.is_some_and(|end| end < booking.start_date) {
            return Err(ServiceError::Invalid("End date is before start date".into()));
        }

        let room = self
            .store
            .get_room(booking.room_id)
            .await?
            .ok_or(ServiceError::NotFound("room"))?;
        if !room.available || !room.has_vacancy() {
            return Err(ServiceError::Conflict(format!(
                "Room {}-{} has no free beds",
                room.block, room.number
            )));
        }

        let held = self.store.list_bookings(Some(actor.user_id)).await?;
        if held.iter().any(|b| b.status.is_active()) {
            return Err(ServiceError::Conflict(
                "You already hold a pending or approved booking".into(),
            ));
        }

        let created = self.store.insert_booking(actor.user_id, booking, now).await?;
        info!(user_id = actor.user_id, booking_id = created.id, room_id = room.id, "Room booked");
        Ok(created)
    }

    /// Owner cancellation. Cancelling an approved booking frees its bed.
    pub async fn cancel(&self, actor: Actor, booking_id: u64) -> ServiceResult<RoomBooking> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != actor.user_id {
            return Err(ServiceError::NotFound("booking"));
        }
        if !booking.status.is_active() {
            return Err(ServiceError::Conflict(format!(
                "Booking is already {}",
                booking.status
            )));
        }

        let delta = if booking.status == BookingStatus::Approved { -1 } else { 0 };
        Ok(self
            .store
            .set_booking_status(booking_id, booking.status, BookingStatus::Cancelled, delta)
            .await?)
    }

    pub async fn approve(&self, actor: Actor, booking_id: u64) -> ServiceResult<RoomBooking> {
        require(&actor, Capability::ReviewBookings)?;
        let booking = self.pending(booking_id).await?;

        let room = self
            .store
            .get_room(booking.room_id)
            .await?
            .ok_or(ServiceError::NotFound("room"))?;
        if !room.has_vacancy() {
            return Err(ServiceError::Conflict("Room is full".into()));
        }

        let updated = self
            .store
            .set_booking_status(booking_id, BookingStatus::Pending, BookingStatus::Approved, 1)
            .await?;
        self.notify_review(&updated);
        Ok(updated)
    }

    pub async fn reject(&self, actor: Actor, booking_id: u64) -> ServiceResult<RoomBooking> {
        require(&actor, Capability::ReviewBookings)?;
        self.pending(booking_id).await?;

        let updated = self
            .store
            .set_booking_status(booking_id, BookingStatus::Pending, BookingStatus::Rejected, 0)
            .await?;
        self.notify_review(&updated);
        Ok(updated)
    }

    async fn booking(&self, id: u64) -> ServiceResult<RoomBooking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))
    }

    async fn pending(&self, id: u64) -> ServiceResult<RoomBooking> {
        let booking = self.booking(id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Booking is already {}",
                booking.status
            )));
        }
        Ok(booking)
    }

    fn notify_review(&self, booking: &RoomBooking) {
        self.notifier.send(Notification {
            to: booking.user_id,
            subject: format!("Room booking {}", booking.status),
            message: format!("Your booking #{} was {}.", booking.id, booking.status),
            kind: NotificationKind::BookingReviewed,
        });
    }
}
