use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::{
    attendance::{MarkRequest, MarkResponse, MarkResult, SweepRequest},
    complaints::StatusUpdate,
    users::PromoteWarden,
};
use crate::model::{
    attendance::{
        AttendanceRecord, AttendanceSettings, AttendanceStats, AttendanceStatus, Grade,
        SettingsPatch,
    },
    complaint::{Complaint, ComplaintCategory, ComplaintStatus, NewComplaint, Priority},
    mess_menu::{MealType, MessMenu},
    notice::{NewNotice, Notice},
    profile::{Profile, ProfileUpdate},
    role::Role,
    room::{BookingStatus, NewBooking, Room, RoomBooking},
};
use crate::models::{SignInRequest, SignInResponse, SignUpRequest, TokenPair};
use crate::service::attendance::{StatsReport, SweepReport};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hostel Management API",
        version = "1.0.0",
        description = r#"
## Hostel Management System

Backend for day-to-day hostel operations.

### Key Features
- **Attendance**
  - Student check-in and check-out, staff marking in bulk
  - Statistics with grade bands over any date window
- **Roles**
  - Students, wardens and admins with a fixed capability set each
- **Rooms, complaints, mess menu and notices**

### Security
Everything except sign-up, sign-in and token refresh requires a **JWT
Bearer** access token.

### Response Format
JSON bodies. Errors are `{"message": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::sign_up,
        crate::auth::handlers::sign_in,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::sign_out,

        crate::api::profile::get_profile,
        crate::api::profile::update_profile,

        crate::api::users::list_users,
        crate::api::users::update_user,
        crate::api::users::promote_admin,
        crate::api::users::promote_warden,
        crate::api::users::demote_student,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_records,
        crate::api::attendance::today,
        crate::api::attendance::mark,
        crate::api::attendance::stats,
        crate::api::attendance::get_settings,
        crate::api::attendance::update_settings,
        crate::api::attendance::sweep,

        crate::api::rooms::list_rooms,
        crate::api::rooms::list_bookings,
        crate::api::rooms::book_room,
        crate::api::rooms::cancel_booking,
        crate::api::rooms::approve_booking,
        crate::api::rooms::reject_booking,

        crate::api::complaints::list_complaints,
        crate::api::complaints::create_complaint,
        crate::api::complaints::update_status,

        crate::api::mess_menu::get_menu,

        crate::api::notices::list_notices,
        crate::api::notices::publish_notice
    ),
    components(
        schemas(
            SignUpRequest,
            SignInRequest,
            SignInResponse,
            TokenPair,
            Role,
            Profile,
            ProfileUpdate,
            PromoteWarden,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceSettings,
            SettingsPatch,
            AttendanceStats,
            Grade,
            StatsReport,
            MarkRequest,
            MarkResult,
            MarkResponse,
            SweepRequest,
            SweepReport,
            Room,
            BookingStatus,
            RoomBooking,
            NewBooking,
            ComplaintCategory,
            ComplaintStatus,
            Priority,
            Complaint,
            NewComplaint,
            StatusUpdate,
            MealType,
            MessMenu,
            Notice,
            NewNotice
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and token rotation"),
        (name = "Profile", description = "Own profile"),
        (name = "Users", description = "User listing and role management"),
        (name = "Attendance", description = "Attendance tracking and statistics"),
        (name = "Rooms", description = "Rooms and bookings"),
        (name = "Complaints", description = "Complaint tracking"),
        (name = "Mess menu", description = "Weekly mess menu"),
        (name = "Notices", description = "Notice board"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_attendance_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/check-in"));
        assert!(doc.paths.paths.contains_key("/api/attendance/stats"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
