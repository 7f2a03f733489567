pub mod attendance;
pub mod complaint;
pub mod mess_menu;
pub mod notice;
pub mod profile;
pub mod role;
pub mod room;
pub mod user;
