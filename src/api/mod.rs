pub mod attendance;
pub mod complaints;
pub mod mess_menu;
pub mod notices;
pub mod profile;
pub mod rooms;
pub mod users;
