pub mod admin;
pub mod attendance;
pub mod bills;
pub mod dashboard;
