pub mod attendance;
pub mod bill;
pub mod user;
