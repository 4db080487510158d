pub mod attendance;
pub mod capture;
