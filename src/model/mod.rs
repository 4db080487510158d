pub mod attendance;
pub mod location;
pub mod status;
