pub mod actor;
pub mod attendance;
pub mod employee;
pub mod request;
pub mod role;
pub mod shift;
