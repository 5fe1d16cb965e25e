pub mod auth;
pub mod logging;
pub mod profile_gate;
