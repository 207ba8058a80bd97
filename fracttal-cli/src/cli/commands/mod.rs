pub mod auth;
pub mod update;
