pub mod admin;
pub mod auth;
pub mod files;
pub mod routes;

pub use routes::*;
